//! Data models for a search run and the records it produces.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ExtractionContext`]: Immutable per-run inputs (search phrase, anchor date)
//! - [`ResultRecord`]: One normalized row per search result card
//! - [`PageBudget`]: The countdown that bounds how many result pages a run visits
//!
//! Absent fields are never represented as `Option` on a record. Each one is
//! replaced by the matching sentinel constant below so every row carries every
//! column.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical textual date form, e.g. `January 05 2024`.
pub const DATE_FORMAT: &str = "%B %d %Y";

/// Title or description could not be found in the card.
pub const NOT_AVAILABLE: &str = "N/A";
/// The card carried no image element.
pub const NO_IMAGE: &str = "No image found";
/// An image URL was present but the download failed.
pub const DOWNLOAD_FAILED: &str = "Download failed";
/// The card carried no link element.
pub const NO_LINK: &str = "No link found";
/// The card carried no date label.
pub const NO_DATE: &str = "No date found";

/// Per-run inputs shared by every extraction.
///
/// Created once when the run starts and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    /// The phrase typed into the site search.
    pub search_phrase: String,
    /// The day the run started; zero point for relative date labels.
    pub anchor_date: NaiveDate,
}

impl ExtractionContext {
    pub fn new(search_phrase: impl Into<String>, anchor_date: NaiveDate) -> Self {
        Self {
            search_phrase: search_phrase.into(),
            anchor_date,
        }
    }

    /// The anchor date in canonical form, copied onto every record.
    pub fn search_date(&self) -> String {
        self.anchor_date.format(DATE_FORMAT).to_string()
    }
}

/// A single search result after extraction and normalization.
///
/// Serialized column names double as the header row of the exported table,
/// so the field order here is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResultRecord {
    #[serde(rename = "Search Phrase")]
    pub search_phrase: String,
    /// Case-insensitive occurrences of the search phrase in the title.
    #[serde(rename = "Phrase Count")]
    pub phrase_count: usize,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// Whether the title mentions money (`dollar`, `dollars` or `$`).
    #[serde(rename = "Money Mentioned")]
    pub money_flag: bool,
    /// Local file name of the downloaded image, or a sentinel.
    #[serde(rename = "Image File")]
    pub image_local_id: String,
    /// The image URL as found in the card, kept even when the download failed.
    #[serde(rename = "Image URL")]
    pub image_url: String,
    #[serde(rename = "Link")]
    pub link: String,
    /// Normalized publication date, or the raw label when it could not be parsed.
    #[serde(rename = "News Date")]
    pub news_date: String,
    #[serde(rename = "Search Date")]
    pub search_date: String,
}

/// Remaining number of result pages a run may visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBudget {
    remaining: u32,
}

impl PageBudget {
    pub fn new(pages: u32) -> Self {
        Self { remaining: pages }
    }

    /// Spend one page; saturates at zero.
    pub fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ResultRecord {
        ResultRecord {
            search_phrase: "obama".to_string(),
            phrase_count: 1,
            title: "Obama visits Chicago".to_string(),
            description: NOT_AVAILABLE.to_string(),
            money_flag: false,
            image_local_id: NO_IMAGE.to_string(),
            image_url: NO_IMAGE.to_string(),
            link: "https://apnews.com/article/x".to_string(),
            news_date: "March 10 2024".to_string(),
            search_date: "March 10 2024".to_string(),
        }
    }

    #[test]
    fn test_search_date_uses_canonical_format() {
        let ctx = ExtractionContext::new("obama", NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(ctx.search_date(), "January 05 2024");
    }

    #[test]
    fn test_record_serializes_with_column_names() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert!(json.contains("\"Search Phrase\":\"obama\""));
        assert!(json.contains("\"Money Mentioned\":false"));
        assert!(json.contains("\"Image File\":\"No image found\""));
    }

    #[test]
    fn test_page_budget_counts_down_and_saturates() {
        let mut budget = PageBudget::new(2);
        assert!(!budget.is_exhausted());
        budget.consume();
        assert_eq!(budget.remaining(), 1);
        budget.consume();
        assert!(budget.is_exhausted());
        budget.consume();
        assert_eq!(budget.remaining(), 0);
    }
}
