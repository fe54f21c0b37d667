//! Command-line interface definitions for the news search crawler.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The search phrase and page limit can also be supplied through environment
//! variables.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Category filters offered by the site search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Category {
    LiveBlogs,
    Stories,
    Subsections,
    Videos,
}

/// File format handed to the export step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    /// Spreadsheet-compatible table with a header row
    #[default]
    Csv,
    /// Array of objects keyed by column name
    Json,
    /// Excel workbook
    Xlsx,
}

/// Command-line arguments for the crawler.
///
/// # Examples
///
/// ```sh
/// # Five pages of the newest stories about "obama"
/// news_search_crawler -s obama -p 5
///
/// # Only stories and live blogs, exported as JSON
/// news_search_crawler -s "climate" --category stories --category live-blogs --format json -o climate.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Phrase to type into the site search
    #[arg(short, long, env = "SEARCH_PHRASE", default_value = "obama")]
    pub search_phrase: String,

    /// Category filter to enable (repeatable; all categories when omitted)
    #[arg(long = "category", value_enum)]
    pub categories: Vec<Category>,

    /// Sort-order option value to select in the results dropdown
    #[arg(long, default_value = "3")]
    pub sort: String,

    /// Maximum number of result pages to visit
    #[arg(short, long, env = "PAGE_LIMIT", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub page_limit: u32,

    /// Path of the exported table
    #[arg(short, long, default_value = "extracted_story_data.csv")]
    pub output: PathBuf,

    /// Export format
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,

    /// Directory downloaded images are written to
    #[arg(long, default_value = "images")]
    pub image_dir: PathBuf,

    /// Optional YAML site profile overriding the built-in selectors
    #[arg(long)]
    pub site_profile: Option<PathBuf>,

    /// Run the browser without a visible window
    #[arg(long)]
    pub headless: bool,

    /// How long to wait for a page element before giving up, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub wait_timeout_ms: u64,

    /// Number of image downloads in flight per page
    #[arg(long, default_value_t = 4,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub download_concurrency: u16,
}

impl Cli {
    /// Categories to enable; an empty selection means all of them.
    pub fn enabled_categories(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            Category::value_variants().to_vec()
        } else {
            self.categories.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["news_search_crawler"]);

        assert_eq!(cli.sort, "3");
        assert_eq!(cli.output, PathBuf::from("extracted_story_data.csv"));
        assert_eq!(cli.format, ExportFormat::Csv);
        assert_eq!(cli.enabled_categories().len(), 4);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "news_search_crawler",
            "-s",
            "climate",
            "-p",
            "2",
            "-o",
            "/tmp/out.json",
        ]);

        assert_eq!(cli.search_phrase, "climate");
        assert_eq!(cli.page_limit, 2);
        assert_eq!(cli.output, PathBuf::from("/tmp/out.json"));
    }

    #[test]
    fn test_cli_repeated_categories() {
        let cli = Cli::parse_from([
            "news_search_crawler",
            "--category",
            "stories",
            "--category",
            "live-blogs",
        ]);

        assert_eq!(
            cli.enabled_categories(),
            vec![Category::Stories, Category::LiveBlogs]
        );
    }

    #[test]
    fn test_cli_xlsx_format() {
        let cli = Cli::parse_from([
            "news_search_crawler",
            "--format",
            "xlsx",
            "-o",
            "extracted_story_data.xlsx",
        ]);

        assert_eq!(cli.format, ExportFormat::Xlsx);
        assert_eq!(cli.output, PathBuf::from("extracted_story_data.xlsx"));
    }

    #[test]
    fn test_cli_rejects_zero_page_limit() {
        let result = Cli::try_parse_from(["news_search_crawler", "--page-limit", "0"]);
        assert!(result.is_err());
    }
}
