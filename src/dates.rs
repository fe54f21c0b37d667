//! Normalization of result-card date labels into absolute calendar dates.
//!
//! Search result cards show dates in several shapes: relative labels
//! (`"5 mins ago"`, `"3 hours ago"`, `"Yesterday"`, `"2 days ago"`), a month and
//! day without a year (`"February 2"`), or a full date (`"March 1 2023"`).
//! [`normalize_date`] resolves all of them against the run's anchor date and
//! emits the canonical `"%B %d %Y"` form.
//!
//! # Precedence
//!
//! Rules are tried in a fixed order and the first match wins:
//!
//! | # | Label | Result |
//! |---|-------|--------|
//! | 1 | `No date found` | anchor |
//! | 2 | contains `min ago` / `mins ago` | anchor |
//! | 3 | `Yesterday` | anchor - 1 day |
//! | 4 | contains `hour ago` / `hours ago` | anchor - N hours, date only |
//! | 5 | contains `day ago` / `days ago` | anchor - N days |
//! | 6 | month and day | that day in the anchor's year |
//! | 7 | month, day and year | that date |
//! | 8 | anything else | the label unchanged |
//!
//! # Known quirks
//!
//! The anchor is a calendar date with no time of day, so rule 4 truncates the
//! elapsed hours to whole days: `"3 hours ago"` stays on the anchor date and
//! `"26 hours ago"` lands on the day before, regardless of when the run started.
//!
//! Rule 6 never looks at whether the month/day has already passed. A label
//! later in the year than the anchor yields a date in the future.
//!
//! Rule 6 also accepts `"February 29"` whenever the anchor's year is a leap
//! year, giving February 29 of that year. The label passes through unchanged
//! only in non-leap years.

use crate::models::{DATE_FORMAT, NO_DATE};
use chrono::{Datelike, Days, NaiveDate};
use tracing::debug;

/// Convert a raw date label into the canonical absolute form.
///
/// Never fails: a label that matches no rule, or whose leading count is not a
/// number, is returned unchanged.
pub fn normalize_date(raw: &str, anchor: NaiveDate) -> String {
    match resolve(raw, anchor) {
        Some(date) => date.format(DATE_FORMAT).to_string(),
        None => {
            debug!(raw, "Date label left unnormalized");
            raw.to_string()
        }
    }
}

fn resolve(raw: &str, anchor: NaiveDate) -> Option<NaiveDate> {
    if raw == NO_DATE {
        return Some(anchor);
    }
    if raw.contains("min ago") || raw.contains("mins ago") {
        return Some(anchor);
    }
    if raw == "Yesterday" {
        return anchor.checked_sub_days(Days::new(1));
    }
    if raw.contains("hours ago") || raw.contains("hour ago") {
        let hours = leading_count(raw)?;
        return anchor.checked_sub_days(Days::new(hours / 24));
    }
    if raw.contains("days ago") || raw.contains("day ago") {
        let days = leading_count(raw)?;
        return anchor.checked_sub_days(Days::new(days));
    }

    // chrono will not build a date without a year, so borrow the anchor's.
    let with_anchor_year = format!("{} {}", raw, anchor.year());
    NaiveDate::parse_from_str(&with_anchor_year, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, DATE_FORMAT))
        .ok()
}

/// Parse the first whitespace-separated token as a count, as in `"3 hours ago"`.
fn leading_count(raw: &str) -> Option<u64> {
    raw.split_whitespace().next()?.parse().ok()
}
