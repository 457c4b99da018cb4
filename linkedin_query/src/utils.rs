//! Shared helpers and constants.

use chrono::NaiveDate;

pub const APP_NAME: &str = "linkedin_query";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Case-insensitive substring test. `needle` must already be lower-cased.
pub fn contains_lower(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Same as [`contains_lower`], treating a missing field as a non-match.
pub fn field_contains(field: Option<&str>, needle: &str) -> bool {
    match field {
        Some(value) => contains_lower(value, needle),
        None => false,
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
