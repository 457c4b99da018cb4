//! Predicate filters over loaded records.
//!
//! Every filter consumes a working copy of the rows and returns the subset
//! that matches, so the loaded [`Dataset`](crate::store::Dataset) is never
//! touched. Text filters are case-insensitive substring matches, categorical
//! filters are exact or set membership, and a missing field is a non-match.

use crate::conversations::Conversation;
use crate::store::models::{Comment, Connection, Message, Post, PostType, Reaction, Seniority};
use crate::utils::{contains_lower, field_contains};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Ordered record of the filters a query applied, echoed back in the response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedFilters {
    entries: Vec<(&'static str, Value)>,
}

impl AppliedFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &'static str, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }
}

impl Serialize for AppliedFilters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Records that carry a calendar date usable by the `year` filter.
pub trait Dated {
    fn year(&self) -> Option<i32>;
}

impl Dated for Connection {
    fn year(&self) -> Option<i32> {
        self.connected_on.map(|d| d.year())
    }
}

impl Dated for Comment {
    fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }
}

impl Dated for Reaction {
    fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }
}

impl Dated for Message {
    fn year(&self) -> Option<i32> {
        Some(self.date.year())
    }
}

impl Dated for Post {
    fn year(&self) -> Option<i32> {
        self.date.get(..4).and_then(|prefix| prefix.parse().ok())
    }
}

/// Records that can be tested against a `recent` cutoff instant.
///
/// Everything is compared in UTC. Timestamps compare instant against
/// instant; calendar dates compare against the cutoff's UTC date, so the
/// boundary day itself is kept.
pub trait Recency {
    fn is_since(&self, cutoff: DateTime<Utc>) -> bool;
}

impl Recency for Connection {
    fn is_since(&self, cutoff: DateTime<Utc>) -> bool {
        match self.connected_on {
            Some(date) => date >= cutoff.date_naive(),
            None => false,
        }
    }
}

impl Recency for Message {
    fn is_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.date >= cutoff
    }
}

/// Free-text search over the type-specific field set.
pub trait Searchable {
    /// `needle` must already be lower-cased.
    fn matches_search(&self, needle: &str) -> bool;
}

impl Searchable for Connection {
    fn matches_search(&self, needle: &str) -> bool {
        contains_lower(&self.full_name, needle)
            || field_contains(self.company.as_deref(), needle)
            || field_contains(self.position.as_deref(), needle)
    }
}

impl Searchable for Post {
    fn matches_search(&self, needle: &str) -> bool {
        contains_lower(&self.content, needle)
    }
}

impl Searchable for Comment {
    fn matches_search(&self, needle: &str) -> bool {
        field_contains(self.message.as_deref(), needle)
    }
}

impl Searchable for Conversation {
    fn matches_search(&self, needle: &str) -> bool {
        contains_lower(&self.other, needle) || contains_lower(&self.last_content, needle)
    }
}

pub fn by_company(mut rows: Vec<Connection>, pattern: &str) -> Vec<Connection> {
    let needle = pattern.to_lowercase();
    rows.retain(|row| field_contains(row.company.as_deref(), &needle));
    rows
}

/// Keeps rows whose seniority is any of `levels`.
pub fn by_seniority(mut rows: Vec<Connection>, levels: &[Seniority]) -> Vec<Connection> {
    rows.retain(|row| levels.contains(&row.seniority));
    rows
}

pub fn by_position(mut rows: Vec<Connection>, pattern: &str) -> Vec<Connection> {
    let needle = pattern.to_lowercase();
    rows.retain(|row| field_contains(row.position.as_deref(), &needle));
    rows
}

pub fn by_year<T: Dated>(mut rows: Vec<T>, year: i32) -> Vec<T> {
    rows.retain(|row| row.year() == Some(year));
    rows
}

pub fn recent_cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn by_recent<T: Recency>(mut rows: Vec<T>, days: u32, now: DateTime<Utc>) -> Vec<T> {
    let cutoff = recent_cutoff(now, days);
    rows.retain(|row| row.is_since(cutoff));
    rows
}

pub fn by_search<T: Searchable>(mut rows: Vec<T>, pattern: &str) -> Vec<T> {
    let needle = pattern.to_lowercase();
    rows.retain(|row| row.matches_search(&needle));
    rows
}

pub fn by_post_type(mut rows: Vec<Post>, post_type: PostType) -> Vec<Post> {
    rows.retain(|row| row.post_type == post_type);
    rows
}

pub fn awaiting_reply(mut rows: Vec<Conversation>) -> Vec<Conversation> {
    rows.retain(|row| row.awaiting_your_reply);
    rows
}
