use crate::store::models::Seniority;
use crate::store::Dataset;
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};

pub const TOP_COMPANIES: usize = 20;

/// Value counts ordered by descending count; ties keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    buckets: Vec<(String, usize)>,
}

impl Histogram {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut buckets: Vec<(String, usize)> = Vec::new();
        for value in values {
            let value = value.as_ref();
            match slots.get(value) {
                Some(&slot) => buckets[slot].1 += 1,
                None => {
                    slots.insert(value.to_string(), buckets.len());
                    buckets.push((value.to_string(), 1));
                }
            }
        }
        buckets.sort_by(|a, b| b.1.cmp(&a.1));
        Self { buckets }
    }

    pub fn truncated(mut self, len: usize) -> Self {
        self.buckets.truncate(len);
        self
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.buckets
            .iter()
            .find(|(bucket, _)| bucket == key)
            .map(|(_, count)| *count)
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (key, count) in &self.buckets {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_connections: usize,
    pub unique_companies: usize,
    pub total_posts: usize,
    pub total_comments: usize,
    pub total_reactions: usize,
    pub senior_connections: usize,
    pub earliest_connection: Option<NaiveDate>,
    pub latest_connection: Option<NaiveDate>,
    pub top_companies: Histogram,
    pub seniority_distribution: Histogram,
}

/// Corpus-wide statistics. Always computed over the full dataset, never over
/// a filtered view.
pub fn build_summary(data: &Dataset) -> Summary {
    let connections = &data.connections.rows;

    let companies = connections.iter().filter_map(|c| c.company.as_deref());
    let unique_companies = companies.clone().collect::<HashSet<_>>().len();
    let top_companies = Histogram::from_values(companies).truncated(TOP_COMPANIES);
    let seniority_distribution =
        Histogram::from_values(connections.iter().map(|c| c.seniority.label()));

    let senior_connections = connections
        .iter()
        .filter(|c| Seniority::is_senior(c.seniority))
        .count();

    let dates = connections.iter().filter_map(|c| c.connected_on);
    let earliest_connection = dates.clone().min();
    let latest_connection = dates.max();

    Summary {
        total_connections: connections.len(),
        unique_companies,
        total_posts: data.posts.len(),
        total_comments: data.comments.len(),
        total_reactions: data.reactions.len(),
        senior_connections,
        earliest_connection,
        latest_connection,
        top_companies,
        seniority_distribution,
    }
}
