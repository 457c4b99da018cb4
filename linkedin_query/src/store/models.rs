use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Seniority {
    #[serde(rename = "C-Level / Founder")]
    CLevelFounder,
    #[serde(rename = "VP")]
    Vp,
    #[serde(rename = "Director")]
    Director,
    #[serde(rename = "Head of")]
    HeadOf,
    #[serde(rename = "Manager")]
    Manager,
    #[serde(rename = "Other")]
    Other,
}

impl Seniority {
    pub const ALL: [Seniority; 6] = [
        Seniority::CLevelFounder,
        Seniority::Vp,
        Seniority::Director,
        Seniority::HeadOf,
        Seniority::Manager,
        Seniority::Other,
    ];

    /// Levels counted as senior in the summary. Fixed, not configurable.
    pub const SENIOR: [Seniority; 4] = [
        Seniority::CLevelFounder,
        Seniority::Vp,
        Seniority::Director,
        Seniority::HeadOf,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Seniority::CLevelFounder => "C-Level / Founder",
            Seniority::Vp => "VP",
            Seniority::Director => "Director",
            Seniority::HeadOf => "Head of",
            Seniority::Manager => "Manager",
            Seniority::Other => "Other",
        }
    }

    pub fn is_senior(self) -> bool {
        Self::SENIOR.contains(&self)
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownLabel {
    kind: &'static str,
    value: String,
    expected: String,
}

impl FromStr for Seniority {
    type Err = UnknownLabel;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(raw);
        Self::ALL
            .into_iter()
            .find(|level| normalize_label(level.label()) == wanted)
            .ok_or_else(|| UnknownLabel {
                kind: "seniority",
                value: raw.to_string(),
                expected: Self::ALL.map(Seniority::label).join(", "),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PostType {
    #[serde(rename = "Long Text")]
    LongText,
    #[serde(rename = "Short Text")]
    ShortText,
    #[serde(rename = "Media")]
    Media,
    #[serde(rename = "Link Share")]
    LinkShare,
    #[serde(rename = "Repost")]
    Repost,
}

impl PostType {
    pub const ALL: [PostType; 5] = [
        PostType::LongText,
        PostType::ShortText,
        PostType::Media,
        PostType::LinkShare,
        PostType::Repost,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PostType::LongText => "Long Text",
            PostType::ShortText => "Short Text",
            PostType::Media => "Media",
            PostType::LinkShare => "Link Share",
            PostType::Repost => "Repost",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PostType {
    type Err = UnknownLabel;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(raw);
        Self::ALL
            .into_iter()
            .find(|kind| normalize_label(kind.label()) == wanted)
            .ok_or_else(|| UnknownLabel {
                kind: "post type",
                value: raw.to_string(),
                expected: Self::ALL.map(PostType::label).join(", "),
            })
    }
}

// "c-level/founder", "C-Level / Founder" and "c level founder" all compare equal.
fn normalize_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub full_name: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub seniority: Seniority,
    pub connected_on: Option<NaiveDate>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// `YYYY-MM-DD` prefix, compared lexically.
    pub date: String,
    pub day: String,
    pub content: String,
    pub word_count: usize,
    pub post_type: PostType,
    pub comments: usize,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub date: Option<NaiveDate>,
    pub message: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub date: Option<NaiveDate>,
    pub reaction_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub date: DateTime<Utc>,
    /// The participant that is not the export owner.
    pub counterparty: String,
    pub content: String,
    pub sent_by_owner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seniority_parses_loosely() {
        assert_eq!("vp".parse::<Seniority>().unwrap(), Seniority::Vp);
        assert_eq!(
            "c-level/founder".parse::<Seniority>().unwrap(),
            Seniority::CLevelFounder
        );
        assert_eq!("head of".parse::<Seniority>().unwrap(), Seniority::HeadOf);
        assert!("intern".parse::<Seniority>().is_err());
    }

    #[test]
    fn labels_serialize_as_wire_strings() {
        let json = serde_json::to_string(&Seniority::CLevelFounder).unwrap();
        assert_eq!(json, "\"C-Level / Founder\"");
        let json = serde_json::to_string(&PostType::LinkShare).unwrap();
        assert_eq!(json, "\"Link Share\"");
    }

    #[test]
    fn post_type_round_trips_through_label() {
        for kind in PostType::ALL {
            assert_eq!(kind.label().parse::<PostType>().unwrap(), kind);
        }
    }
}
