//! Export discovery and CSV loading.
//!
//! Everything is converted to typed records here, once, so the query layer
//! never deals with raw strings. Values that fail to parse become `None`
//! rather than failing the load.

use crate::config::ExportPaths;
use crate::error::ExportError;
use crate::store::models::{Comment, Connection, Message, Post, PostType, Reaction, Seniority};
use crate::store::{Dataset, Table};
use crate::utils::{word_count, DATE_FORMAT};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const EXPORT_DIR_PREFIXES: [&str; 2] = ["Basic_LinkedInDataExport", "Complete_LinkedInDataExport"];
const CONNECTIONS_HEADER: &str = "First Name";
const LONG_POST_WORDS: usize = 100;

/// Resolves the export directory. An explicit path must hold the export (or
/// a single export folder); otherwise the working directory, the downloads
/// folder and the home directory are searched in that order.
pub fn find_export_dir(explicit: Option<&Path>) -> Result<PathBuf, ExportError> {
    if let Some(dir) = explicit {
        return export_in(dir).ok_or_else(|| ExportError::MissingConnections(dir.to_path_buf()));
    }

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    roots.extend(dirs::download_dir());
    roots.extend(dirs::home_dir());

    for root in &roots {
        if let Some(found) = export_in(root) {
            tracing::info!(path = %found.display(), "found LinkedIn export");
            return Ok(found);
        }
    }
    tracing::debug!(searched = ?roots, "no export directory found");
    Err(ExportError::NotFound)
}

fn export_in(dir: &Path) -> Option<PathBuf> {
    if has_connections(dir) {
        return Some(dir.to_path_buf());
    }
    let entries = fs::read_dir(dir).ok()?;
    let mut candidates: Vec<(Option<std::time::SystemTime>, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            EXPORT_DIR_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
        })
        .map(|entry| entry.path())
        .filter(|path| has_connections(path))
        .map(|path| (fs::metadata(&path).and_then(|m| m.modified()).ok(), path))
        .collect();
    // Most recently modified export wins.
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    candidates.into_iter().next().map(|(_, path)| path)
}

fn has_connections(dir: &Path) -> bool {
    ExportPaths::from_base_dir(dir).connections.is_file()
}

/// Loads every supported file from an export directory. `Connections.csv` is
/// required; the rest load as empty tables when absent.
pub fn load_all(dir: &Path, owner: Option<&str>) -> Result<Dataset> {
    let paths = ExportPaths::from_base_dir(dir);

    let connections_csv = CsvTable::read(&paths.connections, Some(CONNECTIONS_HEADER))?
        .ok_or_else(|| ExportError::MissingConnections(dir.to_path_buf()))?;
    let classifier = SeniorityClassifier::new().context("failed to build seniority rules")?;
    let connections = load_connections(&connections_csv, &classifier);

    let comments = optional_table(&paths.comments, load_comments)?;
    let reactions = optional_table(&paths.reactions, load_reactions)?;
    let known: HashSet<String> = connections
        .rows
        .iter()
        .map(|c| c.full_name.to_lowercase())
        .collect();
    let messages = optional_table(&paths.messages, |csv| load_messages(csv, owner, &known))?;
    let posts = match CsvTable::read(&paths.shares, None)? {
        Some(csv) => load_posts(&csv, &comments.rows),
        None => Vec::new(),
    };

    tracing::info!(
        dir = %dir.display(),
        connections = connections.len(),
        posts = posts.len(),
        comments = comments.len(),
        reactions = reactions.len(),
        messages = messages.len(),
        "loaded export"
    );

    Ok(Dataset {
        connections,
        posts,
        comments,
        reactions,
        messages,
    })
}

fn optional_table<T>(
    path: &Path,
    load: impl FnOnce(&CsvTable) -> Vec<T>,
) -> Result<Table<T>, ExportError> {
    match CsvTable::read(path, None)? {
        Some(csv) => Ok(Table::new(load(&csv), csv.headers.iter().cloned())),
        None => {
            tracing::debug!(path = %path.display(), "optional export file missing");
            Ok(Table::default())
        }
    }
}

/// A parsed CSV file with columns addressed by header name.
struct CsvTable {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    records: Vec<csv::StringRecord>,
}

impl CsvTable {
    /// Returns `Ok(None)` when the file does not exist. When `header_prefix`
    /// is set, any preamble lines before the header row are skipped.
    fn read(path: &Path, header_prefix: Option<&str>) -> Result<Option<Self>, ExportError> {
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = String::from_utf8_lossy(&bytes);
        if matches!(raw, Cow::Owned(_)) {
            tracing::warn!(path = %path.display(), "replaced invalid UTF-8 in export file");
        }
        let raw = raw.trim_start_matches('\u{feff}');
        let body = match header_prefix {
            Some(prefix) => skip_preamble(raw, prefix),
            None => raw,
        };
        Self::parse(body, path).map(Some)
    }

    fn parse(body: &str, path: &Path) -> Result<Self, ExportError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(body.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| ExportError::Csv {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(|header| header.trim().to_string())
            .collect();
        let index = headers
            .iter()
            .enumerate()
            .map(|(position, header)| (header.clone(), position))
            .collect();

        let mut records = Vec::new();
        for (line, record) in reader.records().enumerate() {
            match record {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(path = %path.display(), line, error = %err, "skipping malformed row")
                }
            }
        }

        Ok(Self {
            headers,
            index,
            records,
        })
    }

    /// Trimmed, non-empty value of `column` in `record`.
    fn field<'r>(&self, record: &'r csv::StringRecord, column: &str) -> Option<&'r str> {
        let position = *self.index.get(column)?;
        let value = record.get(position)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn owned(&self, record: &csv::StringRecord, column: &str) -> Option<String> {
        self.field(record, column).map(str::to_string)
    }
}

fn skip_preamble<'a>(raw: &'a str, prefix: &str) -> &'a str {
    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        if line.trim_start().starts_with(prefix) {
            return &raw[offset..];
        }
        offset += line.len();
    }
    raw
}

/// Keyword rules mapping a job title to a seniority level, checked in order.
pub struct SeniorityClassifier {
    rules: Vec<(Seniority, Regex)>,
}

impl SeniorityClassifier {
    pub fn new() -> Result<Self> {
        let patterns = [
            // before C-level so "Vice President" is not read as "President"
            (Seniority::Vp, r"(?i)\b(vp|svp|evp|avp|vice[\s-]+president)\b"),
            (
                Seniority::CLevelFounder,
                r"(?i)\b(ceo|cto|cfo|coo|cmo|cro|cpo|ciso|chief|co-?founder|founder|president)\b",
            ),
            (Seniority::Director, r"(?i)\bdirector\b"),
            (Seniority::HeadOf, r"(?i)\bhead\b"),
            (Seniority::Manager, r"(?i)\bmanager\b"),
        ];
        let rules = patterns
            .into_iter()
            .map(|(level, pattern)| {
                Regex::new(pattern)
                    .map(|regex| (level, regex))
                    .with_context(|| format!("invalid seniority pattern {pattern}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn classify(&self, position: Option<&str>) -> Seniority {
        let Some(position) = position else {
            return Seniority::Other;
        };
        self.rules
            .iter()
            .find(|(_, regex)| regex.is_match(position))
            .map(|(level, _)| *level)
            .unwrap_or(Seniority::Other)
    }
}

fn load_connections(csv: &CsvTable, classifier: &SeniorityClassifier) -> Table<Connection> {
    let rows = csv
        .records
        .iter()
        .map(|record| {
            let first = csv.field(record, "First Name").unwrap_or_default();
            let last = csv.field(record, "Last Name").unwrap_or_default();
            let position = csv.owned(record, "Position");
            Connection {
                full_name: format!("{first} {last}").trim().to_string(),
                company: csv.owned(record, "Company"),
                seniority: classifier.classify(position.as_deref()),
                position,
                connected_on: csv.field(record, "Connected On").and_then(parse_connection_date),
                url: csv.owned(record, "URL"),
            }
        })
        .collect();
    Table::new(rows, csv.headers.iter().cloned())
}

fn load_comments(csv: &CsvTable) -> Vec<Comment> {
    csv.records
        .iter()
        .map(|record| Comment {
            date: csv.field(record, "Date").and_then(parse_day),
            message: csv.owned(record, "Message"),
            link: csv.owned(record, "Link"),
        })
        .collect()
}

fn load_reactions(csv: &CsvTable) -> Vec<Reaction> {
    csv.records
        .iter()
        .map(|record| Reaction {
            date: csv.field(record, "Date").and_then(parse_day),
            reaction_type: csv.owned(record, "Type"),
        })
        .collect()
}

fn load_posts(csv: &CsvTable, comments: &[Comment]) -> Vec<Post> {
    let mut comments_per_link: HashMap<&str, usize> = HashMap::new();
    for link in comments.iter().filter_map(|c| c.link.as_deref()) {
        *comments_per_link.entry(link).or_default() += 1;
    }

    csv.records
        .iter()
        .map(|record| {
            let raw_date = csv.field(record, "Date").unwrap_or_default();
            let date = raw_date.get(..10).unwrap_or(raw_date).to_string();
            let day = parse_day(&date)
                .map(|d| d.format("%A").to_string())
                .unwrap_or_default();
            let content = csv.owned(record, "ShareCommentary").unwrap_or_default();
            let words = word_count(&content);
            let post_type = classify_post(
                words,
                csv.field(record, "SharedUrl"),
                csv.field(record, "MediaUrl"),
            );
            let link = csv.owned(record, "ShareLink").unwrap_or_default();
            Post {
                date,
                day,
                word_count: words,
                content,
                post_type,
                comments: comments_per_link.get(link.as_str()).copied().unwrap_or(0),
                link,
            }
        })
        .collect()
}

pub fn classify_post(words: usize, shared_url: Option<&str>, media_url: Option<&str>) -> PostType {
    if media_url.is_some() {
        PostType::Media
    } else if let Some(url) = shared_url {
        if url.contains("linkedin.com") || words == 0 {
            PostType::Repost
        } else {
            PostType::LinkShare
        }
    } else if words >= LONG_POST_WORDS {
        PostType::LongText
    } else {
        PostType::ShortText
    }
}

/// `connections` holds lower-cased connection names; it only feeds owner
/// inference, since the owner never appears among their own connections.
fn load_messages(
    csv: &CsvTable,
    owner: Option<&str>,
    connections: &HashSet<String>,
) -> Vec<Message> {
    let owner = match owner {
        Some(name) => name.to_string(),
        None => infer_owner(csv, connections).unwrap_or_default(),
    };
    tracing::debug!(owner = %owner, "resolved export owner");
    let threads = thread_counterparties(csv, &owner);

    csv.records
        .iter()
        .filter_map(|record| {
            let Some(date) = csv.field(record, "DATE").and_then(parse_timestamp) else {
                tracing::warn!("skipping message without a readable DATE");
                return None;
            };
            let sender = csv.field(record, "FROM").unwrap_or_default();
            let sent_by_owner = is_owner(sender, &owner);
            let counterparty = csv
                .field(record, "CONVERSATION ID")
                .and_then(|id| threads.get(id).cloned())
                .unwrap_or_else(|| {
                    if sent_by_owner {
                        csv.owned(record, "TO")
                            .or_else(|| csv.owned(record, "CONVERSATION TITLE"))
                            .unwrap_or_default()
                    } else {
                        sender.to_string()
                    }
                });
            Some(Message {
                date,
                counterparty,
                content: csv.owned(record, "CONTENT").unwrap_or_default(),
                sent_by_owner,
            })
        })
        .collect()
}

fn is_owner(name: &str, owner: &str) -> bool {
    !owner.is_empty() && name.eq_ignore_ascii_case(owner)
}

/// Sender plus every comma-separated recipient of one row.
fn participants<'r>(csv: &CsvTable, record: &'r csv::StringRecord) -> Vec<&'r str> {
    let mut names: Vec<&str> = csv.field(record, "FROM").into_iter().collect();
    if let Some(to) = csv.field(record, "TO") {
        names.extend(to.split(',').map(str::trim).filter(|name| !name.is_empty()));
    }
    names
}

/// One counterparty name per `CONVERSATION ID`, so every message of a thread
/// lands in the same conversation. A thread with a single other participant
/// is named after them; a group thread takes its title, or the sorted
/// participant list when untitled.
fn thread_counterparties(csv: &CsvTable, owner: &str) -> HashMap<String, String> {
    if owner.is_empty() {
        return HashMap::new();
    }
    let mut threads: HashMap<&str, (Option<&str>, BTreeSet<&str>)> = HashMap::new();
    for record in &csv.records {
        let Some(id) = csv.field(record, "CONVERSATION ID") else {
            continue;
        };
        let (title, others) = threads.entry(id).or_default();
        if title.is_none() {
            *title = csv.field(record, "CONVERSATION TITLE");
        }
        others.extend(
            participants(csv, record)
                .into_iter()
                .filter(|name| !is_owner(name, owner)),
        );
    }

    threads
        .into_iter()
        .filter_map(|(id, (title, others))| {
            let name = match others.len() {
                0 => return None,
                1 => others.iter().next().map(|name| name.to_string())?,
                _ => title
                    .map(str::to_string)
                    .unwrap_or_else(|| others.into_iter().collect::<Vec<_>>().join(", ")),
            };
            Some((id.to_string(), name))
        })
        .collect()
}

#[derive(Default)]
struct Presence<'r> {
    messages: usize,
    conversations: HashSet<&'r str>,
}

/// The owner takes part in every conversation, so participants are ranked by
/// the number of distinct conversations they appear in, then by message
/// count, then by not being one of the owner's connections.
fn infer_owner(csv: &CsvTable, connections: &HashSet<String>) -> Option<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut presence: HashMap<&str, Presence> = HashMap::new();
    for record in &csv.records {
        let conversation = csv.field(record, "CONVERSATION ID");
        for name in participants(csv, record) {
            let entry = presence.entry(name).or_insert_with(|| {
                order.push(name);
                Presence::default()
            });
            entry.messages += 1;
            entry.conversations.extend(conversation);
        }
    }

    let rank = |name: &str| {
        let seen = &presence[name];
        (
            seen.conversations.len(),
            seen.messages,
            !connections.contains(&name.to_lowercase()),
        )
    };
    // stable sort: equal ranks keep first-seen order
    order.sort_by(|a, b| rank(*b).cmp(&rank(*a)));
    let owner = *order.first()?;
    if let Some(runner_up) = order.get(1) {
        if rank(*runner_up) == rank(owner) {
            tracing::warn!(
                chosen = owner,
                tied_with = *runner_up,
                "cannot tell the export owner apart; pass --owner to be sure"
            );
        }
    }
    Some(owner.to_string())
}

fn parse_connection_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%d %b %Y")
        .ok()
        .or_else(|| parse_day(raw))
}

/// Parses the `YYYY-MM-DD` prefix of a date or date-time string.
fn parse_day(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.get(..10)?;
    NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let naive = raw.trim_end_matches("UTC").trim();
    if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&parsed));
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
