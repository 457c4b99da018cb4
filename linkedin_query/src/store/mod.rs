pub mod models;

use models::{Comment, Connection, Message, Post, Reaction};
use std::collections::BTreeSet;

/// Optional columns whose absence changes query behaviour.
pub const COMMENT_MESSAGE_COLUMN: &str = "Message";
pub const REACTION_TYPE_COLUMN: &str = "Type";

/// Rows loaded from one CSV file together with the columns that file carried.
#[derive(Debug, Clone)]
pub struct Table<T> {
    pub rows: Vec<T>,
    pub columns: BTreeSet<String>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            columns: BTreeSet::new(),
        }
    }
}

impl<T> Table<T> {
    pub fn new<I, S>(rows: Vec<T>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything loaded from one export. Built once per run, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub connections: Table<Connection>,
    pub posts: Vec<Post>,
    pub comments: Table<Comment>,
    pub reactions: Table<Reaction>,
    pub messages: Table<Message>,
}
