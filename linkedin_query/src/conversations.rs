use crate::store::models::Message;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Latest exchange with one counterparty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub other: String,
    pub last_content: String,
    pub last_date: DateTime<Utc>,
    pub awaiting_your_reply: bool,
}

impl Conversation {
    fn from_latest(message: &Message) -> Self {
        Self {
            other: message.counterparty.clone(),
            last_content: message.content.clone(),
            last_date: message.date,
            awaiting_your_reply: !message.sent_by_owner,
        }
    }
}

/// Groups messages by counterparty and reduces each group to its most recent
/// message. Input order is arbitrary; when two messages share the exact
/// latest timestamp the one seen first wins. Output is newest first.
pub fn build_conversations(messages: &[Message]) -> Vec<Conversation> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut latest: Vec<&Message> = Vec::new();

    for message in messages {
        match slots.get(message.counterparty.as_str()) {
            Some(&slot) => {
                if message.date > latest[slot].date {
                    latest[slot] = message;
                }
            }
            None => {
                slots.insert(message.counterparty.as_str(), latest.len());
                latest.push(message);
            }
        }
    }

    let mut conversations: Vec<Conversation> =
        latest.into_iter().map(Conversation::from_latest).collect();
    conversations.sort_by(|a, b| b.last_date.cmp(&a.last_date));
    tracing::debug!(
        messages = messages.len(),
        conversations = conversations.len(),
        "built conversations"
    );
    conversations
}
