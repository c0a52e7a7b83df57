//! In-memory index of finished conversations

use crate::messages::{MessageStore, Sender};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const TITLE_MAX_CHARS: usize = 48;
const PREVIEW_MAX_CHARS: usize = 80;

/// One archived conversation: enough to render a history list, not the
/// turns themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub title: String,
    pub preview: String,
    pub started_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Thread-safe archive of history entries
#[derive(Clone)]
pub struct ConversationArchive {
    entries: Arc<RwLock<Vec<HistoryEntry>>>,
}

impl ConversationArchive {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot a conversation into the archive.
    ///
    /// The title is the first user turn, the preview the last turn.
    /// Conversations without a user turn (a bare greeting) are not
    /// recorded and `None` is returned.
    pub fn archive(&self, store: &MessageStore) -> Option<HistoryEntry> {
        let messages = store.all();
        let first_user = messages.iter().find(|m| m.sender == Sender::User)?;

        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            title: truncate(&first_user.text, TITLE_MAX_CHARS),
            preview: messages
                .last()
                .map(|m| truncate(&m.text, PREVIEW_MAX_CHARS))
                .unwrap_or_default(),
            started_at: messages
                .first()
                .map(|m| m.created_at)
                .unwrap_or_else(Utc::now),
            message_count: messages.len(),
        };
        self.entries.write().push(entry.clone());
        Some(entry)
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.read().clone()
    }

    /// Delete an entry. Returns false when the id is unknown.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() < before
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for ConversationArchive {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
