//! Client-side reminder list
//!
//! Reminders live in memory for the session; nothing is persisted.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due: DateTime<Utc>,
    pub priority: Priority,
    pub completed: bool,
}

impl Reminder {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        due: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            due,
            priority: Priority::default(),
            completed: false,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Thread-safe reminder list with an active/completed partition
#[derive(Clone)]
pub struct ReminderStore {
    reminders: Arc<RwLock<Vec<Reminder>>>,
}

impl ReminderStore {
    pub fn new() -> Self {
        Self {
            reminders: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add a reminder. Untitled reminders are rejected.
    pub fn add(&self, reminder: Reminder) -> Option<Uuid> {
        if reminder.title.trim().is_empty() {
            return None;
        }
        let id = reminder.id;
        self.reminders.write().push(reminder);
        Some(id)
    }

    /// Flip the completed flag. Returns false when the id is unknown.
    pub fn toggle_completed(&self, id: Uuid) -> bool {
        let mut reminders = self.reminders.write();
        match reminders.iter_mut().find(|r| r.id == id) {
            Some(reminder) => {
                reminder.completed = !reminder.completed;
                true
            }
            None => false,
        }
    }

    /// Delete a reminder. Returns false when the id is unknown.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut reminders = self.reminders.write();
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        reminders.len() < before
    }

    pub fn all(&self) -> Vec<Reminder> {
        self.reminders.read().clone()
    }

    pub fn active(&self) -> Vec<Reminder> {
        self.reminders
            .read()
            .iter()
            .filter(|r| !r.completed)
            .cloned()
            .collect()
    }

    pub fn completed(&self) -> Vec<Reminder> {
        self.reminders
            .read()
            .iter()
            .filter(|r| r.completed)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reminders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.read().is_empty()
    }
}

impl Default for ReminderStore {
    fn default() -> Self {
        Self::new()
    }
}
