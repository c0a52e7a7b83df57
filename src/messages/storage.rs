use super::types::Message;
use crate::{ConfabError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Ordered, thread-safe conversation store.
///
/// Insertion order is display order. Turns are append-only except for the
/// single in-flight mutation performed by the streaming reveal, which may
/// only target the most recently appended turn.
#[derive(Debug, Clone)]
pub struct MessageStore {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append a turn and return its id.
    pub fn append(&self, message: Message) -> Uuid {
        let id = message.id;
        self.messages.write().push(message);
        id
    }

    /// Rewrite the text of the last turn.
    ///
    /// Targeting any other turn is an error: history is immutable.
    pub fn update_text(&self, id: Uuid, new_text: impl Into<String>) -> Result<()> {
        let mut messages = self.messages.write();
        match messages.last_mut() {
            Some(last) if last.id == id => {
                last.text = new_text.into();
                Ok(())
            }
            Some(_) => Err(ConfabError::MessageUpdate(format!(
                "message {} is not the last turn",
                id
            ))),
            None => Err(ConfabError::MessageUpdate(
                "conversation is empty".to_string(),
            )),
        }
    }

    pub fn all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn clear(&self) {
        self.messages.write().clear();
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sender;

    #[test]
    fn test_append_preserves_order() {
        let store = MessageStore::new();
        store.append(Message::user("first"));
        store.append(Message::bot("second"));

        let all = store.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].text, "first");
        assert_eq!(all[0].sender, Sender::User);
        assert_eq!(all[1].text, "second");
        assert_eq!(all[1].sender, Sender::Bot);
    }

    #[test]
    fn test_update_last_turn() {
        let store = MessageStore::new();
        store.append(Message::user("question"));
        let id = store.append(Message::bot(""));

        store.update_text(id, "partial").unwrap();
        assert_eq!(store.last().unwrap().text, "partial");

        store.update_text(id, "partial answer").unwrap();
        assert_eq!(store.last().unwrap().text, "partial answer");
    }

    #[test]
    fn test_update_rejects_non_last_turn() {
        let store = MessageStore::new();
        let old = store.append(Message::bot("settled reply"));
        store.append(Message::user("next question"));

        let err = store.update_text(old, "rewritten").unwrap_err();
        assert!(matches!(err, ConfabError::MessageUpdate(_)));
        assert_eq!(store.all()[0].text, "settled reply");
    }

    #[test]
    fn test_update_empty_store_fails() {
        let store = MessageStore::new();
        let err = store.update_text(Uuid::new_v4(), "x").unwrap_err();
        assert!(matches!(err, ConfabError::MessageUpdate(_)));
    }

    #[test]
    fn test_clear() {
        let store = MessageStore::new();
        store.append(Message::user("hello"));
        assert!(!store.is_empty());

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }
}
