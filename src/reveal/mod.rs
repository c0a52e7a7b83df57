//! Streaming reveal of bot replies
//!
//! Discloses a complete reply string into the last conversation turn one
//! character per tick, the typewriter effect of the chat front-end. The
//! worker writes the accumulated prefix through `MessageStore::update_text`
//! on every tick and emits progress and completion events on a channel.

use crate::messages::MessageStore;
use crate::Result;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Reference cadence of the chat front-end's typewriter effect
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(25);

/// Configuration for the streaming reveal
#[derive(Clone, Debug)]
pub struct RevealConfig {
    /// Delay between revealed characters
    pub cadence: Duration,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
        }
    }
}

impl RevealConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-character delay
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }
}

/// Events emitted while a reply is being revealed
#[derive(Debug, Clone)]
pub enum RevealEvent {
    /// One more character is visible; `text` is the accumulated prefix
    Progress { message_id: Uuid, text: String },

    /// All characters are visible and the worker has stopped
    Complete { message_id: Uuid, text: String },

    /// The reveal was cancelled before completion
    Cancelled { message_id: Uuid },
}

/// Spawns reveal workers bound to one store and one event channel.
///
/// At most one reveal should run at a time; the session controller finishes
/// any outstanding reveal before starting another.
pub struct Revealer {
    config: RevealConfig,
    store: MessageStore,
    event_tx: Sender<RevealEvent>,
}

impl Revealer {
    pub fn new(config: RevealConfig, store: MessageStore, event_tx: Sender<RevealEvent>) -> Self {
        Self {
            config,
            store,
            event_tx,
        }
    }

    /// Begin revealing `full_text` into the turn identified by `message_id`.
    ///
    /// An empty `full_text` completes immediately: no worker is spawned, no
    /// tick fires, and a `Complete` event is emitted right away.
    pub fn start(&self, message_id: Uuid, full_text: impl Into<String>) -> RevealHandle {
        let full_text = full_text.into();
        if full_text.is_empty() {
            debug!("empty reply, reveal completes immediately");
            let _ = self.event_tx.send(RevealEvent::Complete {
                message_id,
                text: String::new(),
            });
            return RevealHandle::completed(message_id, full_text);
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let store = self.store.clone();
        let event_tx = self.event_tx.clone();
        let cadence = self.config.cadence;
        let chars: Vec<char> = full_text.chars().collect();
        let worker_cancelled = Arc::clone(&cancelled);
        let worker_done = Arc::clone(&done);

        let join = thread::spawn(move || {
            let mut revealed = String::new();
            for ch in chars {
                if worker_cancelled.load(Ordering::SeqCst) {
                    let _ = event_tx.send(RevealEvent::Cancelled { message_id });
                    return;
                }
                thread::sleep(cadence);
                if worker_cancelled.load(Ordering::SeqCst) {
                    let _ = event_tx.send(RevealEvent::Cancelled { message_id });
                    return;
                }
                revealed.push(ch);
                if let Err(e) = store.update_text(message_id, revealed.clone()) {
                    // The target is no longer the last turn; stop rather
                    // than rewrite history.
                    warn!("reveal stopped: {}", e);
                    return;
                }
                let _ = event_tx.send(RevealEvent::Progress {
                    message_id,
                    text: revealed.clone(),
                });
            }
            worker_done.store(true, Ordering::SeqCst);
            let _ = event_tx.send(RevealEvent::Complete {
                message_id,
                text: revealed,
            });
        });

        RevealHandle {
            message_id,
            full_text,
            cancelled,
            done,
            join: Some(join),
        }
    }
}

/// Handle to a running reveal.
///
/// Dropping the handle detaches the worker (the reveal keeps running to
/// completion); `cancel` stops it at the next tick.
pub struct RevealHandle {
    message_id: Uuid,
    full_text: String,
    cancelled: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl RevealHandle {
    fn completed(message_id: Uuid, full_text: String) -> Self {
        Self {
            message_id,
            full_text,
            cancelled: Arc::new(AtomicBool::new(false)),
            done: Arc::new(AtomicBool::new(true)),
            join: None,
        }
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    /// The complete reply this reveal is disclosing
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Whether the reveal ran to completion
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Stop the worker at the next tick without touching the revealed text.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Cancel the worker and write the complete reply in one step.
    ///
    /// Returns `Ok(true)` when the text was finalized here, `Ok(false)` when
    /// the reveal had already completed on its own.
    pub fn finish_now(mut self, store: &MessageStore) -> Result<bool> {
        if self.is_done() {
            return Ok(false);
        }
        self.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        if self.is_done() {
            // Completed naturally while we waited.
            return Ok(false);
        }
        store.update_text(self.message_id, self.full_text.clone())?;
        Ok(true)
    }

    /// Block until the worker exits. Test and teardown helper.
    pub fn join(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Message;
    use crossbeam_channel::unbounded;

    fn fast_revealer(store: &MessageStore) -> (Revealer, crossbeam_channel::Receiver<RevealEvent>) {
        let (tx, rx) = unbounded();
        let config = RevealConfig::new().with_cadence(Duration::from_millis(1));
        (Revealer::new(config, store.clone(), tx), rx)
    }

    #[test]
    fn test_empty_reply_completes_without_ticking() {
        let store = MessageStore::new();
        let id = store.append(Message::bot(""));
        let (revealer, rx) = fast_revealer(&store);

        let handle = revealer.start(id, "");
        assert!(handle.is_done());

        match rx.recv_timeout(Duration::from_millis(100)).unwrap() {
            RevealEvent::Complete { message_id, text } => {
                assert_eq!(message_id, id);
                assert_eq!(text, "");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(store.last().unwrap().text, "");
    }

    #[test]
    fn test_reveal_discloses_prefixes_in_order() {
        let store = MessageStore::new();
        let id = store.append(Message::bot(""));
        let (revealer, rx) = fast_revealer(&store);

        let handle = revealer.start(id, "hi");
        handle.join();

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                RevealEvent::Progress { text, .. } => seen.push(text),
                RevealEvent::Complete { text, .. } => {
                    assert_eq!(text, "hi");
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(seen, vec!["h".to_string(), "hi".to_string()]);
        assert_eq!(store.last().unwrap().text, "hi");
    }

    #[test]
    fn test_reveal_is_char_based() {
        let store = MessageStore::new();
        let id = store.append(Message::bot(""));
        let (revealer, rx) = fast_revealer(&store);

        let handle = revealer.start(id, "héllo");
        handle.join();

        let mut last_progress = String::new();
        while let Ok(event) = rx.try_recv() {
            if let RevealEvent::Progress { text, .. } = event {
                last_progress = text;
            }
        }
        assert_eq!(last_progress, "héllo");
        assert_eq!(store.last().unwrap().text, "héllo");
    }

    #[test]
    fn test_cancel_stops_the_worker() {
        let store = MessageStore::new();
        let id = store.append(Message::bot(""));
        let (revealer, rx) = fast_revealer(&store);

        let handle = revealer.start(id, "a long reply that will not finish");
        handle.cancel();
        handle.join();

        let events: Vec<RevealEvent> = rx.try_iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, RevealEvent::Cancelled { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, RevealEvent::Complete { .. })));
    }

    #[test]
    fn test_finish_now_writes_full_text() {
        let store = MessageStore::new();
        let id = store.append(Message::bot(""));
        let (tx, _rx) = unbounded();
        let config = RevealConfig::new().with_cadence(Duration::from_millis(50));
        let slow = Revealer::new(config, store.clone(), tx);

        let handle = slow.start(id, "the whole reply");
        let finalized = handle.finish_now(&store).unwrap();
        assert!(finalized);
        assert_eq!(store.last().unwrap().text, "the whole reply");
    }

    #[test]
    fn test_reveal_stops_when_target_is_no_longer_last() {
        let store = MessageStore::new();
        let id = store.append(Message::bot(""));
        let (tx, rx) = unbounded();
        let config = RevealConfig::new().with_cadence(Duration::from_millis(5));
        let revealer = Revealer::new(config, store.clone(), tx);

        let handle = revealer.start(id, "abcdefghij");
        // Bury the target under a newer turn before the reveal can finish.
        store.append(Message::user("newer"));
        handle.join();

        assert_eq!(store.all()[1].text, "newer");
        let events: Vec<RevealEvent> = rx.try_iter().collect();
        assert!(!events
            .iter()
            .any(|e| matches!(e, RevealEvent::Complete { .. })));
    }
}
