//! Session controller state machine
//!
//! Orchestrates the message store, transport, streaming reveal, and voice
//! bridge for one conversation. Submissions move the controller from
//! `Idle` to `AwaitingReply`; the transport result moves it back. The
//! reveal runs asynchronously and never blocks the controller.

use crate::history::ConversationArchive;
use crate::messages::{Message, MessageStore};
use crate::reveal::{RevealEvent, RevealHandle, Revealer};
use crate::session::config::SessionConfig;
use crate::transport::Transport;
use crate::voice::{VoiceBridge, VoiceEvent, VoiceState};
use crate::{ConfabError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};
use uuid::Uuid;

/// Linear session state; there is no branching persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply,
}

/// An accepted submission, tagged with a monotonic request id so a stale
/// result can never be attributed to a newer exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request_id: u64,
    pub text: String,
    pub voice_origin: bool,
    pub user_message_id: Uuid,
}

/// Events a front-end renders from
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A turn was appended to the conversation
    MessageAppended(Message),

    /// The controller entered `AwaitingReply`; show the typing indicator
    TypingStarted { request_id: u64 },

    /// A reply arrived and its reveal began
    ReplyStarted { message_id: Uuid },

    /// One more character of the reply is visible
    RevealProgress { message_id: Uuid, text: String },

    /// The reply is fully visible
    ReplyComplete { message_id: Uuid, text: String },

    /// The transport failed; `text` is the error bubble already appended
    ReplyFailed { message_id: Uuid, text: String },

    /// A submission was refused because a reply is still pending
    SubmissionRejected { reason: String },

    /// A transcript landed in the pending input slot
    TranscriptReady(String),

    /// The voice bridge changed state
    VoiceStateChanged(VoiceState),

    /// Non-fatal, user-visible notice
    Notice(String),

    /// The session worker has shut down
    Shutdown,
}

pub struct SessionController {
    store: MessageStore,
    transport: Box<dyn Transport>,
    voice: VoiceBridge,
    revealer: Revealer,
    reveal_rx: Receiver<RevealEvent>,
    event_tx: Sender<SessionEvent>,
    archive: ConversationArchive,
    greeting: Option<String>,
    state: SessionState,
    next_request_id: u64,
    current_request: Option<u64>,
    active_reveal: Option<RevealHandle>,
    /// Reveal whose completion should be spoken aloud
    speak_on_complete: Option<Uuid>,
    pending_input: String,
    voice_origin_pending: bool,
}

impl SessionController {
    pub fn new(
        config: &SessionConfig,
        store: MessageStore,
        transport: Box<dyn Transport>,
        voice: VoiceBridge,
        archive: ConversationArchive,
        event_tx: Sender<SessionEvent>,
    ) -> Self {
        if let Some(greeting) = &config.greeting {
            store.append(Message::bot(greeting.clone()));
        }
        let (reveal_tx, reveal_rx) = bounded(config.channel_capacity);
        let revealer = Revealer::new(config.reveal.clone(), store.clone(), reveal_tx);

        Self {
            store,
            transport,
            voice,
            revealer,
            reveal_rx,
            event_tx,
            archive,
            greeting: config.greeting.clone(),
            state: SessionState::Idle,
            next_request_id: 0,
            current_request: None,
            active_reveal: None,
            speak_on_complete: None,
            pending_input: String::new(),
            voice_origin_pending: false,
        }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn archive(&self) -> &ConversationArchive {
        &self.archive
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn voice_state(&self) -> VoiceState {
        self.voice.state()
    }

    /// Text waiting in the input slot (the latest transcript).
    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    /// Accept a submission, appending the user turn before any network
    /// activity so conversation order always reflects submission order.
    ///
    /// Returns `None` when the trimmed input is empty (the conversation is
    /// left untouched) or when a reply is still pending (a rejection event
    /// is emitted). The returned exchange is resolved with the transport
    /// result via [`resolve_exchange`](Self::resolve_exchange).
    pub fn begin_exchange(&mut self, raw: &str) -> Option<Exchange> {
        let text = raw.trim();
        if text.is_empty() {
            debug!("ignoring empty submission");
            return None;
        }
        if self.state == SessionState::AwaitingReply {
            warn!("submission rejected: a reply is still pending");
            self.emit(SessionEvent::SubmissionRejected {
                reason: "a reply is still pending".to_string(),
            });
            return None;
        }

        // A reveal left over from the previous exchange finishes instantly
        // so the new user turn never interleaves with a half-revealed reply.
        self.finish_active_reveal();

        let voice_origin = std::mem::take(&mut self.voice_origin_pending);
        let message = Message::user(text).with_voice_origin(voice_origin);
        let user_message_id = self.store.append(message.clone());
        self.emit(SessionEvent::MessageAppended(message));
        self.pending_input.clear();

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.current_request = Some(request_id);
        self.state = SessionState::AwaitingReply;
        self.emit(SessionEvent::TypingStarted { request_id });

        Some(Exchange {
            request_id,
            text: text.to_string(),
            voice_origin,
            user_message_id,
        })
    }

    /// Feed the transport result back in. Exactly one bot turn is appended
    /// per accepted submission: the reply or an error bubble.
    pub fn resolve_exchange(&mut self, exchange: &Exchange, result: Result<String>) {
        if self.current_request != Some(exchange.request_id) {
            debug!(
                "discarding stale result for request {}",
                exchange.request_id
            );
            return;
        }
        self.current_request = None;
        self.state = SessionState::Idle;

        match result {
            Ok(reply) => {
                let message = Message::bot("");
                let message_id = self.store.append(message.clone());
                self.emit(SessionEvent::MessageAppended(message));
                self.emit(SessionEvent::ReplyStarted { message_id });

                // Spoken replies only for voice-originated submissions.
                if exchange.voice_origin && self.voice.can_speak() {
                    self.speak_on_complete = Some(message_id);
                }
                self.active_reveal = Some(self.revealer.start(message_id, reply));
            }
            Err(err) => {
                let detail = match &err {
                    ConfabError::Network { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                let text = format!("Error: {}. Please try again.", detail);
                let message = Message::bot(text.clone());
                let message_id = self.store.append(message.clone());
                self.emit(SessionEvent::MessageAppended(message));
                self.emit(SessionEvent::ReplyFailed { message_id, text });
            }
        }
    }

    /// Ask the voice bridge to capture. Unsupported capability becomes a
    /// notice, never an error out of the controller.
    pub fn start_listening(&mut self) {
        match self.voice.start_listening() {
            Ok(()) => self.emit(SessionEvent::VoiceStateChanged(self.voice.state())),
            Err(err) => self.emit(SessionEvent::Notice(err.user_message())),
        }
    }

    pub fn stop_listening(&mut self) {
        self.voice.stop_listening();
        self.emit(SessionEvent::VoiceStateChanged(self.voice.state()));
    }

    /// Drain reveal and voice results and emit the corresponding events.
    pub fn poll(&mut self) {
        while let Ok(event) = self.reveal_rx.try_recv() {
            match event {
                RevealEvent::Progress { message_id, text } => {
                    self.emit(SessionEvent::RevealProgress { message_id, text });
                }
                RevealEvent::Complete { message_id, text } => {
                    if self
                        .active_reveal
                        .as_ref()
                        .map(|handle| handle.message_id())
                        == Some(message_id)
                    {
                        self.active_reveal = None;
                    }
                    self.emit(SessionEvent::ReplyComplete {
                        message_id,
                        text: text.clone(),
                    });
                    if self.speak_on_complete == Some(message_id) {
                        self.speak_on_complete = None;
                        match self.voice.speak(&text) {
                            Ok(()) => {
                                self.emit(SessionEvent::VoiceStateChanged(self.voice.state()))
                            }
                            Err(err) => self.emit(SessionEvent::Notice(err.user_message())),
                        }
                    }
                }
                RevealEvent::Cancelled { message_id } => {
                    debug!("reveal cancelled for {}", message_id);
                }
            }
        }

        for event in self.voice.poll() {
            match event {
                VoiceEvent::Transcript(text) => {
                    self.pending_input = text.clone();
                    self.voice_origin_pending = true;
                    self.emit(SessionEvent::TranscriptReady(text));
                    self.emit(SessionEvent::VoiceStateChanged(self.voice.state()));
                }
                VoiceEvent::RecognitionFailed(error) => {
                    self.emit(SessionEvent::Notice(
                        ConfabError::Recognition(error).user_message(),
                    ));
                    self.emit(SessionEvent::VoiceStateChanged(self.voice.state()));
                }
                VoiceEvent::SpeakingFinished => {
                    self.emit(SessionEvent::VoiceStateChanged(self.voice.state()));
                }
                VoiceEvent::SynthesisFailed(error) => {
                    self.emit(SessionEvent::Notice(
                        ConfabError::Synthesis(error).user_message(),
                    ));
                    self.emit(SessionEvent::VoiceStateChanged(self.voice.state()));
                }
            }
        }
    }

    /// Archive the current conversation and start a fresh one.
    pub fn clear_conversation(&mut self) {
        self.finish_active_reveal();
        self.archive.archive(&self.store);
        self.store.clear();
        if let Some(greeting) = &self.greeting {
            let message = Message::bot(greeting.clone());
            self.store.append(message.clone());
            self.emit(SessionEvent::MessageAppended(message));
        }
    }

    /// Release the long-lived resources: the reveal worker and the voice
    /// capabilities.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.active_reveal.take() {
            handle.cancel();
        }
        self.voice.shutdown();
    }

    fn finish_active_reveal(&mut self) {
        if let Some(handle) = self.active_reveal.take() {
            let message_id = handle.message_id();
            let text = handle.full_text().to_string();
            match handle.finish_now(&self.store) {
                Ok(true) => self.emit(SessionEvent::ReplyComplete { message_id, text }),
                Ok(false) => {}
                Err(err) => warn!("could not finalize reveal: {}", err),
            }
        }
        self.speak_on_complete = None;
    }

    fn emit(&self, event: SessionEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("session event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sender as MessageSender;
    use crate::reveal::RevealConfig;
    use crate::session::config::DEFAULT_GREETING;
    use crate::transport::EchoTransport;
    use crate::voice::{
        RecognizerCapability, SimulatedRecognizer, SimulatedSynthesizer, SynthesizerCapability,
    };
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    fn test_config() -> SessionConfig {
        SessionConfig::new()
            .without_greeting()
            .with_reveal(RevealConfig::new().with_cadence(Duration::from_millis(1)))
    }

    fn controller_with_voice(
        config: &SessionConfig,
        voice: VoiceBridge,
    ) -> (SessionController, Receiver<SessionEvent>) {
        let (event_tx, event_rx) = unbounded();
        let controller = SessionController::new(
            config,
            MessageStore::new(),
            Box::new(EchoTransport::new()),
            voice,
            ConversationArchive::new(),
            event_tx,
        );
        (controller, event_rx)
    }

    fn controller(config: &SessionConfig) -> (SessionController, Receiver<SessionEvent>) {
        controller_with_voice(config, VoiceBridge::unavailable())
    }

    fn drain_until_complete(
        controller: &mut SessionController,
        events: &Receiver<SessionEvent>,
    ) -> Vec<SessionEvent> {
        let mut seen = Vec::new();
        for _ in 0..500 {
            controller.poll();
            while let Ok(event) = events.try_recv() {
                seen.push(event);
            }
            if seen
                .iter()
                .any(|e| matches!(e, SessionEvent::ReplyComplete { .. }))
            {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        seen
    }

    #[test]
    fn test_empty_submission_is_ignored() {
        let config = test_config();
        let (mut controller, events) = controller(&config);

        assert!(controller.begin_exchange("").is_none());
        assert!(controller.begin_exchange("   \t ").is_none());
        assert!(controller.store().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_exchange_appends_exactly_two_turns() {
        let config = test_config();
        let (mut controller, events) = controller(&config);

        let exchange = controller.begin_exchange("  hello  ").unwrap();
        assert_eq!(exchange.text, "hello");
        assert_eq!(controller.state(), SessionState::AwaitingReply);
        assert_eq!(controller.store().len(), 1);

        controller.resolve_exchange(&exchange, Ok("hi there".to_string()));
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(controller.store().len(), 2);

        drain_until_complete(&mut controller, &events);
        let all = controller.store().all();
        assert_eq!(all[0].sender, MessageSender::User);
        assert_eq!(all[0].text, "hello");
        assert_eq!(all[1].sender, MessageSender::Bot);
        assert_eq!(all[1].text, "hi there");
    }

    #[test]
    fn test_submission_while_awaiting_reply_is_rejected() {
        let config = test_config();
        let (mut controller, events) = controller(&config);

        let exchange = controller.begin_exchange("first").unwrap();
        assert!(controller.begin_exchange("second").is_none());
        assert_eq!(controller.store().len(), 1);

        let seen: Vec<SessionEvent> = events.try_iter().collect();
        assert!(seen
            .iter()
            .any(|e| matches!(e, SessionEvent::SubmissionRejected { .. })));

        // The pending exchange still resolves normally.
        controller.resolve_exchange(&exchange, Ok("reply".to_string()));
        assert_eq!(controller.store().len(), 2);
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let config = test_config();
        let (mut controller, events) = controller(&config);

        let exchange = controller.begin_exchange("question").unwrap();
        controller.resolve_exchange(&exchange, Ok("answer".to_string()));
        drain_until_complete(&mut controller, &events);
        let len_after = controller.store().len();

        // A second result for the same request id arrives late.
        controller.resolve_exchange(&exchange, Ok("duplicate".to_string()));
        assert_eq!(controller.store().len(), len_after);
    }

    #[test]
    fn test_transport_failure_becomes_error_bubble() {
        let config = test_config();
        let (mut controller, events) = controller(&config);

        let exchange = controller.begin_exchange("test").unwrap();
        controller.resolve_exchange(
            &exchange,
            Err(ConfabError::Network {
                status: Some(500),
                message: "backend unavailable".to_string(),
            }),
        );

        assert_eq!(controller.state(), SessionState::Idle);
        let all = controller.store().all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].sender, MessageSender::Bot);
        assert_eq!(all[1].text, "Error: backend unavailable. Please try again.");

        let seen: Vec<SessionEvent> = events.try_iter().collect();
        assert!(seen
            .iter()
            .any(|e| matches!(e, SessionEvent::ReplyFailed { .. })));
    }

    #[test]
    fn test_sequential_exchanges_stay_independent() {
        let config = test_config();
        let (mut controller, events) = controller(&config);

        for _ in 0..2 {
            let exchange = controller.begin_exchange("ping").unwrap();
            controller.resolve_exchange(&exchange, Ok("pong".to_string()));
            drain_until_complete(&mut controller, &events);
        }

        let all = controller.store().all();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].text, "ping");
        assert_eq!(all[1].text, "pong");
        assert_eq!(all[2].text, "ping");
        assert_eq!(all[3].text, "pong");
    }

    #[test]
    fn test_new_exchange_finishes_outstanding_reveal() {
        let config = SessionConfig::new()
            .without_greeting()
            .with_reveal(RevealConfig::new().with_cadence(Duration::from_millis(50)));
        let (mut controller, _events) = controller(&config);

        let first = controller.begin_exchange("first").unwrap();
        controller.resolve_exchange(&first, Ok("a reply too long to finish".to_string()));

        // Submitting again finalizes the reveal before the new user turn.
        let _second = controller.begin_exchange("second").unwrap();
        let all = controller.store().all();
        assert_eq!(all[1].text, "a reply too long to finish");
        assert_eq!(all[2].text, "second");
    }

    #[test]
    fn test_voice_origin_triggers_spoken_reply() {
        let config = test_config();
        let voice = VoiceBridge::new(
            RecognizerCapability::Available(Box::new(SimulatedRecognizer::new("what time is it"))),
            SynthesizerCapability::Available(Box::new(SimulatedSynthesizer)),
        );
        let (mut controller, events) = controller_with_voice(&config, voice);

        controller.start_listening();
        controller.poll();
        assert_eq!(controller.pending_input(), "what time is it");

        let text = controller.pending_input().to_string();
        let exchange = controller.begin_exchange(&text).unwrap();
        assert!(exchange.voice_origin);
        assert!(controller.store().all()[0].voice_origin);

        controller.resolve_exchange(&exchange, Ok("It is noon.".to_string()));
        let seen = drain_until_complete(&mut controller, &events);
        controller.poll();

        assert!(seen
            .iter()
            .any(|e| matches!(e, SessionEvent::VoiceStateChanged(VoiceState::Speaking))));
    }

    #[test]
    fn test_typed_submission_is_not_spoken() {
        let config = test_config();
        let voice = VoiceBridge::new(
            RecognizerCapability::Unavailable,
            SynthesizerCapability::Available(Box::new(SimulatedSynthesizer)),
        );
        let (mut controller, events) = controller_with_voice(&config, voice);

        let exchange = controller.begin_exchange("typed question").unwrap();
        controller.resolve_exchange(&exchange, Ok("typed answer".to_string()));
        let seen = drain_until_complete(&mut controller, &events);
        controller.poll();

        assert!(!seen
            .iter()
            .any(|e| matches!(e, SessionEvent::VoiceStateChanged(VoiceState::Speaking))));
        assert_eq!(controller.voice_state(), VoiceState::Idle);
    }

    #[test]
    fn test_unsupported_voice_becomes_notice() {
        let config = test_config();
        let (mut controller, events) = controller(&config);

        controller.start_listening();
        let seen: Vec<SessionEvent> = events.try_iter().collect();
        assert!(seen.iter().any(|e| matches!(e, SessionEvent::Notice(_))));
        assert_eq!(controller.voice_state(), VoiceState::Idle);
    }

    #[test]
    fn test_clear_conversation_archives_and_reseeds() {
        let config = SessionConfig::new()
            .with_reveal(RevealConfig::new().with_cadence(Duration::from_millis(1)));
        let (event_tx, events) = unbounded();
        let mut controller = SessionController::new(
            &config,
            MessageStore::new(),
            Box::new(EchoTransport::new()),
            VoiceBridge::unavailable(),
            ConversationArchive::new(),
            event_tx,
        );
        assert_eq!(controller.store().len(), 1); // seed greeting

        let exchange = controller.begin_exchange("archive me").unwrap();
        controller.resolve_exchange(&exchange, Ok("done".to_string()));
        drain_until_complete(&mut controller, &events);

        controller.clear_conversation();
        assert_eq!(controller.archive().len(), 1);
        assert_eq!(controller.archive().entries()[0].title, "archive me");
        // Fresh conversation carries only the greeting again.
        assert_eq!(controller.store().len(), 1);
        assert_eq!(controller.store().last().unwrap().text, DEFAULT_GREETING);
    }

    #[test]
    fn test_empty_reply_completes_immediately() {
        let config = test_config();
        let (mut controller, events) = controller(&config);

        let exchange = controller.begin_exchange("say nothing").unwrap();
        controller.resolve_exchange(&exchange, Ok(String::new()));
        controller.poll();

        let seen: Vec<SessionEvent> = events.try_iter().collect();
        assert!(seen
            .iter()
            .any(|e| matches!(e, SessionEvent::ReplyComplete { text, .. } if text.is_empty())));
        assert_eq!(controller.store().last().unwrap().text, "");
    }
}
