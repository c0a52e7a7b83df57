//! Channel-driven session pipeline
//!
//! Wraps the controller in a worker thread with bounded command/event
//! channels. Commands are processed in arrival order, so transport calls
//! are naturally serialized: one request per submission, resolved before
//! the next command is taken.

use crate::history::ConversationArchive;
use crate::messages::MessageStore;
use crate::session::config::SessionConfig;
use crate::session::controller::{SessionController, SessionEvent};
use crate::transport::{HttpTransport, Transport};
use crate::voice::VoiceBridge;
use crate::Result;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{error, info, warn};

/// Commands accepted by the session worker
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Submit user text for an exchange
    Submit(String),

    /// Begin a voice capture
    StartListening,

    /// Stop an in-progress voice capture
    StopListening,

    /// Archive the conversation and start a fresh one
    ClearConversation,

    /// Shut the worker down
    Shutdown,
}

/// Session pipeline with channel-based communication
pub struct SessionPipeline {
    config: SessionConfig,
    store: MessageStore,
    archive: ConversationArchive,
    transport: Option<Box<dyn Transport>>,
    voice: Option<VoiceBridge>,
    command_tx: Sender<SessionCommand>,
    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,
    event_rx: Receiver<SessionEvent>,
}

impl SessionPipeline {
    /// Create a new pipeline
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let (command_tx, command_rx) = bounded(config.channel_capacity);
        let (event_tx, event_rx) = bounded(config.channel_capacity);

        Ok(Self {
            config,
            store: MessageStore::new(),
            archive: ConversationArchive::new(),
            transport: None,
            voice: None,
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        })
    }

    /// Replace the HTTP transport, e.g. with the echo transport.
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach a voice bridge; without one every voice command surfaces an
    /// unsupported notice.
    pub fn with_voice(mut self, voice: VoiceBridge) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Get a sender for commands
    pub fn command_sender(&self) -> Sender<SessionCommand> {
        self.command_tx.clone()
    }

    /// Get a receiver for events
    pub fn event_receiver(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }

    /// Shared handle to the conversation store
    pub fn store(&self) -> MessageStore {
        self.store.clone()
    }

    /// Shared handle to the archive of cleared conversations
    pub fn archive(&self) -> ConversationArchive {
        self.archive.clone()
    }

    /// Start the pipeline worker thread.
    pub fn start_worker(self) -> Result<JoinHandle<()>> {
        let transport: Box<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Box::new(HttpTransport::new(self.config.transport.clone())?),
        };
        let voice = self.voice.unwrap_or_else(VoiceBridge::unavailable);
        let config = self.config;
        let store = self.store;
        let archive = self.archive;
        let command_rx = self.command_rx;
        let event_tx = self.event_tx;

        let handle = thread::spawn(move || {
            let runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("failed to create tokio runtime: {}", e);
                    let _ = event_tx.send(SessionEvent::Notice(
                        "Internal communication error. Please restart the application."
                            .to_string(),
                    ));
                    let _ = event_tx.send(SessionEvent::Shutdown);
                    return;
                }
            };

            let mut controller = SessionController::new(
                &config,
                store,
                transport,
                voice,
                archive,
                event_tx.clone(),
            );
            info!("session worker ready");

            loop {
                match command_rx.recv_timeout(Duration::from_millis(10)) {
                    Ok(SessionCommand::Submit(text)) => {
                        if let Some(exchange) = controller.begin_exchange(&text) {
                            let result =
                                runtime.block_on(controller.transport().send(&exchange.text));
                            controller.resolve_exchange(&exchange, result);
                        }
                    }
                    Ok(SessionCommand::StartListening) => controller.start_listening(),
                    Ok(SessionCommand::StopListening) => controller.stop_listening(),
                    Ok(SessionCommand::ClearConversation) => controller.clear_conversation(),
                    Ok(SessionCommand::Shutdown) => {
                        info!("session worker shutdown requested");
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        warn!("command channel disconnected");
                        break;
                    }
                }
                controller.poll();
            }

            controller.shutdown();
            let _ = event_tx.send(SessionEvent::Shutdown);
            info!("session worker stopped");
        });

        Ok(handle)
    }
}
