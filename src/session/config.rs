//! Configuration for a chat session

use crate::reveal::RevealConfig;
use crate::transport::TransportConfig;
use crate::{ConfabError, Result};

/// Greeting seeded as the first bot turn of a new conversation
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Backend transport settings
    pub transport: TransportConfig,

    /// Streaming reveal settings
    pub reveal: RevealConfig,

    /// Seed greeting; `None` starts the conversation empty
    pub greeting: Option<String>,

    /// Bound for the command and event channels
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            reveal: RevealConfig::default(),
            greeting: Some(DEFAULT_GREETING.to_string()),
            channel_capacity: 100,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_reveal(mut self, reveal: RevealConfig) -> Self {
        self.reveal = reveal;
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Start conversations empty, without the seed greeting.
    pub fn without_greeting(mut self) -> Self {
        self.greeting = None;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.transport.validate()?;
        if self.channel_capacity == 0 {
            return Err(ConfabError::Config(
                "channel capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
