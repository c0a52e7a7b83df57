//! Transport adapter for the backend chat API
//!
//! One request per submission; no retry, no queueing, no coalescing. The
//! HTTP implementation talks to the `/ask/` and `/chat/` endpoints; the
//! echo implementation answers locally for demos and tests.

pub mod auth;
pub mod http;

pub use auth::{AuthSession, User};
pub use http::{AskDialect, HttpTransport, TransportConfig, CSRF_COOKIE, CSRF_HEADER};

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Resolves one user submission to one reply string.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, text: &str) -> Result<String>;
}

/// Transport that answers locally without a backend, echoing the
/// submission back after an optional delay.
#[derive(Debug, Clone, Default)]
pub struct EchoTransport {
    delay: Option<Duration>,
}

impl EchoTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay each reply, imitating a round-trip.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Transport for EchoTransport {
    async fn send(&self, text: &str) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(format!("You said: \"{}\" (Simulated)", text))
    }
}
