//! Session controller and its channel-driven pipeline

pub mod config;
pub mod controller;
pub mod pipeline;

pub use config::{SessionConfig, DEFAULT_GREETING};
pub use controller::{Exchange, SessionController, SessionEvent, SessionState};
pub use pipeline::{SessionCommand, SessionPipeline};
