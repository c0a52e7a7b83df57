pub mod history;
pub mod messages;
pub mod reminders;
pub mod reveal;
pub mod session;
pub mod transport;
pub mod voice;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ConfabError {
    #[error("Network error: {message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    #[error("Voice capability unavailable: {0}")]
    VoiceUnsupported(String),

    #[error("Speech recognition error: {0}")]
    Recognition(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Message update error: {0}")]
    MessageUpdate(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ConfabError {
    fn from(e: reqwest::Error) -> Self {
        ConfabError::Network {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl ConfabError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The backend may come back; the user can resend
            ConfabError::Network { .. } => true,
            // A missing capability does not change within a session
            ConfabError::VoiceUnsupported(_) => false,
            // These are typically transient errors
            ConfabError::Recognition(_) => true,
            ConfabError::Synthesis(_) => true,
            ConfabError::MessageUpdate(_) => false,
            ConfabError::Channel(_) => false,
            ConfabError::Config(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            ConfabError::Network { .. } => {
                "Could not reach the assistant. Please try again.".to_string()
            }
            ConfabError::VoiceUnsupported(_) => {
                "Voice features are not supported in this environment.".to_string()
            }
            ConfabError::Recognition(_) => {
                "Could not recognize speech. Please try again.".to_string()
            }
            ConfabError::Synthesis(_) => {
                "Text-to-speech failed. The reply is shown as text.".to_string()
            }
            ConfabError::MessageUpdate(_) => "Internal conversation error.".to_string(),
            ConfabError::Channel(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            ConfabError::Config(_) => "Configuration error. Please check settings.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfabError>;
