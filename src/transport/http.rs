//! HTTP transport over the chat backend
//!
//! Two request/response dialects exist in the wild: `POST /ask/` taking
//! `{"question"}` and answering `{"answer"}`, and `POST /chat/` taking
//! `{"message"}` and answering `{"response"}`. Errors come back as
//! `{"error"}` with a non-2xx status. An anti-forgery token, when
//! configured, is echoed in the `X-CSRFToken` header; cookies are enabled
//! on the client so the backend session cookie round-trips.

use super::auth::User;
use super::Transport;
use crate::{ConfabError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Header the anti-forgery token is echoed in
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Cookie the backend issues the anti-forgery token under
pub const CSRF_COOKIE: &str = "csrftoken";

/// Reply text used when the backend answers 2xx without a reply field
const NO_REPLY_FALLBACK: &str = "No reply";

/// Which request/response dialect the backend speaks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AskDialect {
    /// `POST /ask/` with `{"question"}`, answered by `{"answer"}`
    #[default]
    Question,
    /// `POST /chat/` with `{"message"}`, answered by `{"response"}`
    Message,
}

impl AskDialect {
    pub fn path(&self) -> &'static str {
        match self {
            AskDialect::Question => "/ask/",
            AskDialect::Message => "/chat/",
        }
    }
}

/// Configuration for the HTTP transport
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Base URL of the backend
    pub base_url: String,

    /// Endpoint dialect to use
    pub dialect: AskDialect,

    /// Per-request timeout
    pub timeout: Duration,

    /// Anti-forgery token to echo in `X-CSRFToken`, when the backend
    /// requires one
    pub csrf_token: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            dialect: AskDialect::default(),
            timeout: Duration::from_secs(30),
            csrf_token: None,
        }
    }
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_dialect(mut self, dialect: AskDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfabError::Config(format!("invalid base URL: {}", e)))?;
        if self.timeout.is_zero() {
            return Err(ConfabError::Config("timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct QuestionBody<'a> {
    question: &'a str,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ReplyBody {
    answer: Option<String>,
    response: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    user: User,
}

/// Pick the reply string out of a 2xx body, across both dialects.
fn reply_from_body(body: ReplyBody) -> String {
    body.answer
        .or(body.response)
        .unwrap_or_else(|| NO_REPLY_FALLBACK.to_string())
}

pub struct HttpTransport {
    config: TransportConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Map a non-2xx response to a `Network` error, preferring the
    /// backend's `{"error"}` message over the bare status line.
    async fn error_from_response(response: reqwest::Response) -> ConfabError {
        let status = response.status().as_u16();
        let message = response
            .json::<ReplyBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| format!("HTTP error! status: {}", status));
        ConfabError::Network {
            status: Some(status),
            message,
        }
    }

    /// Authenticate against `POST /login/` and return the user record.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let url = self.url_for("/login/");
        debug!("logging in via {}", url);

        let mut request = self.client.post(&url);
        if let Some(token) = &self.config.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }
        let response = request.json(&LoginBody { email, password }).send().await?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            warn!("login failed: {}", err);
            return Err(err);
        }
        let body: LoginResponse = response.json().await?;
        Ok(body.user)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, text: &str) -> Result<String> {
        let url = self.url_for(self.config.dialect.path());
        debug!("sending submission to {}", url);

        let mut request = self.client.post(&url);
        if let Some(token) = &self.config.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }
        let request = match self.config.dialect {
            AskDialect::Question => request.json(&QuestionBody { question: text }),
            AskDialect::Message => request.json(&MessageBody { message: text }),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            warn!("submission failed: {}", err);
            return Err(err);
        }

        let body: ReplyBody = response.json().await?;
        Ok(reply_from_body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_paths() {
        assert_eq!(AskDialect::Question.path(), "/ask/");
        assert_eq!(AskDialect::Message.path(), "/chat/");
    }

    #[test]
    fn test_request_body_shapes() {
        let question = serde_json::to_value(QuestionBody { question: "hi" }).unwrap();
        assert_eq!(question, serde_json::json!({ "question": "hi" }));

        let message = serde_json::to_value(MessageBody { message: "hi" }).unwrap();
        assert_eq!(message, serde_json::json!({ "message": "hi" }));
    }

    #[test]
    fn test_reply_prefers_answer_over_response() {
        let body: ReplyBody = serde_json::from_value(serde_json::json!({
            "answer": "from ask",
            "response": "from chat",
        }))
        .unwrap();
        assert_eq!(reply_from_body(body), "from ask");

        let body: ReplyBody =
            serde_json::from_value(serde_json::json!({ "response": "from chat" })).unwrap();
        assert_eq!(reply_from_body(body), "from chat");
    }

    #[test]
    fn test_reply_falls_back_when_missing() {
        let body: ReplyBody = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(reply_from_body(body), NO_REPLY_FALLBACK);
    }

    #[test]
    fn test_config_validation() {
        assert!(TransportConfig::default().validate().is_ok());
        assert!(TransportConfig::new("not a url").validate().is_err());
        assert!(TransportConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_url_building_strips_trailing_slash() {
        let transport =
            HttpTransport::new(TransportConfig::new("http://localhost:8000/")).unwrap();
        assert_eq!(transport.url_for("/ask/"), "http://localhost:8000/ask/");
    }
}
