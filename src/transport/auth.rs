//! Logged-in user record and its in-memory session cache

use super::http::HttpTransport;
use crate::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// The user record returned by `POST /login/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// In-memory cache of the logged-in user.
///
/// Lives for the process only; there is no token verification here, the
/// backend owns authentication.
#[derive(Clone)]
pub struct AuthSession {
    user: Arc<RwLock<Option<User>>>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self {
            user: Arc::new(RwLock::new(None)),
        }
    }

    /// Authenticate and cache the returned record.
    pub async fn login(
        &self,
        transport: &HttpTransport,
        email: &str,
        password: &str,
    ) -> Result<User> {
        let user = transport.login(email, password).await?;
        info!("logged in as {}", user.email);
        *self.user.write() = Some(user.clone());
        Ok(user)
    }

    /// Seed the cache with a previously saved record, skipping the login
    /// round-trip.
    pub fn restore(&self, user: User) {
        *self.user.write() = Some(user);
    }

    pub fn logout(&self) {
        *self.user.write() = None;
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.read().is_some()
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}
