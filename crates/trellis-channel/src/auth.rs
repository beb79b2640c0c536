//! Credential acquisition for the assistant channel.
//!
//! The channel never derives credentials itself; it asks a
//! [`CredentialSource`] for the current session on every send. Absence is a
//! valid unauthenticated outcome, not an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bearer session issued by the platform's auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token presented on both transports.
    pub access_token: String,
    /// When the session expires (None = does not expire).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Session from a bare token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self { access_token: token.into(), expires_at: None }
    }

    /// Check if the session is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() > expires_at)
    }
}

/// Source of the current session.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// The current session, or `None` when unauthenticated.
    async fn session(&self) -> Option<Session>;
}

/// Fixed credentials supplied by the host application.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    session: Option<Session>,
}

impl StaticCredentials {
    /// Authenticated with the given bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self { session: Some(Session::bearer(token)) }
    }

    /// Authenticated with a full session record.
    pub fn with_session(session: Session) -> Self {
        Self { session: Some(session) }
    }

    /// Unauthenticated source.
    pub fn anonymous() -> Self {
        Self { session: None }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn session(&self) -> Option<Session> {
        // An expired session is the same as no session.
        self.session.clone().filter(|session| !session.is_expired())
    }
}
