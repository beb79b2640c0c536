//! One-shot HTTP fallback transport.
//!
//! Used when the persistent connection is unavailable: a single request
//! carrying the turn content and mode, answered by at most one assistant
//! turn. This transport never sees intermediate `tool_call` frames.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::FallbackTransport;
use crate::ChannelMode;
use crate::error::FallbackError;
use crate::log::ToolInvocation;

/// Request body for the one-shot assistant call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackRequest {
    /// User turn content.
    pub message: String,
    /// Operating mode for this send.
    pub mode: ChannelMode,
}

/// Success response from the one-shot assistant call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FallbackReply {
    /// Server-assigned turn id, if any.
    #[serde(default)]
    pub id: Option<String>,
    /// Assistant turn content.
    pub message: String,
    /// Tool invocations already attached to the turn.
    #[serde(default)]
    pub tool_calls: Vec<ToolInvocation>,
}

/// Production fallback over HTTP.
pub struct HttpFallback {
    /// Endpoint URL.
    url: String,
    /// HTTP client.
    client: reqwest::Client,
}

impl HttpFallback {
    /// Create a new fallback transport.
    pub fn new(url: String) -> Self {
        Self { url, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl FallbackTransport for HttpFallback {
    async fn exchange(
        &self,
        bearer: &str,
        request: &FallbackRequest,
    ) -> Result<FallbackReply, FallbackError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(bearer)
            .json(request)
            .send()
            .await
            .map_err(|e| FallbackError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FallbackError::Status(status.as_u16()));
        }

        response.json::<FallbackReply>().await.map_err(|e| FallbackError::Decode(e.to_string()))
    }
}
