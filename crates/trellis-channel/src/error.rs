//! Error types for the assistant channel.
//!
//! The channel deliberately splits failures into two tiers: [`Degraded`]
//! covers the persistent transport being unavailable, which is expected
//! operation and never shown to the user, while [`FallbackError`] covers
//! the one-shot fallback failing, which is surfaced as a system turn.

use thiserror::Error;

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors that can occur inside the channel.
///
/// None of these reach the host application as errors; the facade converts
/// every failure into either a diagnostic log line or a system turn.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Configuration error.
    #[error("channel configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// One-shot fallback failure.
    #[error(transparent)]
    Fallback(#[from] FallbackError),
}

/// Failure to establish the persistent connection. Silent by design.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DialError(pub String);

/// Reasons the persistent transport could not carry a send.
///
/// Degradation is expected operation: the caller falls back to the
/// one-shot transport and the user never sees an error.
#[derive(Debug, Error)]
pub enum Degraded {
    /// No open connection and the handshake did not complete within the
    /// grace period.
    #[error("persistent connection unavailable")]
    NotConnected,

    /// A write on an open connection failed.
    #[error("persistent write failed: {0}")]
    WriteFailed(String),
}

/// Failure of the one-shot fallback call. Surfaced as a system turn.
#[derive(Debug, Error)]
pub enum FallbackError {
    /// The request could not be sent or the response never arrived.
    #[error("assistant request failed: {0}")]
    Request(String),

    /// The assistant service returned a non-success status.
    #[error("assistant service returned status {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("invalid assistant response: {0}")]
    Decode(String),
}
