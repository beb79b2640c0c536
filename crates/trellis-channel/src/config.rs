//! Channel configuration.
//!
//! Endpoint derivation (protocol/host selection) is owned by the
//! surrounding application; the channel receives ready-to-use URLs here.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::ChannelMode;
use crate::error::Result;

/// Configuration for one assistant channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// WebSocket endpoint of the assistant service.
    #[serde(default = "default_channel_url")]
    pub channel_url: String,
    /// HTTP endpoint of the one-shot fallback.
    #[serde(default = "default_assistant_url")]
    pub assistant_url: String,
    /// How long a connection attempt may stay in `connecting`, in
    /// milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Grace period a send waits for an in-flight handshake, in
    /// milliseconds.
    #[serde(default = "default_handshake_grace_ms")]
    pub handshake_grace_ms: u64,
    /// Mode applied to sends until the host switches it.
    #[serde(default)]
    pub default_mode: ChannelMode,
}

fn default_channel_url() -> String {
    "ws://127.0.0.1:8089/ws/assistant".to_string()
}

fn default_assistant_url() -> String {
    "http://127.0.0.1:8089/api/assistant".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_handshake_grace_ms() -> u64 {
    500
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel_url: default_channel_url(),
            assistant_url: default_assistant_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            handshake_grace_ms: default_handshake_grace_ms(),
            default_mode: ChannelMode::default(),
        }
    }
}

impl ChannelConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Handshake grace period as a duration.
    pub fn handshake_grace(&self) -> Duration {
        Duration::from_millis(self.handshake_grace_ms)
    }
}
