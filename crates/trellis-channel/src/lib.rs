//! Trellis assistant channel.
//!
//! Client-side realtime channel that backs the Trellis in-app assistant.
//! The channel keeps a persistent WebSocket connection to the assistant
//! service, degrades to a one-shot HTTP call when the socket is
//! unavailable, correlates asynchronously arriving tool invocations onto
//! in-flight turns, and exposes the conversation log plus connection and
//! loading state to the host application.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trellis_channel::{AssistantChannel, ChannelConfig, StaticCredentials};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ChannelConfig::default();
//!     let credentials = Arc::new(StaticCredentials::bearer("token"));
//!     let channel = AssistantChannel::connect_lazy(config, credentials);
//!     channel.send("Summarize my failed workflow runs").await;
//! }
//! ```

pub mod auth;
pub mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod log;
pub mod transport;

use serde::{Deserialize, Serialize};

pub use auth::{CredentialSource, Session, StaticCredentials};
pub use channel::AssistantChannel;
pub use config::ChannelConfig;
pub use error::{ChannelError, Degraded, DialError, FallbackError, Result};
pub use frame::{InboundFrame, OutboundFrame};
pub use log::{ConversationLog, Role, ToolInvocation, ToolStatus, Turn};
pub use transport::{ConnectionState, Connector, Dialer, FallbackTransport};

/// Operating mode forwarded to the assistant service with each send.
///
/// The mode selects server-side behavior only; it has no bearing on how
/// the channel routes a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// General automation assistant.
    #[default]
    Automation,
    /// Single-agent execution.
    Agent,
    /// Agent flow authoring.
    AgentFlow,
    /// Code generation and execution.
    Code,
}

impl ChannelMode {
    /// Wire name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automation => "automation",
            Self::Agent => "agent",
            Self::AgentFlow => "agent_flow",
            Self::Code => "code",
        }
    }
}

impl std::fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelMode {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "automation" => Ok(Self::Automation),
            "agent" => Ok(Self::Agent),
            "agent_flow" | "agent-flow" => Ok(Self::AgentFlow),
            "code" => Ok(Self::Code),
            other => Err(ChannelError::Config(format!("unknown mode '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_mode_serialization() {
        assert_eq!(serde_json::to_string(&ChannelMode::Automation).unwrap(), "\"automation\"");
        assert_eq!(serde_json::to_string(&ChannelMode::AgentFlow).unwrap(), "\"agent_flow\"");
    }

    #[test]
    fn test_channel_mode_deserialization() {
        let mode: ChannelMode = serde_json::from_str("\"code\"").unwrap();
        assert_eq!(mode, ChannelMode::Code);
    }

    #[test]
    fn test_channel_mode_default() {
        assert_eq!(ChannelMode::default(), ChannelMode::Automation);
    }

    #[test]
    fn test_channel_mode_from_str() {
        assert_eq!("agent".parse::<ChannelMode>().unwrap(), ChannelMode::Agent);
        assert_eq!("agent-flow".parse::<ChannelMode>().unwrap(), ChannelMode::AgentFlow);
        assert!("copilot".parse::<ChannelMode>().is_err());
    }

    #[test]
    fn test_channel_mode_display_round_trip() {
        for mode in [
            ChannelMode::Automation,
            ChannelMode::Agent,
            ChannelMode::AgentFlow,
            ChannelMode::Code,
        ] {
            assert_eq!(mode.to_string().parse::<ChannelMode>().unwrap(), mode);
        }
    }
}
