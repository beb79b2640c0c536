//! Wire frames for the persistent channel.
//!
//! Inbound frames are discriminated by a `type` tag. Unknown tags map to
//! [`InboundFrame::Unknown`], which is deliberately a no-op so new
//! server-emitted frame types never break older clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ChannelMode;
use crate::log::{Role, ToolInvocation};

/// Client → server frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// A user turn to run through the assistant.
    Message {
        /// Turn content.
        content: String,
        /// Operating mode for this send.
        mode: ChannelMode,
    },
}

/// Server → client frames, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// A complete turn to append to the log.
    Message {
        /// Server-assigned turn id; a fresh id is generated when absent.
        #[serde(default)]
        id: Option<String>,
        /// Author role, assistant when absent.
        #[serde(default)]
        role: Option<Role>,
        /// Turn content, empty when absent.
        #[serde(default)]
        content: Option<String>,
        /// Server-reported creation time, now when absent.
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
        /// Tool invocations already attached to the turn.
        #[serde(default)]
        tool_calls: Vec<ToolInvocation>,
    },
    /// A tool invocation to correlate onto an earlier turn.
    ToolCall {
        /// Id of the turn this invocation belongs to.
        message_id: String,
        /// The invocation payload.
        tool_call: ToolInvocation,
    },
    /// Server-side failure for the current turn.
    Error {
        /// Failure description, used for diagnostics only.
        error: String,
    },
    /// End of the current turn's stream.
    Done,
    /// Forward-compatibility catch-all for unrecognized tags.
    #[serde(other)]
    Unknown,
}

impl InboundFrame {
    /// Decode a raw text frame.
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::ToolStatus;

    #[test]
    fn test_outbound_message_serialization() {
        let frame = OutboundFrame::Message {
            content: "Hello".to_string(),
            mode: ChannelMode::Automation,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["content"], "Hello");
        assert_eq!(json["mode"], "automation");
    }

    #[test]
    fn test_outbound_mode_uses_wire_names() {
        let frame = OutboundFrame::Message {
            content: "x".to_string(),
            mode: ChannelMode::AgentFlow,
        };
        assert!(serde_json::to_string(&frame).unwrap().contains("\"agent_flow\""));
    }

    #[test]
    fn test_decode_minimal_message() {
        let frame = InboundFrame::decode(r#"{"type":"message"}"#).unwrap();
        match frame {
            InboundFrame::Message { id, role, content, timestamp, tool_calls } => {
                assert!(id.is_none());
                assert!(role.is_none());
                assert!(content.is_none());
                assert!(timestamp.is_none());
                assert!(tool_calls.is_empty());
            }
            other => panic!("expected message frame, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_full_message() {
        let raw = r#"{
            "type": "message",
            "id": "a1",
            "role": "assistant",
            "content": "Hi there",
            "timestamp": "2026-03-01T12:00:00Z",
            "tool_calls": [{"id": "t1", "name": "search", "status": "running"}]
        }"#;
        let frame = InboundFrame::decode(raw).unwrap();
        match frame {
            InboundFrame::Message { id, role, content, tool_calls, .. } => {
                assert_eq!(id.as_deref(), Some("a1"));
                assert_eq!(role, Some(Role::Assistant));
                assert_eq!(content.as_deref(), Some("Hi there"));
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].status, ToolStatus::Running);
            }
            other => panic!("expected message frame, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_tool_call() {
        let raw = r#"{"type":"tool_call","message_id":"a1","tool_call":{"id":"t1","name":"search"}}"#;
        let frame = InboundFrame::decode(raw).unwrap();
        match frame {
            InboundFrame::ToolCall { message_id, tool_call } => {
                assert_eq!(message_id, "a1");
                assert_eq!(tool_call.name, "search");
            }
            other => panic!("expected tool_call frame, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_error_and_done() {
        assert!(matches!(
            InboundFrame::decode(r#"{"type":"error","error":"boom"}"#).unwrap(),
            InboundFrame::Error { .. }
        ));
        assert!(matches!(InboundFrame::decode(r#"{"type":"done"}"#).unwrap(), InboundFrame::Done));
    }

    #[test]
    fn test_decode_unknown_tag_maps_to_unknown() {
        let frame = InboundFrame::decode(r#"{"type":"telemetry","payload":{}}"#).unwrap();
        assert_eq!(frame, InboundFrame::Unknown);
    }

    #[test]
    fn test_decode_malformed_frame_is_an_error() {
        assert!(InboundFrame::decode("not json").is_err());
        assert!(InboundFrame::decode(r#"{"content":"no tag"}"#).is_err());
    }
}
