//! Conversation log data model.
//!
//! The log is the single source of truth rendered by the host: an ordered,
//! append-only sequence of turns. The one in-place mutation is
//! tool-invocation correlation via [`ConversationLog::attach_invocation`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user input.
    User,
    /// Assistant output.
    Assistant,
    /// Locally synthesized error/status turns.
    System,
}

/// Lifecycle status of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// Announced but not yet started. Absent on the wire means pending.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

/// A tool/function call surfaced inside an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Unique within the owning turn.
    pub id: String,
    /// Tool identifier.
    pub name: String,
    /// Structured input payload; opaque to the channel, passed through for
    /// display.
    #[serde(default)]
    pub arguments: serde_json::Value,
    /// Invocation status.
    #[serde(default)]
    pub status: ToolStatus,
    /// Present only when `status` is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Present only when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Opaque unique id: uuid v4 for client-generated turns,
    /// server-assigned otherwise.
    pub id: String,
    /// Author role.
    pub role: Role,
    /// Plain text body; may be empty while streaming is pending.
    pub content: String,
    /// Creation time (client clock for optimistic turns, server-reported
    /// otherwise).
    pub timestamp: DateTime<Utc>,
    /// Tool invocations attached to this turn, in arrival order.
    #[serde(default)]
    pub tool_invocations: Vec<ToolInvocation>,
}

impl Turn {
    /// Create a turn with a fresh client-generated id.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_invocations: Vec::new(),
        }
    }

    /// Optimistic user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Locally synthesized status/error turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Assistant turn from a transport reply; generates an id when the
    /// server did not assign one.
    pub fn assistant(
        id: Option<String>,
        content: impl Into<String>,
        tool_invocations: Vec<ToolInvocation>,
    ) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            tool_invocations,
        }
    }
}

/// Ordered, append-only sequence of turns.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Replace the log with an empty sequence.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Attach a tool invocation to the turn with the given id.
    ///
    /// Returns `false` when no turn matches; orphaned invocations are
    /// dropped by the caller, never buffered.
    pub fn attach_invocation(&mut self, message_id: &str, invocation: ToolInvocation) -> bool {
        match self.turns.iter_mut().find(|turn| turn.id == message_id) {
            Some(turn) => {
                turn.tool_invocations.push(invocation);
                true
            }
            None => false,
        }
    }

    /// All turns in append order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recently appended turn.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}
