//! Conversation messages and the per-branch activity log
//!
//! A branch owns an append-only, ordered message log. Forking a branch
//! snapshots the log; the fork and its source diverge afterwards.
//!
//! The activity log records one structured entry per completed model call
//! and is drained to `tracing` exactly once per call by the operation layer.

use crate::types::{BranchId, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Conversation-level framing and constraints
    System,
    /// Caller-issued instruction
    User,
    /// Model response
    Assistant,
}

impl MessageRole {
    /// Wire representation
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier
    pub id: MessageId,
    /// Role in the conversation
    pub role: MessageRole,
    /// Originator
    pub sender: String,
    /// Addressee
    pub recipient: String,
    /// Payload; plain text is a JSON string, structured content an object
    pub content: Value,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: MessageRole, sender: &str, recipient: &str, content: Value) -> Self {
        Self {
            id: MessageId::new(),
            role,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            content,
            created_at: Utc::now(),
        }
    }

    /// Create a system message, optionally embedding the current datetime
    #[must_use]
    pub fn system(text: impl Into<String>, with_datetime: bool) -> Self {
        let text = text.into();
        let content = if with_datetime {
            format!("System datetime: {}\n\n{text}", Utc::now().to_rfc3339())
        } else {
            text
        };
        Self::new(MessageRole::System, "system", "N/A", Value::String(content))
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: Value) -> Self {
        Self::new(MessageRole::User, "user", "assistant", content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: Value) -> Self {
        Self::new(MessageRole::Assistant, "assistant", "user", content)
    }

    /// Render content as plain text where possible
    #[must_use]
    pub fn text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Outcome of a recorded model call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    /// Call returned a response
    Completed,
    /// Call surfaced an error
    Failed,
}

/// One structured activity entry per model call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Branch the call ran on
    pub branch: BranchId,
    /// What was invoked ("operate" or "communicate")
    pub action: String,
    /// Call outcome
    pub status: ActivityStatus,
    /// When the entry was recorded
    pub at: DateTime<Utc>,
}

/// Pending activity entries for a branch
///
/// Entries accumulate until [`ActivityLog::drain`] hands them off, emitting
/// each through `tracing` on the way out.
#[derive(Debug, Default)]
pub struct ActivityLog {
    pending: Vec<ActivityEntry>,
    drains: usize,
}

impl ActivityLog {
    /// Record a call outcome
    pub fn record(&mut self, branch: BranchId, action: &str, status: ActivityStatus) {
        self.pending.push(ActivityEntry {
            branch,
            action: action.to_string(),
            status,
            at: Utc::now(),
        });
    }

    /// Drain pending entries to the tracing sink
    pub fn drain(&mut self) -> Vec<ActivityEntry> {
        self.drains += 1;
        let entries: Vec<ActivityEntry> = self.pending.drain(..).collect();
        for entry in &entries {
            tracing::debug!(
                branch = %entry.branch,
                action = %entry.action,
                status = ?entry.status,
                "branch activity",
            );
        }
        entries
    }

    /// Number of drain calls so far
    #[inline]
    #[must_use]
    pub fn drain_count(&self) -> usize {
        self.drains
    }

    /// Number of entries not yet drained
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Ordered message log plus activity log for one branch
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    activity: ActivityLog,
}

impl MessageStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a history snapshot (fork semantics:
    /// messages are copied, the activity log starts fresh)
    #[must_use]
    pub fn from_history(messages: Vec<Message>) -> Self {
        Self {
            messages,
            activity: ActivityLog::default(),
        }
    }

    /// Append a message
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Ordered message history
    #[inline]
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Mutable access to the activity log
    #[inline]
    pub fn activity_mut(&mut self) -> &mut ActivityLog {
        &mut self.activity
    }

    /// Activity log
    #[inline]
    #[must_use]
    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }
}
