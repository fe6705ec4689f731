use chrono::{DateTime, Local};
use std::fmt;
use uuid::Uuid;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Ai => "Gemini",
        }
    }

    /// Role name used on the wire
    pub fn api_role(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "model",
        }
    }
}

/// Opaque, time-ordered message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub created_at: DateTime<Local>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text.into(), Sender::User)
    }

    /// Empty AI message filled in while a stream runs
    pub fn ai_placeholder() -> Self {
        Self::new(String::new(), Sender::Ai)
    }

    fn new(text: String, sender: Sender) -> Self {
        Self {
            id: MessageId::new(),
            text,
            sender,
            created_at: Local::now(),
        }
    }
}

/// Progress of one send/stream cycle, tagged with the cycle's stream id
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpdate {
    pub stream_id: u64,
    pub kind: StreamUpdateKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdateKind {
    /// The request was accepted and the chunk stream is open
    Opened,
    /// Full text accumulated so far
    Chunk { text: String },
    /// Submission or iteration failed; terminal
    Failed { reason: String },
    /// Stream exhausted normally; terminal
    Completed,
}

impl StreamUpdateKind {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamUpdateKind::Failed { .. } | StreamUpdateKind::Completed
        )
    }
}
