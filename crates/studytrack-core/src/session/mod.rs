//! Timed study sessions and their lifecycle state machine.

mod machine;

pub use machine::CompletionPayload;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duration::Interruption;

/// Lifecycle status of a session.
///
/// `Completed` and `Cancelled` are terminal; a terminal session is never
/// mutated or deleted (history is append-only for analytics correctness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Planned,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Planned => "planned",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested state-machine move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
    Complete,
    Cancel,
}

impl SessionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionAction::Start => "start",
            SessionAction::Pause => "pause",
            SessionAction::Resume => "resume",
            SessionAction::Complete => "complete",
            SessionAction::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for SessionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of study work a session represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Study,
    Review,
    Practice,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Study => "study",
            SessionKind::Review => "review",
            SessionKind::Practice => "practice",
        }
    }
}

/// One timed, pausable unit of study work tied to a topic.
///
/// Mutated only through the transition methods in [`machine`]; the storage
/// layer persists whatever state those methods produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub owner_id: String,
    /// Opaque reference resolved by the content-catalog collaborator.
    pub topic_id: String,
    pub kind: SessionKind,
    /// Set at creation, immutable.
    pub planned_minutes: u32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Ordered, non-overlapping pause intervals. At most one is open, and
    /// only while the session is paused.
    pub interruptions: Vec<Interruption>,
    /// Computed once at completion, never mutated afterward.
    pub actual_minutes: Option<u32>,
    /// Opaque payload, not subject to invariants.
    pub productivity: Option<u8>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

impl Session {
    /// Create a new session in the `Planned` state.
    pub fn new(
        owner_id: impl Into<String>,
        topic_id: impl Into<String>,
        kind: SessionKind,
        planned_minutes: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            topic_id: topic_id.into(),
            kind,
            planned_minutes,
            status: SessionStatus::Planned,
            created_at: now,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            interruptions: Vec::new(),
            actual_minutes: None,
            productivity: None,
            notes: None,
            tags: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The open interruption, if the session is currently paused.
    pub fn open_interruption(&self) -> Option<&Interruption> {
        self.interruptions.iter().find(|i| i.is_open())
    }
}
