use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::goal::RewardCondition;

/// Every state change in the core produces an Event.
/// Notification collaborators consume these fire-and-forget; the core never
/// depends on delivery success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        owner_id: String,
        topic_id: String,
        at: DateTime<Utc>,
    },
    SessionPaused {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    SessionResumed {
        session_id: Uuid,
        paused_secs: i64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: Uuid,
        owner_id: String,
        actual_minutes: u32,
        at: DateTime<Utc>,
    },
    SessionCancelled {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    GoalCreated {
        goal_id: Uuid,
        owner_id: String,
        at: DateTime<Utc>,
    },
    GoalProgressed {
        goal_id: Uuid,
        previous_value: f64,
        current_value: f64,
        at: DateTime<Utc>,
    },
    MilestoneCompleted {
        goal_id: Uuid,
        milestone_order: usize,
        target_value: f64,
        at: DateTime<Utc>,
    },
    GoalCompleted {
        goal_id: Uuid,
        at: DateTime<Utc>,
    },
    RewardEarned {
        goal_id: Uuid,
        condition: RewardCondition,
        at: DateTime<Utc>,
    },
    GoalOverdue {
        goal_id: Uuid,
        at: DateTime<Utc>,
    },
    /// A completed recurring goal spawned a fresh successor instance.
    GoalRegenerated {
        source_goal_id: Uuid,
        successor_goal_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        at: DateTime<Utc>,
    },
}
