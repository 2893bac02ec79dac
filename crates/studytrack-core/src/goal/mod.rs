//! Goals: numeric targets with milestones, rewards, and optional recurrence.

mod progress;
mod recurrence;

pub use progress::DeltaMode;
pub use recurrence::{next_window, pattern_exhausted, regenerate, GoalTemplate};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a goal.
///
/// `Overdue` is terminal-like: the sweep parks expired goals there so they
/// stay distinguishable from `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
    Cancelled,
    Overdue,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Paused => "paused",
            GoalStatus::Cancelled => "cancelled",
            GoalStatus::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What earns a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardCondition {
    Completion,
    Milestone,
    Streak,
}

/// An intermediate threshold within a goal's target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    /// Position in the goal's milestone list; thresholds complete in
    /// ascending order.
    pub order: usize,
    pub title: String,
    pub target_value: f64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Milestone {
    pub fn new(order: usize, title: impl Into<String>, target_value: f64) -> Self {
        Self {
            order,
            title: title.into(),
            target_value,
            completed: false,
            completed_at: None,
        }
    }

    /// Read-through progress: the goal's value capped at this milestone's
    /// own target.
    pub fn current_value(&self, goal_value: f64) -> f64 {
        goal_value.min(self.target_value)
    }
}

/// A reward attached to a goal. Monotonic: once earned, never un-earned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub condition: RewardCondition,
    pub description: String,
    pub earned: bool,
    pub earned_at: Option<DateTime<Utc>>,
}

impl Reward {
    pub fn new(condition: RewardCondition, description: impl Into<String>) -> Self {
        Self {
            condition,
            description: description.into(),
            earned: false,
            earned_at: None,
        }
    }
}

/// How often a recurring goal regenerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

/// Recurrence bounds for a recurring goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    /// Multiplier on the frequency (every N days/weeks/months).
    pub interval: u32,
    /// No successor window may extend past this date.
    pub end_date: Option<DateTime<Utc>>,
    /// Total number of instances, the original included.
    pub end_after_occurrences: Option<u32>,
}

/// A target quantity to reach within a time window.
///
/// `current_value` is mutated only through [`Goal::apply_delta`]; direct
/// field writes bypass the milestone/reward invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub category: String,
    /// Opaque references resolved by the content-catalog collaborator.
    pub topic_ids: Vec<String>,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: GoalStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub milestones: Vec<Milestone>,
    pub rewards: Vec<Reward>,
    pub is_recurring: bool,
    pub recurrence: Option<RecurrencePattern>,
    /// Which instance this is in a recurrence chain (1-based).
    pub recurrence_count: u32,
    /// Set on regenerated instances; points at the completed predecessor.
    pub parent_goal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Milestones in threshold-completion order.
    pub fn milestones_ascending(&self) -> Vec<&Milestone> {
        let mut ms: Vec<&Milestone> = self.milestones.iter().collect();
        ms.sort_by_key(|m| m.order);
        ms
    }

    /// Fraction of the target reached, 0.0 .. 1.0.
    pub fn progress_fraction(&self) -> f64 {
        if self.target_value <= 0.0 {
            return 0.0;
        }
        (self.current_value / self.target_value).clamp(0.0, 1.0)
    }
}

/// Builder for new goals. Regeneration reuses the same entry point through
/// [`GoalTemplate`], so history fields can never leak into a fresh record.
#[derive(Debug, Clone)]
pub struct GoalDraft {
    pub owner_id: String,
    pub title: String,
    pub category: String,
    pub topic_ids: Vec<String>,
    pub target_value: f64,
    pub unit: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub milestones: Vec<Milestone>,
    pub rewards: Vec<Reward>,
    pub recurrence: Option<RecurrencePattern>,
}

impl GoalDraft {
    pub fn build(self, now: DateTime<Utc>) -> Goal {
        let is_recurring = self.recurrence.is_some();
        Goal {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            title: self.title,
            category: self.category,
            topic_ids: self.topic_ids,
            target_value: self.target_value,
            current_value: 0.0,
            unit: self.unit,
            start_date: self.start_date,
            end_date: self.end_date,
            status: GoalStatus::Active,
            completed_at: None,
            milestones: self.milestones,
            rewards: self.rewards,
            is_recurring,
            recurrence: self.recurrence,
            recurrence_count: 1,
            parent_goal_id: None,
            created_at: now,
        }
    }
}
