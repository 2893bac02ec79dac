//! Goal progress engine.
//!
//! [`Goal::apply_delta`] is the only sanctioned path for mutating a goal's
//! `current_value`. It clamps the new value, cascades milestone completion in
//! ascending order, earns rewards, and flips the goal status -- all in a
//! single pass per call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Goal, GoalStatus, RewardCondition};
use crate::error::{CoreError, Result};
use crate::events::Event;

/// How a progress amount is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaMode {
    /// `current + amount`
    Add,
    /// `amount` replaces the current value
    Set,
}

impl Goal {
    /// Apply a numeric progress delta.
    ///
    /// The new value is clamped to `[0, target_value]`. Milestones whose
    /// thresholds are crossed complete in ascending `order` -- a single call
    /// crossing two thresholds completes both. Milestones and rewards are
    /// monotonic: a value later dropping below a completed threshold (only
    /// possible under `Set`) un-completes nothing.
    ///
    /// Returns the events the mutation produced, in occurrence order.
    pub fn apply_delta(
        &mut self,
        amount: f64,
        mode: DeltaMode,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        if !amount.is_finite() {
            return Err(CoreError::InvariantViolation(format!(
                "non-finite progress amount for goal {}",
                self.id
            )));
        }
        if !self.target_value.is_finite() || self.target_value <= 0.0 {
            return Err(CoreError::InvariantViolation(format!(
                "goal {} has a non-positive target value",
                self.id
            )));
        }

        let previous = self.current_value;
        let raw = match mode {
            DeltaMode::Add => previous + amount,
            DeltaMode::Set => amount,
        };
        let next = raw.clamp(0.0, self.target_value);

        let mut events = Vec::new();
        self.current_value = next;

        if next != previous {
            events.push(Event::GoalProgressed {
                goal_id: self.id,
                previous_value: previous,
                current_value: next,
                at: now,
            });
        }

        // Milestones, ascending threshold order. Single pass; already
        // completed ones are skipped so a no-op delta re-triggers nothing.
        let mut order: Vec<usize> = (0..self.milestones.len()).collect();
        order.sort_by_key(|&i| self.milestones[i].order);
        let mut any_milestone = false;
        for i in order {
            let m = &mut self.milestones[i];
            if !m.completed && next >= m.target_value {
                m.completed = true;
                m.completed_at = Some(now);
                any_milestone = true;
                events.push(Event::MilestoneCompleted {
                    goal_id: self.id,
                    milestone_order: m.order,
                    target_value: m.target_value,
                    at: now,
                });
            }
        }
        if any_milestone {
            events.extend(self.earn_rewards(RewardCondition::Milestone, now));
        }

        if next >= self.target_value && self.status == GoalStatus::Active {
            self.status = GoalStatus::Completed;
            self.completed_at = Some(now);
            events.push(Event::GoalCompleted {
                goal_id: self.id,
                at: now,
            });
            events.extend(self.earn_rewards(RewardCondition::Completion, now));
        }

        debug_assert!(self.current_value >= 0.0 && self.current_value <= self.target_value);
        Ok(events)
    }

    /// Earn every un-earned reward with the given condition. Earned rewards
    /// are never revisited.
    pub fn earn_rewards(&mut self, condition: RewardCondition, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        for reward in &mut self.rewards {
            if reward.condition == condition && !reward.earned {
                reward.earned = true;
                reward.earned_at = Some(now);
                events.push(Event::RewardEarned {
                    goal_id: self.id,
                    condition,
                    at: now,
                });
            }
        }
        events
    }
}
