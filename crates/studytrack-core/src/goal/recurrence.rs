//! Recurring goal regeneration.
//!
//! A completed recurring goal spawns a fresh successor instance for the next
//! window. The successor is built from an explicit template so mutable history
//! fields (`completed_at`, earned flags, progress) can never be carried over.

use chrono::{DateTime, Duration, Months, Utc};

use super::{Frequency, Goal, GoalStatus, Milestone, RecurrencePattern, Reward};
use crate::error::{CoreError, Result};

/// Compute the successor window by advancing the source's `end_date` by the
/// pattern. The new window starts where the old one ended.
pub fn next_window(
    pattern: &RecurrencePattern,
    end_date: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let interval = pattern.interval.max(1);
    let next_end = match pattern.frequency {
        Frequency::Daily => end_date + Duration::days(i64::from(interval)),
        Frequency::Weekly => end_date + Duration::weeks(i64::from(interval)),
        Frequency::Monthly => end_date
            .checked_add_months(Months::new(interval))
            .unwrap_or_else(|| end_date + Duration::days(i64::from(interval) * 30)),
    };
    (end_date, next_end)
}

/// Whether the pattern's own bounds forbid another instance.
///
/// `occurrences` counts existing instances, the original included.
pub fn pattern_exhausted(
    pattern: &RecurrencePattern,
    occurrences: u32,
    next_end: DateTime<Utc>,
) -> bool {
    if let Some(max) = pattern.end_after_occurrences {
        if occurrences >= max {
            return true;
        }
    }
    if let Some(end) = pattern.end_date {
        if next_end > end {
            return true;
        }
    }
    false
}

/// The recurring-instance template: everything a successor inherits, and
/// nothing else. Milestone and reward shapes are copied with their progress
/// stripped.
#[derive(Debug, Clone)]
pub struct GoalTemplate {
    pub owner_id: String,
    pub title: String,
    pub category: String,
    pub topic_ids: Vec<String>,
    pub target_value: f64,
    pub unit: String,
    pub milestones: Vec<Milestone>,
    pub rewards: Vec<Reward>,
    pub recurrence: RecurrencePattern,
}

impl GoalTemplate {
    /// Extract the template from a completed recurring goal.
    pub fn from_goal(goal: &Goal) -> Result<Self> {
        let recurrence = goal.recurrence.clone().ok_or_else(|| {
            CoreError::InvariantViolation(format!(
                "goal {} is marked recurring but has no recurrence pattern",
                goal.id
            ))
        })?;
        Ok(Self {
            owner_id: goal.owner_id.clone(),
            title: goal.title.clone(),
            category: goal.category.clone(),
            topic_ids: goal.topic_ids.clone(),
            target_value: goal.target_value,
            unit: goal.unit.clone(),
            milestones: goal
                .milestones
                .iter()
                .map(|m| Milestone::new(m.order, m.title.clone(), m.target_value))
                .collect(),
            rewards: goal
                .rewards
                .iter()
                .map(|r| Reward::new(r.condition, r.description.clone()))
                .collect(),
            recurrence,
        })
    }

    /// Build the successor instance for the given window. Fresh identity,
    /// zero progress, everything un-earned.
    pub fn instantiate(
        self,
        window: (DateTime<Utc>, DateTime<Utc>),
        parent_goal_id: uuid::Uuid,
        recurrence_count: u32,
        now: DateTime<Utc>,
    ) -> Goal {
        let (start_date, end_date) = window;
        Goal {
            id: uuid::Uuid::new_v4(),
            owner_id: self.owner_id,
            title: self.title,
            category: self.category,
            topic_ids: self.topic_ids,
            target_value: self.target_value,
            current_value: 0.0,
            unit: self.unit,
            start_date,
            end_date,
            status: GoalStatus::Active,
            completed_at: None,
            milestones: self.milestones,
            rewards: self.rewards,
            is_recurring: true,
            recurrence: Some(self.recurrence),
            recurrence_count,
            parent_goal_id: Some(parent_goal_id),
            created_at: now,
        }
    }
}

/// Regenerate a completed recurring goal, if its pattern allows another
/// instance. The source is read, never mutated.
///
/// Returns `None` when the pattern is exhausted.
pub fn regenerate(goal: &Goal, now: DateTime<Utc>) -> Result<Option<Goal>> {
    if goal.status != GoalStatus::Completed || !goal.is_recurring {
        return Ok(None);
    }
    let template = GoalTemplate::from_goal(goal)?;
    let window = next_window(&template.recurrence, goal.end_date);
    if pattern_exhausted(&template.recurrence, goal.recurrence_count, window.1) {
        return Ok(None);
    }
    Ok(Some(template.instantiate(
        window,
        goal.id,
        goal.recurrence_count + 1,
        now,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{DeltaMode, GoalDraft, RewardCondition};
    use chrono::TimeZone;

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 0, 0, 0).unwrap()
    }

    fn weekly_pattern() -> RecurrencePattern {
        RecurrencePattern {
            frequency: Frequency::Weekly,
            interval: 1,
            end_date: None,
            end_after_occurrences: None,
        }
    }

    fn recurring_goal() -> Goal {
        let mut g = GoalDraft {
            owner_id: "alice".to_string(),
            title: "Weekly review".to_string(),
            category: "review".to_string(),
            topic_ids: vec![],
            target_value: 50.0,
            unit: "minutes".to_string(),
            start_date: t(1),
            end_date: t(8),
            milestones: vec![Milestone::new(0, "half", 25.0)],
            rewards: vec![Reward::new(RewardCondition::Completion, "badge")],
            recurrence: Some(weekly_pattern()),
        }
        .build(t(1));
        g.apply_delta(50.0, DeltaMode::Add, t(5)).unwrap();
        g
    }

    #[test]
    fn window_advances_by_pattern() {
        let (start, end) = next_window(&weekly_pattern(), t(8));
        assert_eq!(start, t(8));
        assert_eq!(end, t(15));

        let daily = RecurrencePattern {
            frequency: Frequency::Daily,
            interval: 3,
            end_date: None,
            end_after_occurrences: None,
        };
        assert_eq!(next_window(&daily, t(8)).1, t(11));

        let monthly = RecurrencePattern {
            frequency: Frequency::Monthly,
            interval: 1,
            end_date: None,
            end_after_occurrences: None,
        };
        let (_, end) = next_window(&monthly, t(8));
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 4, 8, 0, 0, 0).unwrap());
    }

    #[test]
    fn successor_resets_progress_and_keeps_shape() {
        let source = recurring_goal();
        let successor = regenerate(&source, t(9)).unwrap().unwrap();

        assert_ne!(successor.id, source.id);
        assert_eq!(successor.parent_goal_id, Some(source.id));
        assert_eq!(successor.current_value, 0.0);
        assert_eq!(successor.status, GoalStatus::Active);
        assert_eq!(successor.target_value, source.target_value);
        assert_eq!(successor.recurrence_count, 2);
        assert_eq!(successor.start_date, source.end_date);
        assert!(successor.milestones.iter().all(|m| !m.completed));
        assert!(successor.rewards.iter().all(|r| !r.earned));
        assert!(successor.completed_at.is_none());
    }

    #[test]
    fn source_left_untouched() {
        let source = recurring_goal();
        let before = serde_json::to_value(&source).unwrap();
        let _ = regenerate(&source, t(9)).unwrap();
        assert_eq!(serde_json::to_value(&source).unwrap(), before);
    }

    #[test]
    fn exhausted_by_occurrences() {
        let mut source = recurring_goal();
        source.recurrence.as_mut().unwrap().end_after_occurrences = Some(1);
        assert!(regenerate(&source, t(9)).unwrap().is_none());

        source.recurrence.as_mut().unwrap().end_after_occurrences = Some(2);
        assert!(regenerate(&source, t(9)).unwrap().is_some());
    }

    #[test]
    fn exhausted_by_end_date() {
        let mut source = recurring_goal();
        // Next window would end at day 15; pattern stops at day 10.
        source.recurrence.as_mut().unwrap().end_date = Some(t(10));
        assert!(regenerate(&source, t(9)).unwrap().is_none());
    }

    #[test]
    fn non_completed_or_non_recurring_goals_skip() {
        let mut active = recurring_goal();
        active.status = GoalStatus::Active;
        assert!(regenerate(&active, t(9)).unwrap().is_none());

        let mut plain = recurring_goal();
        plain.is_recurring = false;
        assert!(regenerate(&plain, t(9)).unwrap().is_none());
    }
}
