//! The command surface tying storage and engines together.
//!
//! Each operation reads current record state, validates, and writes back;
//! there is no long-lived in-process state beyond what is persisted. Every
//! mutation returns the events it produced so a notification collaborator can
//! consume them fire-and-forget.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::{
    self, ActivityBucket, CategoryRollup, UserActivityStats,
};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::goal::{self, DeltaMode, Goal, GoalDraft, GoalStatus};
use crate::session::{CompletionPayload, Session, SessionAction, SessionKind};
use crate::storage::{Config, Database};
use crate::streak::{self, StreakSummary};

/// Optional payload carried by a `transition` command.
pub type SessionPayload = CompletionPayload;

/// Outcome of one sweep run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub marked_overdue: u32,
    pub regenerated: u32,
    /// Records that failed individually and were skipped.
    pub skipped: u32,
    pub events: Vec<Event>,
}

pub struct StudyService {
    db: Database,
    config: Config,
}

impl StudyService {
    pub fn new(db: Database, config: Config) -> Self {
        Self { db, config }
    }

    /// Open against the default data directory.
    pub fn open() -> Result<Self> {
        Ok(Self::new(Database::open()?, Config::load()?))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // === Sessions ===

    /// Create a session in the `Planned` state.
    ///
    /// Fails with [`CoreError::ConflictingActiveSession`] when the owner
    /// already has an open session; the unique index makes the check and the
    /// write one atomic step.
    pub fn create_session(
        &self,
        owner_id: &str,
        topic_id: &str,
        kind: SessionKind,
        planned_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        let planned = planned_minutes.unwrap_or(self.config.general.default_planned_minutes);
        let session = Session::new(owner_id, topic_id, kind, planned, now);
        self.db.insert_session(&session)?;
        Ok(session)
    }

    /// Apply a state-machine action to a session.
    pub fn transition(
        &self,
        owner_id: &str,
        session_id: Uuid,
        action: SessionAction,
        payload: SessionPayload,
        now: DateTime<Utc>,
    ) -> Result<(Session, Event)> {
        let mut session = self.db.get_session(owner_id, session_id)?;
        let event = session.apply(action, now, payload)?;
        self.db.update_session(&session)?;
        Ok((session, event))
    }

    /// Delete a non-terminal session. Terminal history is append-only.
    pub fn delete_session(&self, owner_id: &str, session_id: Uuid) -> Result<()> {
        let session = self.db.get_session(owner_id, session_id)?;
        if session.is_terminal() {
            return Err(CoreError::InvariantViolation(format!(
                "session {} is {} and cannot be deleted",
                session.id, session.status
            )));
        }
        self.db.delete_session(owner_id, session_id)
    }

    pub fn get_session(&self, owner_id: &str, session_id: Uuid) -> Result<Session> {
        self.db.get_session(owner_id, session_id)
    }

    pub fn find_open_session(&self, owner_id: &str) -> Result<Option<Session>> {
        self.db.find_open_session(owner_id)
    }

    pub fn list_sessions(&self, owner_id: &str) -> Result<Vec<Session>> {
        self.db.list_sessions(owner_id)
    }

    // === Goals ===

    pub fn create_goal(&self, draft: GoalDraft, now: DateTime<Utc>) -> Result<(Goal, Event)> {
        let goal = draft.build(now);
        self.db.insert_goal(&goal)?;
        let event = Event::GoalCreated {
            goal_id: goal.id,
            owner_id: goal.owner_id.clone(),
            at: now,
        };
        Ok((goal, event))
    }

    /// Apply a progress delta atomically against the latest stored value.
    pub fn apply_goal_progress(
        &self,
        owner_id: &str,
        goal_id: Uuid,
        amount: f64,
        mode: DeltaMode,
        now: DateTime<Utc>,
    ) -> Result<(Goal, Vec<Event>)> {
        self.db
            .with_goal(owner_id, goal_id, |goal| goal.apply_delta(amount, mode, now))
    }

    pub fn get_goal(&self, owner_id: &str, goal_id: Uuid) -> Result<Goal> {
        self.db.get_goal(owner_id, goal_id)
    }

    pub fn list_goals(&self, owner_id: &str) -> Result<Vec<Goal>> {
        self.db.list_goals(owner_id)
    }

    // === Sweep ===

    /// Run one bounded sweep pass: mark expired goals overdue, then
    /// regenerate completed recurring goals.
    ///
    /// Restartable and idempotent: `now` is explicit, the batch is bounded,
    /// and the successor uniqueness index means re-running after a crash
    /// cannot double-create. Individual failing records are logged and
    /// skipped so one corrupt goal never blocks the rest of the batch.
    pub fn sweep(&self, now: DateTime<Utc>, limit: Option<u32>) -> Result<SweepReport> {
        let limit = limit.unwrap_or(self.config.sweep.batch_limit);
        let mut report = SweepReport::default();

        for candidate in self.db.overdue_candidates(now, limit)? {
            let owner = candidate.owner_id.clone();
            let outcome = self.db.with_goal(&owner, candidate.id, |goal| {
                // Recheck inside the transaction; a concurrent completion or
                // progress update may have raced the candidate query.
                if goal.status != GoalStatus::Active || goal.end_date >= now {
                    return Ok(Vec::new());
                }
                goal.status = GoalStatus::Overdue;
                Ok(vec![Event::GoalOverdue {
                    goal_id: goal.id,
                    at: now,
                }])
            });
            match outcome {
                Ok((_, events)) if events.is_empty() => {}
                Ok((_, events)) => {
                    report.marked_overdue += 1;
                    report.events.extend(events);
                }
                Err(err) => {
                    tracing::warn!(goal_id = %candidate.id, %err, "overdue sweep skipped goal");
                    report.skipped += 1;
                }
            }
        }

        for source in self.db.regeneration_candidates(limit)? {
            match self.regenerate_one(&source, now) {
                Ok(Some(event)) => {
                    report.regenerated += 1;
                    report.events.push(event);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(goal_id = %source.id, %err, "regeneration sweep skipped goal");
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    fn regenerate_one(&self, source: &Goal, now: DateTime<Utc>) -> Result<Option<Event>> {
        let Some(successor) = goal::regenerate(source, now)? else {
            // Exhausted pattern. Retire the flag so the goal leaves the
            // candidate set instead of occupying batch slots on every run.
            self.db.retire_recurrence(source.id)?;
            return Ok(None);
        };
        match self.db.insert_goal(&successor) {
            Ok(()) => Ok(Some(Event::GoalRegenerated {
                source_goal_id: source.id,
                successor_goal_id: successor.id,
                window_start: successor.start_date,
                window_end: successor.end_date,
                at: now,
            })),
            // A concurrent sweep already produced the successor; the unique
            // index on parent_goal_id turned the race into a no-op.
            Err(CoreError::Database(crate::error::DatabaseError::Constraint(_))) => Ok(None),
            Err(err) => Err(err),
        }
    }

    // === Reporting ===

    /// Current and longest consecutive-day streaks for an owner.
    pub fn streaks(&self, owner_id: &str, now: DateTime<Utc>) -> Result<StreakSummary> {
        let sessions = self.db.completed_sessions(owner_id)?;
        let offset = self.config.offset();
        let dates = analytics::activity_dates(&sessions, offset);
        let today = analytics::local_date(now, offset);
        Ok(streak::compute_streaks(&dates, today))
    }

    pub fn daily_series(
        &self,
        owner_id: &str,
        from: NaiveDate,
        days: u32,
    ) -> Result<Vec<ActivityBucket>> {
        let sessions = self.db.completed_sessions(owner_id)?;
        Ok(analytics::daily_series(
            &sessions,
            from,
            days,
            self.config.offset(),
        ))
    }

    pub fn weekly_series(
        &self,
        owner_id: &str,
        from: NaiveDate,
        weeks: u32,
    ) -> Result<Vec<ActivityBucket>> {
        let sessions = self.db.completed_sessions(owner_id)?;
        Ok(analytics::weekly_series(
            &sessions,
            from,
            weeks,
            self.config.offset(),
        ))
    }

    pub fn category_rollup(&self, owner_id: &str) -> Result<Vec<CategoryRollup>> {
        let goals = self.db.list_goals(owner_id)?;
        Ok(analytics::category_rollup(&goals))
    }

    /// Recompute the derived per-user stats from full history.
    pub fn activity_stats(&self, owner_id: &str, now: DateTime<Utc>) -> Result<UserActivityStats> {
        let sessions = self.db.list_sessions(owner_id)?;
        let goals = self.db.list_goals(owner_id)?;
        let streak = self.streaks(owner_id, now)?;
        Ok(analytics::user_activity_stats(&sessions, &goals, streak))
    }
}
