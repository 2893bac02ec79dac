//! SQLite-based session and goal storage.
//!
//! Two independent owner-scoped collections (sessions, goals) plus a
//! key-value store for application state. Cross-record invariants live here:
//! the partial unique index on open sessions makes "at most one open session
//! per owner" a write-time guarantee, and goal mutations run read-modify-write
//! inside an IMMEDIATE transaction so concurrent deltas never increment a
//! stale value.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

use super::{data_dir, migrations};
use crate::duration::Interruption;
use crate::error::{CoreError, DatabaseError, Result};
use crate::events::Event;
use crate::goal::{Goal, GoalStatus, Milestone, RecurrencePattern, Reward};
use crate::session::{Session, SessionKind, SessionStatus};

// === Helper Functions ===

/// Parse session status from database string
fn parse_session_status(idx: usize, status_str: &str) -> rusqlite::Result<SessionStatus> {
    match status_str {
        "planned" => Ok(SessionStatus::Planned),
        "active" => Ok(SessionStatus::Active),
        "paused" => Ok(SessionStatus::Paused),
        "completed" => Ok(SessionStatus::Completed),
        "cancelled" => Ok(SessionStatus::Cancelled),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown session status '{other}'").into(),
        )),
    }
}

/// Parse session kind from database string
fn parse_session_kind(idx: usize, kind_str: &str) -> rusqlite::Result<SessionKind> {
    match kind_str {
        "study" => Ok(SessionKind::Study),
        "review" => Ok(SessionKind::Review),
        "practice" => Ok(SessionKind::Practice),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown session kind '{other}'").into(),
        )),
    }
}

/// Parse goal status from database string
fn parse_goal_status(idx: usize, status_str: &str) -> rusqlite::Result<GoalStatus> {
    match status_str {
        "active" => Ok(GoalStatus::Active),
        "completed" => Ok(GoalStatus::Completed),
        "paused" => Ok(GoalStatus::Paused),
        "cancelled" => Ok(GoalStatus::Cancelled),
        "overdue" => Ok(GoalStatus::Overdue),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown goal status '{other}'").into(),
        )),
    }
}

fn parse_datetime(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn parse_datetime_opt(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.as_deref().map(|v| parse_datetime(idx, v)).transpose()
}

fn parse_uuid(idx: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Build a Session from a database row (column order of SESSION_COLUMNS).
fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let id: String = row.get(0)?;
    let status: String = row.get(5)?;
    let kind: String = row.get(3)?;
    let interruptions: String = row.get(10)?;
    let tags: String = row.get(14)?;
    Ok(Session {
        id: parse_uuid(0, &id)?,
        owner_id: row.get(1)?,
        topic_id: row.get(2)?,
        kind: parse_session_kind(3, &kind)?,
        planned_minutes: row.get(4)?,
        status: parse_session_status(5, &status)?,
        created_at: parse_datetime(6, &row.get::<_, String>(6)?)?,
        started_at: parse_datetime_opt(7, row.get(7)?)?,
        completed_at: parse_datetime_opt(8, row.get(8)?)?,
        cancelled_at: parse_datetime_opt(9, row.get(9)?)?,
        interruptions: parse_json::<Vec<Interruption>>(10, &interruptions)?,
        actual_minutes: row.get(11)?,
        productivity: row.get(12)?,
        notes: row.get(13)?,
        tags: parse_json::<Vec<String>>(14, &tags)?,
    })
}

const SESSION_COLUMNS: &str = "id, owner_id, topic_id, kind, planned_minutes, status, created_at, \
     started_at, completed_at, cancelled_at, interruptions, actual_minutes, productivity, notes, tags";

/// Build a Goal from a database row (column order of GOAL_COLUMNS).
fn row_to_goal(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
    let id: String = row.get(0)?;
    let topic_ids: String = row.get(4)?;
    let status: String = row.get(10)?;
    let milestones: String = row.get(12)?;
    let rewards: String = row.get(13)?;
    let recurrence: Option<String> = row.get(15)?;
    let parent: Option<String> = row.get(17)?;
    Ok(Goal {
        id: parse_uuid(0, &id)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        category: row.get(3)?,
        topic_ids: parse_json::<Vec<String>>(4, &topic_ids)?,
        target_value: row.get(5)?,
        current_value: row.get(6)?,
        unit: row.get(7)?,
        start_date: parse_datetime(8, &row.get::<_, String>(8)?)?,
        end_date: parse_datetime(9, &row.get::<_, String>(9)?)?,
        status: parse_goal_status(10, &status)?,
        completed_at: parse_datetime_opt(11, row.get(11)?)?,
        milestones: parse_json::<Vec<Milestone>>(12, &milestones)?,
        rewards: parse_json::<Vec<Reward>>(13, &rewards)?,
        is_recurring: row.get::<_, i64>(14)? != 0,
        recurrence: recurrence
            .as_deref()
            .map(|r| parse_json::<RecurrencePattern>(15, r))
            .transpose()?,
        recurrence_count: row.get(16)?,
        parent_goal_id: parent.as_deref().map(|p| parse_uuid(17, p)).transpose()?,
        created_at: parse_datetime(18, &row.get::<_, String>(18)?)?,
    })
}

const GOAL_COLUMNS: &str = "id, owner_id, title, category, topic_ids, target_value, current_value, \
     unit, start_date, end_date, status, completed_at, milestones, rewards, is_recurring, \
     recurrence, recurrence_count, parent_goal_id, created_at";

/// SQLite database for session and goal storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/studytrack/studytrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("studytrack.db");
        Self::open_at(&path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_conn(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DatabaseError::from(e))?;
        Self::from_conn(conn)
    }

    fn from_conn(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // === Sessions ===

    /// Insert a new session.
    ///
    /// A non-terminal session collides with the partial unique index when the
    /// owner already has one open; that surfaces as
    /// [`CoreError::ConflictingActiveSession`].
    pub fn insert_session(&self, session: &Session) -> Result<()> {
        let result = self.conn.execute(
            &format!("INSERT INTO sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"),
            rusqlite::params_from_iter(session_params(session)?),
        );
        self.map_session_write(session, result)
    }

    /// Write back a mutated session.
    pub fn update_session(&self, session: &Session) -> Result<()> {
        let result = self.conn.execute(
            "UPDATE sessions SET status = ?2, started_at = ?3, completed_at = ?4, \
             cancelled_at = ?5, interruptions = ?6, actual_minutes = ?7, productivity = ?8, \
             notes = ?9, tags = ?10 WHERE id = ?1",
            params![
                session.id.to_string(),
                session.status.as_str(),
                session.started_at.map(|d| d.to_rfc3339()),
                session.completed_at.map(|d| d.to_rfc3339()),
                session.cancelled_at.map(|d| d.to_rfc3339()),
                serde_json::to_string(&session.interruptions)?,
                session.actual_minutes,
                session.productivity,
                session.notes,
                serde_json::to_string(&session.tags)?,
            ],
        );
        self.map_session_write(session, result)
    }

    fn map_session_write(&self, session: &Session, result: rusqlite::Result<usize>) -> Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let db_err = DatabaseError::from(err);
                if matches!(db_err, DatabaseError::Constraint(_)) {
                    if let Some(existing) = self.find_open_session(&session.owner_id)? {
                        if existing.id != session.id {
                            return Err(CoreError::ConflictingActiveSession {
                                owner_id: session.owner_id.clone(),
                                existing_session_id: existing.id,
                            });
                        }
                    }
                }
                Err(db_err.into())
            }
        }
    }

    /// Fetch a session by id within the owner's scope.
    pub fn get_session(&self, owner_id: &str, id: Uuid) -> Result<Session> {
        self.conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1 AND owner_id = ?2"),
                params![id.to_string(), owner_id],
                row_to_session,
            )
            .optional()
            .map_err(DatabaseError::from)?
            .ok_or_else(|| CoreError::session_not_found(id))
    }

    /// The owner's single non-terminal session, if any.
    pub fn find_open_session(&self, owner_id: &str) -> Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions \
                     WHERE owner_id = ?1 AND status IN ('planned', 'active', 'paused')"
                ),
                params![owner_id],
                row_to_session,
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(session)
    }

    /// All of the owner's sessions, newest first.
    pub fn list_sessions(&self, owner_id: &str) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE owner_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![owner_id], row_to_session)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row.map_err(DatabaseError::from)?);
        }
        Ok(sessions)
    }

    /// The owner's completed sessions, oldest first.
    pub fn completed_sessions(&self, owner_id: &str) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE owner_id = ?1 AND status = 'completed' ORDER BY completed_at ASC"
        ))?;
        let rows = stmt.query_map(params![owner_id], row_to_session)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row.map_err(DatabaseError::from)?);
        }
        Ok(sessions)
    }

    /// Delete a session row. Callers gate this to non-terminal sessions;
    /// terminal history is append-only.
    pub fn delete_session(&self, owner_id: &str, id: Uuid) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner_id],
        )?;
        if affected == 0 {
            return Err(CoreError::session_not_found(id));
        }
        Ok(())
    }

    // === Goals ===

    pub fn insert_goal(&self, goal: &Goal) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO goals ({GOAL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"),
                rusqlite::params_from_iter(goal_params(goal)?),
            )
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    pub fn get_goal(&self, owner_id: &str, id: Uuid) -> Result<Goal> {
        self.conn
            .query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1 AND owner_id = ?2"),
                params![id.to_string(), owner_id],
                row_to_goal,
            )
            .optional()
            .map_err(DatabaseError::from)?
            .ok_or_else(|| CoreError::goal_not_found(id))
    }

    /// All of the owner's goals, newest first.
    pub fn list_goals(&self, owner_id: &str) -> Result<Vec<Goal>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE owner_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![owner_id], row_to_goal)?;
        let mut goals = Vec::new();
        for row in rows {
            goals.push(row.map_err(DatabaseError::from)?);
        }
        Ok(goals)
    }

    fn write_goal(conn: &Connection, goal: &Goal) -> Result<()> {
        conn.execute(
            "UPDATE goals SET current_value = ?2, status = ?3, completed_at = ?4, \
             milestones = ?5, rewards = ?6, end_date = ?7 WHERE id = ?1",
            params![
                goal.id.to_string(),
                goal.current_value,
                goal.status.as_str(),
                goal.completed_at.map(|d| d.to_rfc3339()),
                serde_json::to_string(&goal.milestones)?,
                serde_json::to_string(&goal.rewards)?,
                goal.end_date.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Atomic read-modify-write on one goal.
    ///
    /// The closure sees the latest stored state and its mutation is written
    /// back in the same IMMEDIATE transaction, so concurrent deltas are never
    /// computed against a stale read.
    pub fn with_goal<F>(&self, owner_id: &str, id: Uuid, mutate: F) -> Result<(Goal, Vec<Event>)>
    where
        F: FnOnce(&mut Goal) -> Result<Vec<Event>>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(DatabaseError::from)?;

        let result = (|| {
            let mut goal = self
                .conn
                .query_row(
                    &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1 AND owner_id = ?2"),
                    params![id.to_string(), owner_id],
                    row_to_goal,
                )
                .optional()
                .map_err(DatabaseError::from)?
                .ok_or_else(|| CoreError::goal_not_found(id))?;

            let events = mutate(&mut goal)?;
            Self::write_goal(&self.conn, &goal)?;
            Ok((goal, events))
        })();

        match result {
            Ok(ok) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(DatabaseError::from)?;
                Ok(ok)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(err)
            }
        }
    }

    /// Active goals whose window has expired, oldest deadline first.
    pub fn overdue_candidates(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Goal>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals \
             WHERE status = 'active' AND end_date < ?1 ORDER BY end_date ASC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![now.to_rfc3339(), limit], row_to_goal)?;
        let mut goals = Vec::new();
        for row in rows {
            goals.push(row.map_err(DatabaseError::from)?);
        }
        Ok(goals)
    }

    /// Clear a goal's recurring flag. Called once its pattern can produce no
    /// further instances, so it stops matching [`Self::regeneration_candidates`].
    pub fn retire_recurrence(&self, id: Uuid) -> Result<()> {
        self.conn
            .execute(
                "UPDATE goals SET is_recurring = 0 WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Completed recurring goals with no successor yet.
    pub fn regeneration_candidates(&self, limit: u32) -> Result<Vec<Goal>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals g \
             WHERE g.status = 'completed' AND g.is_recurring = 1 \
               AND NOT EXISTS (SELECT 1 FROM goals s WHERE s.parent_goal_id = g.id) \
             ORDER BY g.completed_at ASC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], row_to_goal)?;
        let mut goals = Vec::new();
        for row in rows {
            goals.push(row.map_err(DatabaseError::from)?);
        }
        Ok(goals)
    }

    // === KV store ===

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(DatabaseError::from)?;
        Ok(())
    }
}

fn session_params(session: &Session) -> Result<[rusqlite::types::Value; 15]> {
    use rusqlite::types::Value;
    Ok([
        Value::Text(session.id.to_string()),
        Value::Text(session.owner_id.clone()),
        Value::Text(session.topic_id.clone()),
        Value::Text(session.kind.as_str().to_string()),
        Value::Integer(i64::from(session.planned_minutes)),
        Value::Text(session.status.as_str().to_string()),
        Value::Text(session.created_at.to_rfc3339()),
        opt_text(session.started_at.map(|d| d.to_rfc3339())),
        opt_text(session.completed_at.map(|d| d.to_rfc3339())),
        opt_text(session.cancelled_at.map(|d| d.to_rfc3339())),
        Value::Text(serde_json::to_string(&session.interruptions)?),
        session
            .actual_minutes
            .map(|m| Value::Integer(i64::from(m)))
            .unwrap_or(Value::Null),
        session
            .productivity
            .map(|p| Value::Integer(i64::from(p)))
            .unwrap_or(Value::Null),
        opt_text(session.notes.clone()),
        Value::Text(serde_json::to_string(&session.tags)?),
    ])
}

fn goal_params(goal: &Goal) -> Result<[rusqlite::types::Value; 19]> {
    use rusqlite::types::Value;
    Ok([
        Value::Text(goal.id.to_string()),
        Value::Text(goal.owner_id.clone()),
        Value::Text(goal.title.clone()),
        Value::Text(goal.category.clone()),
        Value::Text(serde_json::to_string(&goal.topic_ids)?),
        Value::Real(goal.target_value),
        Value::Real(goal.current_value),
        Value::Text(goal.unit.clone()),
        Value::Text(goal.start_date.to_rfc3339()),
        Value::Text(goal.end_date.to_rfc3339()),
        Value::Text(goal.status.as_str().to_string()),
        opt_text(goal.completed_at.map(|d| d.to_rfc3339())),
        Value::Text(serde_json::to_string(&goal.milestones)?),
        Value::Text(serde_json::to_string(&goal.rewards)?),
        Value::Integer(i64::from(goal.is_recurring)),
        goal.recurrence
            .as_ref()
            .map(|r| serde_json::to_string(r))
            .transpose()?
            .map(Value::Text)
            .unwrap_or(Value::Null),
        Value::Integer(i64::from(goal.recurrence_count)),
        opt_text(goal.parent_goal_id.map(|p| p.to_string())),
        Value::Text(goal.created_at.to_rfc3339()),
    ])
}

fn opt_text(value: Option<String>) -> rusqlite::types::Value {
    match value {
        Some(v) => rusqlite::types::Value::Text(v),
        None => rusqlite::types::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{DeltaMode, GoalDraft};
    use crate::session::{CompletionPayload, SessionKind};
    use chrono::{Duration, TimeZone};

    fn t(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn draft_goal(owner: &str) -> Goal {
        GoalDraft {
            owner_id: owner.to_string(),
            title: "Reading".to_string(),
            category: "reading".to_string(),
            topic_ids: vec![],
            target_value: 100.0,
            unit: "minutes".to_string(),
            start_date: t(0),
            end_date: t(60 * 24),
            milestones: vec![Milestone::new(0, "half", 50.0)],
            rewards: vec![],
            recurrence: None,
        }
        .build(t(0))
    }

    #[test]
    fn session_round_trip() {
        let db = Database::open_memory().unwrap();
        let mut s = Session::new("alice", "topic-1", SessionKind::Review, 30, t(0));
        db.insert_session(&s).unwrap();

        s.start(t(1)).unwrap();
        s.pause(t(5)).unwrap();
        s.resume(t(8)).unwrap();
        db.update_session(&s).unwrap();

        let loaded = db.get_session("alice", s.id).unwrap();
        assert_eq!(loaded.status, SessionStatus::Active);
        assert_eq!(loaded.kind, SessionKind::Review);
        assert_eq!(loaded.interruptions.len(), 1);
        assert_eq!(loaded.interruptions[0].ended_at, Some(t(8)));
    }

    #[test]
    fn second_open_session_conflicts() {
        let db = Database::open_memory().unwrap();
        let first = Session::new("alice", "topic-1", SessionKind::Study, 30, t(0));
        db.insert_session(&first).unwrap();

        let second = Session::new("alice", "topic-2", SessionKind::Study, 30, t(1));
        let err = db.insert_session(&second).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ConflictingActiveSession { ref owner_id, existing_session_id }
                if owner_id == "alice" && existing_session_id == first.id
        ));

        // A different owner is unaffected.
        let other = Session::new("bob", "topic-1", SessionKind::Study, 30, t(1));
        db.insert_session(&other).unwrap();
    }

    #[test]
    fn terminal_session_frees_the_slot() {
        let db = Database::open_memory().unwrap();
        let mut s = Session::new("alice", "topic-1", SessionKind::Study, 30, t(0));
        db.insert_session(&s).unwrap();
        s.start(t(0)).unwrap();
        s.complete(t(30), CompletionPayload::default()).unwrap();
        db.update_session(&s).unwrap();

        let next = Session::new("alice", "topic-2", SessionKind::Study, 30, t(31));
        db.insert_session(&next).unwrap();
        assert_eq!(db.find_open_session("alice").unwrap().unwrap().id, next.id);
    }

    #[test]
    fn owner_scope_hides_other_owners() {
        let db = Database::open_memory().unwrap();
        let s = Session::new("alice", "topic-1", SessionKind::Study, 30, t(0));
        db.insert_session(&s).unwrap();
        assert!(matches!(
            db.get_session("bob", s.id).unwrap_err(),
            CoreError::NotFound { .. }
        ));
    }

    #[test]
    fn goal_round_trip_and_rmw() {
        let db = Database::open_memory().unwrap();
        let goal = draft_goal("alice");
        db.insert_goal(&goal).unwrap();

        let (updated, events) = db
            .with_goal("alice", goal.id, |g| g.apply_delta(60.0, DeltaMode::Add, t(1)))
            .unwrap();
        assert_eq!(updated.current_value, 60.0);
        assert!(!events.is_empty());

        let loaded = db.get_goal("alice", goal.id).unwrap();
        assert_eq!(loaded.current_value, 60.0);
        assert!(loaded.milestones[0].completed);
    }

    #[test]
    fn successor_uniqueness_enforced() {
        let db = Database::open_memory().unwrap();
        let parent = draft_goal("alice");
        db.insert_goal(&parent).unwrap();

        let mut first = draft_goal("alice");
        first.parent_goal_id = Some(parent.id);
        db.insert_goal(&first).unwrap();

        let mut second = draft_goal("alice");
        second.parent_goal_id = Some(parent.id);
        let err = db.insert_goal(&second).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::Constraint(_))
        ));
    }

    #[test]
    fn overdue_and_regeneration_candidates() {
        let db = Database::open_memory().unwrap();

        let mut expired = draft_goal("alice");
        expired.end_date = t(10);
        db.insert_goal(&expired).unwrap();

        let mut done = draft_goal("bob");
        done.is_recurring = true;
        done.recurrence = Some(RecurrencePattern {
            frequency: crate::goal::Frequency::Weekly,
            interval: 1,
            end_date: None,
            end_after_occurrences: None,
        });
        done.status = GoalStatus::Completed;
        done.completed_at = Some(t(5));
        db.insert_goal(&done).unwrap();

        let overdue = db.overdue_candidates(t(20), 10).unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, expired.id);

        let regen = db.regeneration_candidates(10).unwrap();
        assert_eq!(regen.len(), 1);
        assert_eq!(regen[0].id, done.id);
    }

    #[test]
    fn reopen_on_disk_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studytrack.db");
        {
            let db = Database::open_at(&path).unwrap();
            let s = Session::new("alice", "topic-1", SessionKind::Study, 30, t(0));
            db.insert_session(&s).unwrap();
        }
        // Re-running migrations against the existing file is a no-op.
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.list_sessions("alice").unwrap().len(), 1);
    }

    #[test]
    fn corrupt_status_surfaces_as_parse_error() {
        let db = Database::open_memory().unwrap();
        let s = Session::new("alice", "topic-1", SessionKind::Study, 30, t(0));
        db.insert_session(&s).unwrap();
        db.conn()
            .execute("UPDATE sessions SET status = 'bogus'", [])
            .unwrap();
        assert!(matches!(
            db.get_session("alice", s.id).unwrap_err(),
            CoreError::Database(_)
        ));

        let g = draft_goal("alice");
        db.insert_goal(&g).unwrap();
        db.conn()
            .execute("UPDATE goals SET status = 'bogus'", [])
            .unwrap();
        assert!(matches!(
            db.get_goal("alice", g.id).unwrap_err(),
            CoreError::Database(_)
        ));
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }
}
