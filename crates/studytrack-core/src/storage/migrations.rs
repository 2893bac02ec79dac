//! Database schema migrations for studytrack.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Apply all pending migrations.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or(0)
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// v1: sessions, goals, kv.
///
/// The partial unique index on open sessions is what enforces the
/// one-open-session-per-owner invariant atomically at write time. The unique
/// index on `parent_goal_id` makes recurrence regeneration idempotent: a
/// second sweep cannot double-create a successor for the same source goal.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id              TEXT PRIMARY KEY,
            owner_id        TEXT NOT NULL,
            topic_id        TEXT NOT NULL,
            kind            TEXT NOT NULL DEFAULT 'study',
            planned_minutes INTEGER NOT NULL,
            status          TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            started_at      TEXT,
            completed_at    TEXT,
            cancelled_at    TEXT,
            interruptions   TEXT NOT NULL DEFAULT '[]',
            actual_minutes  INTEGER,
            productivity    INTEGER,
            notes           TEXT,
            tags            TEXT NOT NULL DEFAULT '[]'
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_owner_open
            ON sessions(owner_id)
            WHERE status IN ('planned', 'active', 'paused');

        CREATE INDEX IF NOT EXISTS idx_sessions_owner_completed
            ON sessions(owner_id, completed_at);

        CREATE TABLE IF NOT EXISTS goals (
            id                TEXT PRIMARY KEY,
            owner_id          TEXT NOT NULL,
            title             TEXT NOT NULL,
            category          TEXT NOT NULL DEFAULT '',
            topic_ids         TEXT NOT NULL DEFAULT '[]',
            target_value      REAL NOT NULL,
            current_value     REAL NOT NULL DEFAULT 0,
            unit              TEXT NOT NULL DEFAULT '',
            start_date        TEXT NOT NULL,
            end_date          TEXT NOT NULL,
            status            TEXT NOT NULL,
            completed_at      TEXT,
            milestones        TEXT NOT NULL DEFAULT '[]',
            rewards           TEXT NOT NULL DEFAULT '[]',
            is_recurring      INTEGER NOT NULL DEFAULT 0,
            recurrence        TEXT,
            recurrence_count  INTEGER NOT NULL DEFAULT 1,
            parent_goal_id    TEXT,
            created_at        TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_goals_parent
            ON goals(parent_goal_id)
            WHERE parent_goal_id IS NOT NULL;

        CREATE INDEX IF NOT EXISTS idx_goals_owner_status
            ON goals(owner_id, status);

        CREATE INDEX IF NOT EXISTS idx_goals_status_end_date
            ON goals(status, end_date);

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    set_schema_version(conn, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 1);
    }
}
