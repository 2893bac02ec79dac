//! Core error types for studytrack-core.
//!
//! This module defines the error hierarchy using thiserror. Every rejected
//! mutation carries enough context (entity id, current state, attempted
//! action) to render a precise user-facing message.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::session::{SessionAction, SessionStatus};

/// Core error type for studytrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A state-machine move not permitted from the current state.
    #[error("invalid transition: cannot {action} session {session_id} in state {from}")]
    InvalidTransition {
        session_id: Uuid,
        from: SessionStatus,
        action: SessionAction,
    },

    /// Attempted to start a session while another non-terminal session exists
    /// for the same owner. The caller must complete or cancel the existing
    /// one before retrying.
    #[error("owner '{owner_id}' already has an open session {existing_session_id}")]
    ConflictingActiveSession {
        owner_id: String,
        existing_session_id: Uuid,
    },

    /// Defensive check failure. Logged and the mutation rejected rather than
    /// partially applied.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Referenced record does not exist or does not belong to the caller's
    /// owner scope.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn session_not_found(id: Uuid) -> Self {
        CoreError::NotFound {
            kind: "session",
            id: id.to_string(),
        }
    }

    pub fn goal_not_found(id: Uuid) -> Self {
        CoreError::NotFound {
            kind: "goal",
            id: id.to_string(),
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A uniqueness constraint rejected the write
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to access data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked => DatabaseError::Locked,
                rusqlite::ErrorCode::ConstraintViolation => {
                    DatabaseError::Constraint(msg.clone().unwrap_or_else(|| e.to_string()))
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
