//! # Studytrack Core Library
//!
//! This library provides the core business logic for Studytrack, a study
//! activity tracker. It implements a CLI-first philosophy where all operations
//! are available via a standalone CLI binary, with any GUI being a thin layer
//! over the same core library.
//!
//! ## Architecture
//!
//! - **Session State Machine**: timed, pausable study sessions with a closed
//!   set of lifecycle transitions; elapsed active time is fixed at completion
//! - **Goal Progress Engine**: numeric goal targets with milestones, rewards,
//!   and optional recurrence
//! - **Streak Calculator**: consecutive-day activity streaks from completed
//!   session history
//! - **Analytics**: daily/weekly rollups over completed sessions
//! - **Storage**: SQLite-based session/goal persistence and TOML-based
//!   configuration
//!
//! ## Key Components
//!
//! - [`Session`]: timed study session record and its state machine
//! - [`Goal`]: numeric target with milestones, rewards, and recurrence
//! - [`StudyService`]: the command surface tying storage and engines together
//! - [`Database`]: session and goal persistence

pub mod analytics;
pub mod duration;
pub mod error;
pub mod events;
pub mod goal;
pub mod service;
pub mod session;
pub mod storage;
pub mod streak;

pub use analytics::{ActivityBucket, CategoryRollup, UserActivityStats};
pub use duration::Interruption;
pub use error::{ConfigError, CoreError, DatabaseError, Result};
pub use events::Event;
pub use goal::{
    DeltaMode, Frequency, Goal, GoalDraft, GoalStatus, GoalTemplate, Milestone,
    RecurrencePattern, Reward, RewardCondition,
};
pub use service::{SessionPayload, StudyService, SweepReport};
pub use session::{CompletionPayload, Session, SessionAction, SessionKind, SessionStatus};
pub use storage::{Config, Database};
pub use streak::StreakSummary;
