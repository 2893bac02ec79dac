//! Session state machine transitions.
//!
//! One method per action, each validating the current state exhaustively and
//! returning the event the transition produced. Illegal moves fail with
//! [`CoreError::InvalidTransition`]; nothing is silently ignored.
//!
//! ## State Transitions
//!
//! ```text
//! Planned -> Active <-> Paused
//! Active | Paused   -> Completed
//! Planned | Active | Paused -> Cancelled
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Session, SessionAction, SessionStatus};
use crate::duration::{self, Interruption};
use crate::error::{CoreError, Result};
use crate::events::Event;

/// Optional payload accepted on completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionPayload {
    /// Self-reported productivity rating, 1-5.
    pub productivity: Option<u8>,
    pub notes: Option<String>,
}

impl Session {
    fn reject(&self, action: SessionAction) -> CoreError {
        CoreError::InvalidTransition {
            session_id: self.id,
            from: self.status,
            action,
        }
    }

    /// `Planned -> Active`. Records `started_at`.
    ///
    /// The cross-record "at most one open session per owner" invariant is
    /// enforced atomically by the storage layer at write time, not here.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Event> {
        match self.status {
            SessionStatus::Planned => {
                self.status = SessionStatus::Active;
                self.started_at = Some(now);
                Ok(Event::SessionStarted {
                    session_id: self.id,
                    owner_id: self.owner_id.clone(),
                    topic_id: self.topic_id.clone(),
                    at: now,
                })
            }
            _ => Err(self.reject(SessionAction::Start)),
        }
    }

    /// `Active -> Paused`. Appends an open interruption.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Event> {
        match self.status {
            SessionStatus::Active => {
                if self.open_interruption().is_some() {
                    return Err(CoreError::InvariantViolation(format!(
                        "session {} is active but has an open interruption",
                        self.id
                    )));
                }
                self.interruptions.push(Interruption::open(now));
                self.status = SessionStatus::Paused;
                Ok(Event::SessionPaused {
                    session_id: self.id,
                    at: now,
                })
            }
            _ => Err(self.reject(SessionAction::Pause)),
        }
    }

    /// `Paused -> Active`. Closes the open interruption at `now`.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<Event> {
        self.resume_with(now, None)
    }

    /// `Paused -> Active` with an optional caller-supplied pause duration.
    ///
    /// When `paused_minutes` is given, the open interruption is closed at
    /// `start + paused_minutes`, capped at `now` -- same effect as closing at
    /// the wall clock, reconciled against what the caller observed.
    pub fn resume_with(
        &mut self,
        now: DateTime<Utc>,
        paused_minutes: Option<u32>,
    ) -> Result<Event> {
        match self.status {
            SessionStatus::Paused => {
                let open = self
                    .interruptions
                    .iter_mut()
                    .find(|i| i.is_open())
                    .ok_or_else(|| {
                        CoreError::InvariantViolation(format!(
                            "session {} is paused but has no open interruption",
                            self.id
                        ))
                    })?;
                let end = match paused_minutes {
                    Some(min) => (open.started_at + Duration::minutes(i64::from(min))).min(now),
                    None => now,
                };
                let end = end.max(open.started_at);
                open.ended_at = Some(end);
                let paused_secs = (end - open.started_at).num_seconds();
                self.status = SessionStatus::Active;
                Ok(Event::SessionResumed {
                    session_id: self.id,
                    paused_secs,
                    at: now,
                })
            }
            _ => Err(self.reject(SessionAction::Resume)),
        }
    }

    /// `Active | Paused -> Completed`. Irreversible.
    ///
    /// Closes any open interruption first, then fixes `actual_minutes` from
    /// the recorded timestamps.
    pub fn complete(&mut self, now: DateTime<Utc>, payload: CompletionPayload) -> Result<Event> {
        match self.status {
            SessionStatus::Active | SessionStatus::Paused => {
                if let Some(open) = self.interruptions.iter_mut().find(|i| i.is_open()) {
                    open.ended_at = Some(now.max(open.started_at));
                }
                let started_at = self.started_at.ok_or_else(|| {
                    CoreError::InvariantViolation(format!(
                        "session {} is {} but has no started_at",
                        self.id, self.status
                    ))
                })?;
                let actual = duration::active_duration_min(started_at, now, &self.interruptions);
                self.actual_minutes = Some(actual);
                self.completed_at = Some(now);
                self.status = SessionStatus::Completed;
                if payload.productivity.is_some() {
                    self.productivity = payload.productivity;
                }
                if payload.notes.is_some() {
                    self.notes = payload.notes;
                }
                Ok(Event::SessionCompleted {
                    session_id: self.id,
                    owner_id: self.owner_id.clone(),
                    actual_minutes: actual,
                    at: now,
                })
            }
            _ => Err(self.reject(SessionAction::Complete)),
        }
    }

    /// `Planned | Active | Paused -> Cancelled`. Irreversible; no duration is
    /// computed (zero contribution to analytics).
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<Event> {
        match self.status {
            SessionStatus::Planned | SessionStatus::Active | SessionStatus::Paused => {
                if let Some(open) = self.interruptions.iter_mut().find(|i| i.is_open()) {
                    open.ended_at = Some(now.max(open.started_at));
                }
                self.cancelled_at = Some(now);
                self.status = SessionStatus::Cancelled;
                Ok(Event::SessionCancelled {
                    session_id: self.id,
                    at: now,
                })
            }
            _ => Err(self.reject(SessionAction::Cancel)),
        }
    }

    /// Dispatch an action by name. Used by the command surface.
    pub fn apply(
        &mut self,
        action: SessionAction,
        now: DateTime<Utc>,
        payload: CompletionPayload,
    ) -> Result<Event> {
        match action {
            SessionAction::Start => self.start(now),
            SessionAction::Pause => self.pause(now),
            SessionAction::Resume => self.resume(now),
            SessionAction::Complete => self.complete(now, payload),
            SessionAction::Cancel => self.cancel(now),
        }
    }
}
