//! Active-time accounting for sessions.
//!
//! Pure functions computing elapsed active time from lifecycle timestamps and
//! interruption intervals. No storage access, no clock reads -- callers pass
//! every timestamp in, so finalizing a session twice with the same inputs
//! reproduces the same value.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A recorded pause interval within a session.
///
/// An open interruption (`ended_at` absent) exists only while the session is
/// paused; the state machine closes it on resume or completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interruption {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Interruption {
    pub fn open(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ended_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Duration of this interval. Open intervals contribute zero.
    pub fn duration(&self) -> Duration {
        match self.ended_at {
            Some(end) => (end - self.started_at).max(Duration::zero()),
            None => Duration::zero(),
        }
    }
}

/// Total time spent paused, summed over closed interruptions.
pub fn paused_duration(interruptions: &[Interruption]) -> Duration {
    interruptions
        .iter()
        .map(Interruption::duration)
        .fold(Duration::zero(), |acc, d| acc + d)
}

/// Compute a session's active duration in whole minutes.
///
/// `(terminal - started) - sum(interruption durations)`, floored to whole
/// minutes and clamped at zero. The clamp covers clock skew between the
/// recorded timestamps, not any business rule; when it fires the raw value is
/// logged at warn level.
pub fn active_duration_min(
    started_at: DateTime<Utc>,
    terminal_at: DateTime<Utc>,
    interruptions: &[Interruption],
) -> u32 {
    let raw = (terminal_at - started_at) - paused_duration(interruptions);
    let secs = raw.num_seconds();
    if secs < 0 {
        tracing::warn!(
            raw_seconds = secs,
            %started_at,
            %terminal_at,
            "negative active duration clamped to zero"
        );
        return 0;
    }
    (secs / 60) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn closed(from: i64, to: i64) -> Interruption {
        Interruption {
            started_at: t(from),
            ended_at: Some(t(to)),
        }
    }

    #[test]
    fn no_interruptions() {
        assert_eq!(active_duration_min(t(0), t(40), &[]), 40);
    }

    #[test]
    fn single_pause_subtracted() {
        // 40 minutes elapsed, 5 paused -> 35 active.
        assert_eq!(active_duration_min(t(0), t(40), &[closed(10, 15)]), 35);
    }

    #[test]
    fn multiple_pauses_subtracted() {
        let ints = [closed(5, 10), closed(20, 30)];
        assert_eq!(active_duration_min(t(0), t(60), &ints), 45);
    }

    #[test]
    fn sub_minute_remainder_floored() {
        let end = t(0) + Duration::seconds(119);
        assert_eq!(active_duration_min(t(0), end, &[]), 1);
    }

    #[test]
    fn negative_raw_clamps_to_zero() {
        // Terminal before start (clock skew).
        assert_eq!(active_duration_min(t(10), t(0), &[]), 0);
        // Paused time exceeding elapsed time.
        assert_eq!(active_duration_min(t(0), t(10), &[closed(0, 20)]), 0);
    }

    #[test]
    fn open_interruption_contributes_zero() {
        let ints = [Interruption::open(t(10))];
        assert_eq!(active_duration_min(t(0), t(40), &ints), 40);
    }

    #[test]
    fn idempotent_for_same_inputs() {
        let ints = [closed(10, 15)];
        let first = active_duration_min(t(0), t(40), &ints);
        let second = active_duration_min(t(0), t(40), &ints);
        assert_eq!(first, second);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Active duration never exceeds wall-clock elapsed minutes.
            #[test]
            fn bounded_by_elapsed(elapsed_min in 0i64..10_000, pause_min in 0i64..10_000) {
                let end = t(elapsed_min);
                let ints = [Interruption {
                    started_at: t(0),
                    ended_at: Some(t(pause_min.min(elapsed_min))),
                }];
                let active = active_duration_min(t(0), end, &ints);
                prop_assert!(i64::from(active) <= elapsed_min);
            }

            #[test]
            fn exact_arithmetic(elapsed_min in 1i64..10_000, pause_min in 0i64..10_000) {
                let pause = pause_min.min(elapsed_min);
                let ints = [Interruption {
                    started_at: t(0),
                    ended_at: Some(t(pause)),
                }];
                let active = active_duration_min(t(0), t(elapsed_min), &ints);
                prop_assert_eq!(i64::from(active), elapsed_min - pause);
            }
        }
    }
}
