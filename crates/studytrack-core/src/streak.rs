//! Consecutive-day activity streaks.
//!
//! A streak counts consecutive local calendar days with at least one
//! completed session of non-zero active duration. Today not yet having a
//! session does not break the current streak; a gap resets it only after a
//! full missed day.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    /// Consecutive days ending today or yesterday.
    pub current: u32,
    /// Longest run over all history.
    pub longest: u32,
}

/// Compute streaks from the distinct local dates with qualifying activity.
///
/// Dates need not be sorted or de-duplicated; `today` is the caller's local
/// date under the configured offset.
pub fn compute_streaks(dates: &[NaiveDate], today: NaiveDate) -> StreakSummary {
    if dates.is_empty() {
        return StreakSummary::default();
    }

    let mut days: Vec<NaiveDate> = dates.to_vec();
    days.sort_unstable();
    days.dedup();

    let mut longest: u32 = 1;
    let mut run: u32 = 1;
    for pair in days.windows(2) {
        if pair[1] - pair[0] == Duration::days(1) {
            run += 1;
        } else {
            run = 1;
        }
        longest = longest.max(run);
    }

    let last = *days.last().expect("non-empty after dedup");
    let current = if today - last <= Duration::days(1) {
        run
    } else {
        0
    };

    StreakSummary { current, longest }
}
