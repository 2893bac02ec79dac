//! Read-only rollups over completed sessions and goals.
//!
//! Aggregation never mutates Session/Goal state. Fixed-length series are
//! zero-filled: a day with no sessions contributes a zero-valued bucket, not
//! an omitted one.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::goal::{Goal, GoalStatus};
use crate::session::{Session, SessionStatus};
use crate::streak::StreakSummary;

/// One day's (or week's) worth of completed-session activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityBucket {
    pub period_start: NaiveDate,
    pub sessions: u32,
    pub total_minutes: u32,
    /// Mean self-reported productivity over rated sessions; `None` when the
    /// bucket has no rated sessions.
    pub mean_productivity: Option<f64>,
}

impl ActivityBucket {
    fn empty(period_start: NaiveDate) -> Self {
        Self {
            period_start,
            sessions: 0,
            total_minutes: 0,
            mean_productivity: None,
        }
    }
}

/// Per-category goal rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRollup {
    pub category: String,
    pub goals: u32,
    pub completed: u32,
    pub total_target: f64,
    pub total_current: f64,
}

/// Derived per-user stats. A cache, not a source of truth: recomputable from
/// session and goal history at any time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserActivityStats {
    pub total_active_minutes: u64,
    pub sessions_completed: u32,
    pub sessions_cancelled: u32,
    pub sessions_open: u32,
    pub goals_active: u32,
    pub goals_completed: u32,
    pub goals_overdue: u32,
    pub streak: StreakSummary,
}

/// Local calendar date of a timestamp under the configured offset.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

fn qualifying(session: &Session) -> Option<(DateTime<Utc>, u32)> {
    if session.status != SessionStatus::Completed {
        return None;
    }
    let at = session.completed_at?;
    Some((at, session.actual_minutes.unwrap_or(0)))
}

/// Distinct local dates with at least one completed session of non-zero
/// active duration. Feed to [`crate::streak::compute_streaks`].
pub fn activity_dates(sessions: &[Session], offset: FixedOffset) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = sessions
        .iter()
        .filter_map(qualifying)
        .filter(|(_, minutes)| *minutes > 0)
        .map(|(at, _)| local_date(at, offset))
        .collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

fn accumulate<'a>(
    buckets: &mut BTreeMap<NaiveDate, (u32, u32, Vec<u8>)>,
    sessions: impl Iterator<Item = &'a Session>,
    offset: FixedOffset,
    key_fn: impl Fn(NaiveDate) -> NaiveDate,
) {
    for session in sessions {
        let Some((at, minutes)) = qualifying(session) else {
            continue;
        };
        let key = key_fn(local_date(at, offset));
        let entry = buckets.entry(key).or_insert((0, 0, Vec::new()));
        entry.0 += 1;
        entry.1 += minutes;
        if let Some(p) = session.productivity {
            entry.2.push(p);
        }
    }
}

fn finish(key: NaiveDate, entry: Option<&(u32, u32, Vec<u8>)>) -> ActivityBucket {
    match entry {
        None => ActivityBucket::empty(key),
        Some((count, minutes, ratings)) => ActivityBucket {
            period_start: key,
            sessions: *count,
            total_minutes: *minutes,
            mean_productivity: if ratings.is_empty() {
                None
            } else {
                Some(ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64)
            },
        },
    }
}

/// Daily series over `days` consecutive days starting at `from` (local).
/// Always exactly `days` buckets.
pub fn daily_series(
    sessions: &[Session],
    from: NaiveDate,
    days: u32,
    offset: FixedOffset,
) -> Vec<ActivityBucket> {
    let mut buckets = BTreeMap::new();
    accumulate(&mut buckets, sessions.iter(), offset, |d| d);
    (0..days)
        .map(|i| {
            let day = from + Duration::days(i64::from(i));
            finish(day, buckets.get(&day))
        })
        .collect()
}

/// Weekly series over `weeks` consecutive ISO weeks; each bucket keyed by its
/// Monday. `from` is snapped back to its week's Monday.
pub fn weekly_series(
    sessions: &[Session],
    from: NaiveDate,
    weeks: u32,
    offset: FixedOffset,
) -> Vec<ActivityBucket> {
    let monday = |d: NaiveDate| d - Duration::days(i64::from(d.weekday().num_days_from_monday()));
    let mut buckets = BTreeMap::new();
    accumulate(&mut buckets, sessions.iter(), offset, monday);
    let first = monday(from);
    (0..weeks)
        .map(|i| {
            let week = first + Duration::weeks(i64::from(i));
            finish(week, buckets.get(&week))
        })
        .collect()
}

/// Roll goals up by category.
pub fn category_rollup(goals: &[Goal]) -> Vec<CategoryRollup> {
    let mut by_category: BTreeMap<&str, CategoryRollup> = BTreeMap::new();
    for goal in goals {
        let entry = by_category
            .entry(goal.category.as_str())
            .or_insert_with(|| CategoryRollup {
                category: goal.category.clone(),
                goals: 0,
                completed: 0,
                total_target: 0.0,
                total_current: 0.0,
            });
        entry.goals += 1;
        if goal.status == GoalStatus::Completed {
            entry.completed += 1;
        }
        entry.total_target += goal.target_value;
        entry.total_current += goal.current_value;
    }
    by_category.into_values().collect()
}

/// Recompute the derived per-user stats from full history.
pub fn user_activity_stats(
    sessions: &[Session],
    goals: &[Goal],
    streak: StreakSummary,
) -> UserActivityStats {
    let mut stats = UserActivityStats {
        streak,
        ..UserActivityStats::default()
    };
    for session in sessions {
        match session.status {
            SessionStatus::Completed => {
                stats.sessions_completed += 1;
                stats.total_active_minutes += u64::from(session.actual_minutes.unwrap_or(0));
            }
            SessionStatus::Cancelled => stats.sessions_cancelled += 1,
            _ => stats.sessions_open += 1,
        }
    }
    for goal in goals {
        match goal.status {
            GoalStatus::Active | GoalStatus::Paused => stats.goals_active += 1,
            GoalStatus::Completed => stats.goals_completed += 1,
            GoalStatus::Overdue => stats.goals_overdue += 1,
            GoalStatus::Cancelled => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CompletionPayload, SessionKind};
    use chrono::TimeZone;

    fn utc_offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn completed_session(day: u32, minutes: i64, productivity: Option<u8>) -> Session {
        let start = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap();
        let mut s = Session::new("alice", "topic-1", SessionKind::Study, 30, start);
        s.start(start).unwrap();
        s.complete(
            start + Duration::minutes(minutes),
            CompletionPayload {
                productivity,
                notes: None,
            },
        )
        .unwrap();
        s
    }

    #[test]
    fn daily_series_zero_fills_sparse_days() {
        let sessions = vec![
            completed_session(1, 30, Some(4)),
            completed_session(3, 20, None),
        ];
        let series = daily_series(
            &sessions,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            4,
            utc_offset(),
        );
        assert_eq!(series.len(), 4);
        assert_eq!(series[0].total_minutes, 30);
        assert_eq!(series[1], ActivityBucket::empty(series[1].period_start));
        assert_eq!(series[2].total_minutes, 20);
        assert_eq!(series[3].sessions, 0);
    }

    #[test]
    fn mean_productivity_ignores_unrated() {
        let sessions = vec![
            completed_session(1, 30, Some(4)),
            completed_session(1, 30, Some(2)),
            completed_session(1, 30, None),
        ];
        let series = daily_series(
            &sessions,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            1,
            utc_offset(),
        );
        assert_eq!(series[0].sessions, 3);
        assert_eq!(series[0].mean_productivity, Some(3.0));
    }

    #[test]
    fn cancelled_sessions_contribute_nothing() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut cancelled = Session::new("alice", "topic-1", SessionKind::Study, 30, start);
        cancelled.start(start).unwrap();
        cancelled.cancel(start + Duration::minutes(10)).unwrap();

        let series = daily_series(
            &[cancelled],
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            1,
            utc_offset(),
        );
        assert_eq!(series[0].sessions, 0);
        assert_eq!(series[0].total_minutes, 0);
    }

    #[test]
    fn weekly_series_groups_by_monday() {
        // 2026-03-02 is a Monday.
        let sessions = vec![
            completed_session(2, 30, None),
            completed_session(4, 15, None),
            completed_session(9, 25, None),
        ];
        let series = weekly_series(
            &sessions,
            NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
            2,
            utc_offset(),
        );
        assert_eq!(series.len(), 2);
        assert_eq!(
            series[0].period_start,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
        assert_eq!(series[0].total_minutes, 45);
        assert_eq!(series[1].total_minutes, 25);
    }

    #[test]
    fn offset_shifts_day_boundary() {
        // 23:00 UTC on Mar 1 is Mar 2 at UTC+1.
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 23, 0, 0).unwrap();
        let mut s = Session::new("alice", "t", SessionKind::Study, 30, start);
        s.start(start).unwrap();
        s.complete(start + Duration::minutes(30), CompletionPayload::default())
            .unwrap();

        let plus_one = FixedOffset::east_opt(3600).unwrap();
        let dates = activity_dates(&[s], plus_one);
        assert_eq!(dates, vec![NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()]);
    }

    #[test]
    fn zero_minute_sessions_do_not_count_toward_streak_dates() {
        let sessions = vec![completed_session(1, 0, None)];
        assert!(activity_dates(&sessions, utc_offset()).is_empty());
    }
}
