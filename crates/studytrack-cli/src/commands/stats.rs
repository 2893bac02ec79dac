use chrono::{Duration, NaiveDate, Utc};
use clap::Subcommand;
use studytrack_core::StudyService;

#[derive(Subcommand)]
pub enum StatsCmd {
    /// Daily activity series (fixed length, zero-filled)
    Daily {
        /// First day of the series (defaults to `days - 1` days ago)
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long, default_value = "7")]
        days: u32,
    },
    /// Weekly activity series
    Weekly {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long, default_value = "4")]
        weeks: u32,
    },
    /// Per-category goal rollup
    Categories,
    /// Current and longest streaks
    Streak,
    /// Derived per-user activity stats
    Summary,
}

pub fn run(cmd: StatsCmd, owner: &str) -> Result<(), Box<dyn std::error::Error>> {
    let svc = StudyService::open()?;
    let now = Utc::now();
    let today = now.with_timezone(&svc.config().offset()).date_naive();

    match cmd {
        StatsCmd::Daily { from, days } => {
            let from = from.unwrap_or(today - Duration::days(i64::from(days.saturating_sub(1))));
            let series = svc.daily_series(owner, from, days)?;
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
        StatsCmd::Weekly { from, weeks } => {
            let from =
                from.unwrap_or(today - Duration::weeks(i64::from(weeks.saturating_sub(1))));
            let series = svc.weekly_series(owner, from, weeks)?;
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
        StatsCmd::Categories => {
            let rollup = svc.category_rollup(owner)?;
            println!("{}", serde_json::to_string_pretty(&rollup)?);
        }
        StatsCmd::Streak => {
            let summary = svc.streaks(owner, now)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsCmd::Summary => {
            let stats = svc.activity_stats(owner, now)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
