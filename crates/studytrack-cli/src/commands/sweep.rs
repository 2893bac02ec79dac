use chrono::{DateTime, Utc};
use clap::Subcommand;
use studytrack_core::StudyService;

#[derive(Subcommand)]
pub enum SweepCmd {
    /// Run one sweep pass: mark expired goals overdue, regenerate completed
    /// recurring goals
    Run {
        /// Per-pass batch cap (config default when omitted)
        #[arg(long)]
        limit: Option<u32>,
        /// Override "now" (RFC3339) for deterministic replay
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

pub fn run(cmd: SweepCmd) -> Result<(), Box<dyn std::error::Error>> {
    let svc = StudyService::open()?;

    match cmd {
        SweepCmd::Run { limit, now } => {
            let report = svc.sweep(now.unwrap_or_else(Utc::now), limit)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
