use clap::Subcommand;
use studytrack_core::Config;

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Print the current configuration as JSON
    Show,
    /// Set the local UTC offset used for streaks and daily buckets
    SetOffset {
        /// Minutes east of UTC
        minutes: i32,
    },
    /// Set the sweep batch limit
    SetSweepLimit { limit: u32 },
}

pub fn run(cmd: ConfigCmd) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCmd::Show => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCmd::SetOffset { minutes } => {
            let mut config = Config::load()?;
            config.set_offset_minutes(minutes)?;
            config.save()?;
            eprintln!("utc_offset_minutes = {minutes}");
        }
        ConfigCmd::SetSweepLimit { limit } => {
            let mut config = Config::load()?;
            config.sweep.batch_limit = limit;
            config.save()?;
            eprintln!("sweep.batch_limit = {limit}");
        }
    }
    Ok(())
}
