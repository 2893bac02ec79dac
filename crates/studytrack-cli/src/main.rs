use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "studytrack-cli", version, about = "Studytrack CLI")]
struct Cli {
    /// Owner scope for all operations.
    #[arg(long, global = true, default_value = "local")]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session lifecycle control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionCmd,
    },
    /// Goal management and progress
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalCmd,
    },
    /// Activity statistics and streaks
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsCmd,
    },
    /// Recurrence/overdue sweep
    Sweep {
        #[command(subcommand)]
        action: commands::sweep::SweepCmd,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigCmd,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action, &cli.owner),
        Commands::Goal { action } => commands::goal::run(action, &cli.owner),
        Commands::Stats { action } => commands::stats::run(action, &cli.owner),
        Commands::Sweep { action } => commands::sweep::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
