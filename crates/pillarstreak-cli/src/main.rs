use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pillarstreak-cli", version, about = "Pillarstreak CLI")]
struct Cli {
    /// Evaluate as of this RFC 3339 instant instead of the wall clock
    #[arg(long, global = true)]
    at: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daily rotation check
    Rotate,
    /// Choose today's pillar manually
    Select {
        /// nutrition, sleep or movement
        pillar: String,
    },
    /// Record progress toward today's target
    Progress {
        value: f64,
    },
    /// Mark today's pillar as completed
    Complete {
        /// Must name today's pillar
        pillar: String,
    },
    /// Current assignment and streak
    Status,
    /// Day-by-day history
    History {
        /// Number of days to show, ending today
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Completion totals over the stored history
    Summary,
    /// Pillar stats used by the stats-based and weighted strategies
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PILLARSTREAK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let at = cli.at.as_deref();
    let result = match cli.command {
        Commands::Rotate => commands::pillar::rotate(at),
        Commands::Select { pillar } => commands::pillar::select(at, &pillar),
        Commands::Progress { value } => commands::pillar::progress(at, value),
        Commands::Complete { pillar } => commands::pillar::complete(at, &pillar),
        Commands::Status => commands::pillar::status(at),
        Commands::History { days } => commands::history::history(at, days),
        Commands::Summary => commands::history::summary(at),
        Commands::Stats { action } => commands::stats::run(at, action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
