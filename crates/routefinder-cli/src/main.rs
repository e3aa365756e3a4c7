mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{guide::GuideSubcommand, run::RunArgs, season::SeasonSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "routefinder",
    about = "Recompute scheduler for reservations, sales, drivers and routes",
    version,
    propagate_version = true
)]
struct Cli {
    /// Guide database file
    #[arg(
        long,
        global = true,
        env = "ROUTEFINDER_DB",
        default_value = "routefinder.redb"
    )]
    db: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Defaults to `run`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and the liveness endpoint until interrupted
    Run(RunArgs),

    /// Inspect or flag the recompute guide
    Guide {
        #[command(subcommand)]
        subcommand: GuideSubcommand,
    },

    /// Inspect or record the season gate
    Season {
        #[command(subcommand)]
        subcommand: SeasonSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();
    let command = match cli.command {
        Some(command) => command,
        None => Commands::Run(RunArgs::from_env().unwrap_or_else(|e| e.exit())),
    };

    let default_level = match &command {
        Commands::Run(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = match command {
        Commands::Run(args) => cmd::run::run(&cli.db, args),
        Commands::Guide { subcommand } => cmd::guide::run(&cli.db, subcommand, cli.json),
        Commands::Season { subcommand } => cmd::season::run(&cli.db, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
