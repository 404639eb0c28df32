mod cmd_list;
mod cmd_play;
mod cmd_show;
mod cmd_stats;
mod format;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unotrack::{SaveResolver, UnoTrack};

/// Environment variable holding the log filter, e.g. `unotrack=debug`.
const LOG_ENV: &str = "UNOTRACK_LOG";

#[derive(Parser, Debug)]
#[command(name = "unotrack")]
#[command(about = "Keep score of Uno sessions: cards drawn, wins, undo and statistics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Application folder holding the saves directory
    /// (default: $UNOTRACK_HOME or the per-OS app folder)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List stored sessions, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the players and history of a stored session
    Show {
        /// Snapshot id (file name without .json)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Include the per-player card timeline
        #[arg(long)]
        timeline: bool,
    },
    /// Statistics across all stored sessions
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a session interactively; reads commands from stdin
    Play {
        /// Continue a stored session instead of starting a new one
        #[arg(long, conflicts_with = "players")]
        load: Option<String>,

        /// Player names, in seating order
        #[arg(required_unless_present = "load")]
        players: Vec<String>,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open(data_dir: Option<PathBuf>) -> UnoTrack {
    match data_dir {
        Some(dir) => UnoTrack::with_resolver(SaveResolver::new().with_app_dir(dir)),
        None => UnoTrack::new(),
    }
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let uno = open(cli.data_dir);

    match cli.command {
        Commands::List { json } => cmd_list::run(&uno, json, cli.pretty),
        Commands::Show { id, json, timeline } => {
            cmd_show::run(&uno, &id, json, timeline, cli.pretty)
        }
        Commands::Stats { json } => cmd_stats::run(&uno, json, cli.pretty),
        Commands::Play { load, players } => cmd_play::run(&uno, load, players),
    }
}
