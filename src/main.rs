//! Shroud CLI - run, inspect and stress confidential games.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shroud::simulate::SimulationConfig;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Shroud - a confidential territory-control game engine
#[derive(Parser, Debug)]
#[command(name = "shroud")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a short scripted game and print every player's view
    Demo {
        /// Number of players (2-4)
        #[arg(short, long, default_value = "2", value_parser = clap::value_parser!(u8).range(2..=4))]
        players: u8,

        /// Backend and wallet seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Execute a JSON script of plaintext steps
    Run {
        /// Script file
        #[arg(required = true)]
        script: PathBuf,

        /// Backend and wallet seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Save recording to file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Replay a recording and verify its receipts
    Replay {
        /// Recording file
        #[arg(required = true)]
        recording: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Run many randomized games in parallel and check invariants
    Simulate {
        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        games: u64,

        /// Starting seed (increments for each game)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Players per game
        #[arg(short, long, default_value = "3")]
        players: usize,

        /// Rounds credited after the opening one
        #[arg(short, long, default_value = "3")]
        rounds: u32,

        /// Random commands per round
        #[arg(long, default_value = "8")]
        commands: u32,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show progress spinner
        #[arg(long)]
        progress: bool,
    },

    /// Generate a wallet and print its address and viewer key
    Keygen {
        /// 32-byte hex seed for a deterministic wallet
        #[arg(long)]
        seed: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    // Only fails if a subscriber is already installed.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    let config = args.config;

    let result = match args.command {
        Commands::Demo {
            players,
            seed,
            format,
        } => cli::demo::execute(usize::from(players), seed, config, format),

        Commands::Run {
            script,
            seed,
            format,
            save,
        } => cli::run::execute(script, seed, config, format, save),

        Commands::Replay { recording, format } => cli::replay::execute(recording, format),

        Commands::Simulate {
            games,
            seed,
            threads,
            players,
            rounds,
            commands,
            format,
            progress,
        } => cli::simulate::execute(
            games,
            seed,
            threads,
            SimulationConfig {
                players,
                rounds,
                commands_per_round: commands,
            },
            config,
            format,
            progress,
        ),

        Commands::Keygen { seed, format } => cli::keygen::execute(seed, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
