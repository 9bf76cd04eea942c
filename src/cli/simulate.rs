//! Simulate command implementation.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use shroud::simulate::{SimulationConfig, run_simulation};

use super::output::format_simulation;
use super::{OutputFormat, load_config, print_json, resolve_seed};

/// Execute the simulate command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any game is dirty.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute(
    games: u64,
    seed: Option<u64>,
    threads: Option<usize>,
    sim: SimulationConfig,
    config: Option<PathBuf>,
    format: OutputFormat,
    progress: bool,
) -> Result<()> {
    let config = load_config(config.as_deref())?;

    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let base_seed = resolve_seed(seed);

    let bar = if progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("invalid progress template")?,
        );
        bar.set_message(format!("simulating {games} games"));
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(bar)
    } else {
        None
    };

    let start = Instant::now();
    let stats = run_simulation(games, base_seed, &sim, &config)?;
    let seconds = start.elapsed().as_secs_f64();

    if let Some(bar) = bar {
        bar.finish_with_message(format!("{} games done", stats.games_played));
    }

    match format {
        OutputFormat::Text => {
            println!("Base seed: {base_seed}");
            print!("{}", format_simulation(&stats, seconds));
        }
        OutputFormat::Json => print_json(&stats)?,
    }

    if stats.dirty_games > 0 {
        bail!("{} of {} games failed checks", stats.dirty_games, stats.games_played);
    }
    Ok(())
}
