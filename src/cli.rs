//! CLI command implementations for Shroud.

pub(crate) mod demo;
pub(crate) mod keygen;
pub(crate) mod replay;
pub(crate) mod run;
pub(crate) mod simulate;

mod output;

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use shroud::{Engine, EngineConfig, GameId, SimulatedFhe, TxContext, Wallet};

/// Output format shared by all commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Load the engine config from `path`, or defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Seed from the command line, or from the clock.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    })
}

/// Deterministic wallet number `index` for a session seed.
pub(crate) fn session_wallet(seed: u64, index: usize) -> Wallet {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..16].copy_from_slice(&(index as u64).to_le_bytes());
    bytes[16..].copy_from_slice(b"shroud-session-w");
    Wallet::from_seed(&bytes)
}

/// Emit a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{json}");
    Ok(())
}

/// Open everything `wallet` (player `index`) can see in `game`.
fn player_view(
    engine: &Engine<SimulatedFhe>,
    game: GameId,
    index: u8,
    wallet: &Wallet,
    timestamp: u64,
) -> Result<output::JsonPlayerView> {
    let tx = TxContext::new(wallet.address(), timestamp);
    let token = wallet
        .view_token(engine.domain())
        .context("signing view token")?;

    let readings = engine.view_board(&tx, game, &token)?;
    let balance = engine.view_balance(&tx, game, &token)?;
    let reinforcements = engine.view_total_soldiers(&tx, game, &token)?;

    Ok(output::JsonPlayerView {
        player: index,
        address: wallet.address().to_string(),
        balance: wallet.open(&balance)?,
        reinforcements: wallet.open(&reinforcements)?,
        territories: wallet.decode_board(&readings)?,
    })
}
