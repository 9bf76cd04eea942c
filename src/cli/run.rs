//! Run command implementation.
//!
//! Executes a JSON script of plaintext steps. The CLI plays every wallet:
//! it encrypts command operands before submitting them, so the engine only
//! ever sees ciphertexts.
//!
//! ```json
//! [
//!   { "player": 0, "action": "create_game" },
//!   { "player": 1, "action": "join_game", "game": 0 },
//!   { "player": 0, "action": "start_game", "game": 0 },
//!   { "player": 0, "action": "deploy", "game": 0, "territory": 5, "amount": 2 },
//!   { "player": 1, "action": "view", "game": 0 }
//! ]
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use shroud::ledger::Transaction;
use shroud::{Engine, FheBackend, GameId, Ledger, SimulatedFhe};
use tracing::info;

use super::output::{JsonPlayerView, format_player_view, format_receipts};
use super::{OutputFormat, load_config, player_view, print_json, resolve_seed, session_wallet};

/// One step of a script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    CreateGame,
    JoinGame { game: GameId },
    StartGame { game: GameId },
    AdvanceRound { game: GameId },
    FinishGame { game: GameId },
    Deploy { game: GameId, territory: u32, amount: u32 },
    Move { game: GameId, from: u32, to: u32, amount: u32 },
    View { game: GameId },
}

#[derive(Debug, Clone, Deserialize)]
struct Step {
    player: usize,
    #[serde(flatten)]
    action: Action,
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the script cannot be read, a view fails, or the
/// recording cannot be saved. Rejected transactions are reported, not fatal.
pub(crate) fn execute(
    script: PathBuf,
    seed: Option<u64>,
    config: Option<PathBuf>,
    format: OutputFormat,
    save: Option<PathBuf>,
) -> Result<()> {
    let text = fs::read_to_string(&script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&text)
        .with_context(|| format!("parsing script {}", script.display()))?;

    let config = load_config(config.as_deref())?;
    let seed = resolve_seed(seed);
    let engine = Engine::new(SimulatedFhe::from_seed(seed), config)?;
    let backend = engine.backend().clone();
    let mut ledger = Ledger::new(engine);
    let wallet_count = steps.iter().map(|s| s.player + 1).max().unwrap_or(0);
    let wallets: Vec<_> = (0..wallet_count).map(|i| session_wallet(seed, i)).collect();
    info!(seed, steps = steps.len(), "running script");

    let mut views: Vec<JsonPlayerView> = Vec::new();
    for step in steps {
        let wallet = &wallets[step.player];
        let transaction = match step.action {
            Action::CreateGame => Transaction::CreateGame,
            Action::JoinGame { game } => Transaction::JoinGame { game },
            Action::StartGame { game } => Transaction::StartGame { game },
            Action::AdvanceRound { game } => Transaction::AdvanceRound { game },
            Action::FinishGame { game } => Transaction::FinishGame { game },
            Action::Deploy { game, territory, amount } => Transaction::DeployTroops {
                game,
                territory: backend.encrypt(territory),
                amount: backend.encrypt(amount),
            },
            Action::Move { game, from, to, amount } => Transaction::MoveTroops {
                game,
                from: backend.encrypt(from),
                to: backend.encrypt(to),
                amount: backend.encrypt(amount),
            },
            Action::View { game } => {
                let index = ledger
                    .engine()
                    .game(game)?
                    .index_of(&wallet.address())
                    .context("viewer is not on the roster")?;
                let timestamp = ledger.context(wallet.address()).timestamp;
                views.push(player_view(ledger.engine(), game, index, wallet, timestamp)?);
                continue;
            }
        };
        ledger.submit(wallet.address(), transaction);
    }

    if let Some(path) = save {
        ledger
            .recording(seed)
            .save(&path)
            .with_context(|| format!("saving recording {}", path.display()))?;
        info!(path = %path.display(), "recording saved");
    }

    match format {
        OutputFormat::Text => {
            println!("Script {} (seed {seed})", script.display());
            print!("{}", format_receipts(ledger.receipts()));
            for view in &views {
                println!();
                print!("{}", format_player_view(view));
            }
        }
        OutputFormat::Json => {
            #[derive(serde::Serialize)]
            struct RunResult<'a> {
                seed: u64,
                receipts: &'a [shroud::ledger::Receipt],
                views: &'a [JsonPlayerView],
            }
            print_json(&RunResult {
                seed,
                receipts: ledger.receipts(),
                views: &views,
            })?;
        }
    }
    Ok(())
}
