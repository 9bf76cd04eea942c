//! Demo command implementation.
//!
//! Plays a short scripted game: everyone joins, the game starts, player 0
//! finds two of its territories from its own decoded view, deploys onto one
//! and moves a troop to the other, then a round is credited. Each player's
//! view of the result is printed.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use shroud::ledger::Transaction;
use shroud::{Engine, FheBackend, Ledger, Owner, SimulatedFhe};
use tracing::info;

use super::output::format_player_view;
use super::{OutputFormat, load_config, player_view, print_json, resolve_seed, session_wallet};

/// Execute the demo command.
///
/// # Errors
///
/// Returns an error if the config is invalid or a scripted step is rejected.
pub(crate) fn execute(
    players: usize,
    seed: Option<u64>,
    config: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let seed = resolve_seed(seed);
    let engine = Engine::new(SimulatedFhe::from_seed(seed), config)?;
    let mut ledger = Ledger::new(engine);
    let wallets: Vec<_> = (0..players).map(|i| session_wallet(seed, i)).collect();
    info!(seed, players, "demo starting");

    let game = ledger.engine().game_counter();
    let mut script = vec![(0, Transaction::CreateGame)];
    script.extend((1..players).map(|i| (i, Transaction::JoinGame { game })));
    script.push((0, Transaction::StartGame { game }));
    for (player, transaction) in script {
        let receipt = ledger.submit(wallets[player].address(), transaction);
        if !receipt.is_accepted() {
            bail!("setup step {} rejected: {:?}", receipt.sequence, receipt.outcome);
        }
    }

    let opening = player_view(ledger.engine(), game, 0, &wallets[0], 0)?;
    let owned: Vec<u32> = opening
        .territories
        .iter()
        .filter(|t| t.owner == Owner::Owned(0))
        .filter_map(|t| u32::try_from(t.id).ok())
        .collect();
    let (&first, &second) = owned
        .first()
        .zip(owned.get(1))
        .context("player 0 was dealt fewer than two territories")?;

    let backend = ledger.engine().backend().clone();
    ledger.submit(
        wallets[0].address(),
        Transaction::DeployTroops {
            game,
            territory: backend.encrypt(first),
            amount: backend.encrypt(2),
        },
    );
    ledger.submit(
        wallets[0].address(),
        Transaction::MoveTroops {
            game,
            from: backend.encrypt(first),
            to: backend.encrypt(second),
            amount: backend.encrypt(1),
        },
    );
    ledger.submit(wallets[0].address(), Transaction::AdvanceRound { game });

    let mut views = Vec::with_capacity(players);
    for (index, wallet) in wallets.iter().enumerate() {
        let index = u8::try_from(index).context("player index out of range")?;
        let timestamp = ledger.context(wallet.address()).timestamp;
        views.push(player_view(ledger.engine(), game, index, wallet, timestamp)?);
    }

    match format {
        OutputFormat::Text => {
            println!("Demo game {game} (seed {seed}), {players} players");
            println!(
                "Player 0 deployed 2 onto territory {first} and moved 1 to territory {second}"
            );
            println!();
            for view in &views {
                print!("{}", format_player_view(view));
                println!();
            }
        }
        OutputFormat::Json => print_json(&views)?,
    }
    Ok(())
}
