//! Output formatting utilities for CLI.

use std::fmt::Write as _;

use serde::Serialize;
use shroud::ledger::{Outcome, Receipt};
use shroud::simulate::SimulationStats;
use shroud::{Owner, TerritoryView};

/// One player's decoded view of a game.
#[derive(Debug, Serialize)]
pub(super) struct JsonPlayerView {
    /// Roster index.
    pub(super) player: u8,
    /// Account address.
    pub(super) address: String,
    /// Opened balance.
    pub(super) balance: u32,
    /// Opened reinforcement pool.
    pub(super) reinforcements: u32,
    /// Decoded territories.
    pub(super) territories: Vec<TerritoryView>,
}

fn owner_label(owner: Owner) -> String {
    match owner {
        Owner::Owned(index) => format!("P{index}"),
        Owner::Neutral => "neutral".to_string(),
        Owner::Masked => "?".to_string(),
    }
}

/// Format one player's view of the board as a table.
pub(super) fn format_player_view(view: &JsonPlayerView) -> String {
    let mut output = String::new();
    let visible = view.territories.iter().filter(|t| t.is_visible()).count();

    let _ = writeln!(output, "Player {} ({})", view.player, view.address);
    let _ = writeln!(
        output,
        "  balance {}  reinforcements {}  visible {visible}/{}",
        view.balance,
        view.reinforcements,
        view.territories.len()
    );
    for territory in &view.territories {
        let troops = if territory.is_visible() {
            territory.troops.to_string()
        } else {
            "-".to_string()
        };
        let _ = writeln!(
            output,
            "  {:>2} {:<22} {:>7} {:>4}",
            territory.id,
            territory.name,
            owner_label(territory.owner),
            troops
        );
    }
    output
}

/// Format receipts one per line.
pub(super) fn format_receipts(receipts: &[Receipt]) -> String {
    let mut output = String::new();
    for receipt in receipts {
        let outcome = match &receipt.outcome {
            Outcome::Created(game) => format!("created game {game}"),
            Outcome::Joined(index) => format!("joined as player {index}"),
            Outcome::Started => "started".to_string(),
            Outcome::RoundCredited(round) => format!("credited round {round}"),
            Outcome::Finished => "finished".to_string(),
            Outcome::Applied => "command applied".to_string(),
            Outcome::Rejected(reason) => format!("REJECTED: {reason}"),
        };
        let _ = writeln!(output, "  #{:<4} {:?} {outcome}", receipt.sequence, receipt.sender);
    }
    output
}

/// Format simulation statistics.
pub(super) fn format_simulation(stats: &SimulationStats, seconds: f64) -> String {
    let mut output = String::new();
    #[allow(clippy::cast_precision_loss)]
    let per_sec = if seconds > 0.0 {
        stats.games_played as f64 / seconds
    } else {
        0.0
    };

    let _ = writeln!(output, "Simulation Results");
    let _ = writeln!(output, "  Games:                 {}", stats.games_played);
    let _ = writeln!(output, "  Commands:              {}", stats.commands);
    let _ = writeln!(output, "  Rejected transactions: {}", stats.rejected);
    let _ = writeln!(output, "  Invariant violations:  {}", stats.violations);
    let _ = writeln!(output, "  Conservation failures: {}", stats.conservation_failures);
    let _ = writeln!(output, "  Dirty games:           {}", stats.dirty_games);
    if !stats.dirty_seeds.is_empty() {
        let seeds: Vec<String> = stats.dirty_seeds.iter().map(u64::to_string).collect();
        let _ = writeln!(output, "  Dirty seeds:           {}", seeds.join(", "));
    }
    let _ = writeln!(output, "Duration: {seconds:.2}s ({per_sec:.1} games/sec)");
    output
}
