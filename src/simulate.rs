//! Randomized soak runs.
//!
//! Provides a pure function interface: `(seed, config) -> GameReport`.
//! Each game drives a full lifecycle through a [`Ledger`] with random,
//! frequently invalid commands, auditing invariants and troop conservation
//! after every step. Games are independent and run in parallel with rayon
//! using a fold/reduce over per-thread [`SimulationStats`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::client::Wallet;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::ConfigError;
use crate::fhe::{FheBackend, SimulatedFhe};
use crate::game::{GameId, TERRITORY_COUNT};
use crate::ledger::{Ledger, Transaction};

/// Shape of each simulated game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulationConfig {
    /// Players per game.
    pub players: usize,
    /// Rounds credited after the opening one.
    pub rounds: u32,
    /// Random commands issued per round.
    pub commands_per_round: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            players: 3,
            rounds: 3,
            commands_per_round: 8,
        }
    }
}

/// Result of one simulated game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameReport {
    /// Seed the game ran under.
    pub seed: u64,
    /// Commands submitted.
    pub commands: u64,
    /// Transactions the engine rejected.
    pub rejected: u64,
    /// Invariant violations, as messages.
    pub violations: Vec<String>,
    /// Commands after which the troop total changed.
    pub conservation_failures: u64,
    /// Troops on the board and in pools at the end.
    pub final_troops: u64,
}

impl GameReport {
    /// No rejections, violations or conservation failures.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected == 0 && self.violations.is_empty() && self.conservation_failures == 0
    }
}

/// Aggregate over many games.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationStats {
    /// Games completed.
    pub games_played: u64,
    /// Games with any failure.
    pub dirty_games: u64,
    /// Commands submitted across all games.
    pub commands: u64,
    /// Rejected transactions across all games.
    pub rejected: u64,
    /// Invariant violations across all games.
    pub violations: u64,
    /// Conservation failures across all games.
    pub conservation_failures: u64,
    /// Seeds of the first few dirty games.
    pub dirty_seeds: Vec<u64>,
}

const MAX_DIRTY_SEEDS: usize = 16;

impl SimulationStats {
    /// Fold one game in.
    pub fn add_report(&mut self, report: &GameReport) {
        self.games_played += 1;
        self.commands += report.commands;
        self.rejected += report.rejected;
        self.violations += report.violations.len() as u64;
        self.conservation_failures += report.conservation_failures;
        if !report.is_clean() {
            self.dirty_games += 1;
            if self.dirty_seeds.len() < MAX_DIRTY_SEEDS {
                self.dirty_seeds.push(report.seed);
            }
        }
    }

    /// Merge another thread's stats.
    pub fn merge(&mut self, other: &Self) {
        self.games_played += other.games_played;
        self.dirty_games += other.dirty_games;
        self.commands += other.commands;
        self.rejected += other.rejected;
        self.violations += other.violations;
        self.conservation_failures += other.conservation_failures;
        let room = MAX_DIRTY_SEEDS.saturating_sub(self.dirty_seeds.len());
        self.dirty_seeds
            .extend(other.dirty_seeds.iter().take(room).copied());
    }
}

/// Play one randomized game.
///
/// # Errors
///
/// Returns [`ConfigError`] if `engine_config` is invalid or cannot seat
/// `sim.players`.
pub fn run_game(
    seed: u64,
    sim: &SimulationConfig,
    engine_config: &EngineConfig,
) -> Result<GameReport, ConfigError> {
    if sim.players < engine_config.min_players || sim.players > engine_config.max_players {
        return Err(ConfigError::Invalid(format!(
            "{} players outside {}..={}",
            sim.players, engine_config.min_players, engine_config.max_players
        )));
    }

    let engine = Engine::new(SimulatedFhe::from_seed(seed), engine_config.clone())?;
    let mut ledger = Ledger::new(engine);
    let mut rng = StdRng::seed_from_u64(seed);
    let wallets: Vec<Wallet> = (0..sim.players)
        .map(|i| {
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&seed.to_le_bytes());
            bytes[8..16].copy_from_slice(&(i as u64).to_le_bytes());
            Wallet::from_seed(&bytes)
        })
        .collect();

    let mut report = GameReport {
        seed,
        commands: 0,
        rejected: 0,
        violations: Vec::new(),
        conservation_failures: 0,
        final_troops: 0,
    };

    let game: GameId = ledger.engine().game_counter();
    ledger.submit(wallets[0].address(), Transaction::CreateGame);
    for wallet in &wallets[1..] {
        ledger.submit(wallet.address(), Transaction::JoinGame { game });
    }
    ledger.submit(wallets[0].address(), Transaction::StartGame { game });

    for round in 0..=sim.rounds {
        if round > 0 {
            let caller = wallets[rng.gen_range(0..wallets.len())].address();
            ledger.submit(caller, Transaction::AdvanceRound { game });
        }
        audit(&ledger, game, &mut report);

        for _ in 0..sim.commands_per_round {
            let before = ledger.engine().troop_total(game).unwrap_or(0);
            let caller = wallets[rng.gen_range(0..wallets.len())].address();
            let transaction = random_command(ledger.engine().backend(), &mut rng, game);
            ledger.submit(caller, transaction);
            report.commands += 1;

            let after = ledger.engine().troop_total(game).unwrap_or(0);
            if before != after {
                report.conservation_failures += 1;
            }
        }
        audit(&ledger, game, &mut report);
    }

    report.final_troops = ledger.engine().troop_total(game).unwrap_or(0);
    report.rejected = ledger
        .receipts()
        .iter()
        .filter(|r| !r.is_accepted())
        .count() as u64;
    debug!(seed, clean = report.is_clean(), "simulated game finished");
    Ok(report)
}

/// Run `games` games with consecutive seeds from `base_seed`, in parallel.
///
/// # Errors
///
/// Returns [`ConfigError`] if the configuration cannot run a game.
pub fn run_simulation(
    games: u64,
    base_seed: u64,
    sim: &SimulationConfig,
    engine_config: &EngineConfig,
) -> Result<SimulationStats, ConfigError> {
    // Surface configuration problems once instead of per game.
    engine_config.validate()?;
    run_game(base_seed, &SimulationConfig { rounds: 0, commands_per_round: 0, ..*sim }, engine_config)?;

    Ok((0..games)
        .into_par_iter()
        .fold(SimulationStats::default, |mut stats, i| {
            if let Ok(report) = run_game(base_seed.wrapping_add(i), sim, engine_config) {
                stats.add_report(&report);
            }
            stats
        })
        .reduce(SimulationStats::default, |mut a, b| {
            a.merge(&b);
            a
        }))
}

/// A deploy or move with random operands. Ids run past the board so
/// out-of-range targets are exercised too.
#[allow(clippy::cast_possible_truncation)]
fn random_command<B: FheBackend>(
    backend: &B,
    rng: &mut StdRng,
    game: GameId,
) -> Transaction<B::Ciphertext> {
    let id_range = 0..TERRITORY_COUNT as u32 + 4;
    let amount = backend.encrypt(rng.gen_range(0..8));
    if rng.gen_bool(0.5) {
        Transaction::DeployTroops {
            game,
            territory: backend.encrypt(rng.gen_range(id_range)),
            amount,
        }
    } else {
        Transaction::MoveTroops {
            game,
            from: backend.encrypt(rng.gen_range(id_range.clone())),
            to: backend.encrypt(rng.gen_range(id_range)),
            amount,
        }
    }
}

fn audit(ledger: &Ledger<SimulatedFhe>, game: GameId, report: &mut GameReport) {
    match ledger.engine().audit_game(game) {
        Ok(violations) => report
            .violations
            .extend(violations.into_iter().map(|v| v.to_string())),
        Err(error) => report.violations.push(format!("audit failed: {error}")),
    }
}
