//! Encrypted player accounts and round credits.
//!
//! Ownership is encrypted, so a player's territory count is itself a
//! ciphertext: `Σ eq(owner_i, player)` over the board. The round bonus is
//! derived from it without ever leaving ciphertext space:
//!
//! ```text
//! bonus          = max(min_reinforcements, owned / territories_per_reinforcement)
//! reinforcements += bonus
//! balance        += bonus × income_per_reinforcement
//! ```
//!
//! Balances only grow here; commands are the only debits.

use rayon::prelude::*;

use crate::config::EconomyConfig;
use crate::fhe::FheBackend;
use crate::game::{PlayerIndex, TerritoryBoard};

/// A player's encrypted resources in one game.
#[derive(Debug, Clone)]
pub struct PlayerAccount<C> {
    /// Spendable resource.
    pub balance: C,
    /// Troops available to deploy.
    pub reinforcements: C,
}

impl<C> PlayerAccount<C> {
    /// Empty account: zero balance, zero reinforcements.
    pub fn opening<B>(backend: &B) -> Self
    where
        B: FheBackend<Ciphertext = C>,
    {
        Self {
            balance: backend.trivial(0),
            reinforcements: backend.trivial(0),
        }
    }

    /// Add a round bonus to both pools.
    pub fn credit<B>(&mut self, backend: &B, bonus: &C, config: &EconomyConfig)
    where
        B: FheBackend<Ciphertext = C>,
    {
        let income = backend.mul_scalar(bonus, config.income_per_reinforcement);
        self.reinforcements = backend.add(&self.reinforcements, bonus);
        self.balance = backend.add(&self.balance, &income);
    }
}

/// Encrypted count of territories owned by `player`.
pub fn owned_territories<B>(
    backend: &B,
    board: &TerritoryBoard<B::Ciphertext>,
    player: PlayerIndex,
) -> B::Ciphertext
where
    B: FheBackend,
{
    let me = backend.trivial(u32::from(player));
    let hits: Vec<_> = board
        .territories()
        .iter()
        .map(|territory| backend.equal(&territory.owner, &me))
        .collect();
    backend.sum(&hits)
}

/// Encrypted round bonus for `player`.
pub fn round_bonus<B>(
    backend: &B,
    board: &TerritoryBoard<B::Ciphertext>,
    player: PlayerIndex,
    config: &EconomyConfig,
) -> B::Ciphertext
where
    B: FheBackend,
{
    let owned = owned_territories(backend, board, player);
    let earned = backend.div_scalar(&owned, config.territories_per_reinforcement);
    backend.maximum(&earned, &backend.trivial(config.min_reinforcements))
}

/// Round bonuses for players `0..players`, evaluated in parallel.
pub fn round_bonuses<B>(
    backend: &B,
    board: &TerritoryBoard<B::Ciphertext>,
    players: usize,
    config: &EconomyConfig,
) -> Vec<B::Ciphertext>
where
    B: FheBackend,
{
    (0..players)
        .into_par_iter()
        .filter_map(|p| PlayerIndex::try_from(p).ok())
        .map(|player| round_bonus(backend, board, player, config))
        .collect()
}
