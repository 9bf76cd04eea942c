//! Game layer for Shroud.
//!
//! Implements the rules over encrypted state:
//! - Registry of games, rosters and lifecycle
//! - Board of 42 encrypted territories and the initial deal
//! - Economy (round bonuses into balances and reinforcement pools)
//! - Deploy and move commands over encrypted operands
//! - Audit invariants

mod board;
mod commands;
mod economy;
pub mod invariants;
mod registry;
pub mod territories;

pub use board::{DealPlan, MASKED_OWNER, NEUTRAL_OWNER, Owner, Territory, TerritoryBoard};
pub use commands::{deploy_troops, hit_masks, move_troops, owns_any};
pub use economy::{PlayerAccount, owned_territories, round_bonus, round_bonuses};
pub use registry::{Address, Game, GameId, GameRegistry, GameStatus, PlayerIndex};
pub use territories::{TERRITORY_COUNT, TerritoryId};
