//! Engine configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```json
//! { "max_players": 6, "economy": { "min_reinforcements": 2 } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::game::{NEUTRAL_OWNER, TERRITORY_COUNT};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Players required before `start_game` succeeds.
    pub min_players: usize,
    /// Roster cap.
    pub max_players: usize,
    /// Initial board dealing.
    pub board: BoardConfig,
    /// Round credits.
    pub economy: EconomyConfig,
    /// Command and visibility rules.
    pub rules: RulesConfig,
    /// Domain that view tokens must be signed for.
    pub domain: DomainConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 4,
            board: BoardConfig::default(),
            economy: EconomyConfig::default(),
            rules: RulesConfig::default(),
            domain: DomainConfig::default(),
        }
    }
}

/// How territories are dealt when a game starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Territories dealt to each player, capped at `42 / players`.
    pub starting_territories: usize,
    /// Troops placed on each dealt territory.
    pub starting_troops: u32,
    /// Neutral territories get `1..=max_neutral_troops` troops.
    pub max_neutral_troops: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            starting_territories: 15,
            starting_troops: 1,
            max_neutral_troops: 3,
        }
    }
}

/// Round credit parameters.
///
/// Each round a player receives
/// `bonus = max(min_reinforcements, owned / territories_per_reinforcement)`
/// reinforcements and `bonus * income_per_reinforcement` balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Owned territories per reinforcement.
    pub territories_per_reinforcement: u32,
    /// Floor on the per-round reinforcement bonus.
    pub min_reinforcements: u32,
    /// Balance credited per reinforcement.
    pub income_per_reinforcement: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            territories_per_reinforcement: 3,
            min_reinforcements: 3,
            income_per_reinforcement: 2,
        }
    }
}

/// Which territories a player may read in the clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityPolicy {
    /// Own and neutral territories.
    #[default]
    OwnedOnly,
    /// Also territories bordering an owned one.
    OwnedAndAdjacent,
}

/// Command and view rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Fog-of-war policy for `view_territory`.
    pub visibility: VisibilityPolicy,
    /// Require `move_troops` destinations to be owned by the mover.
    pub require_owned_destination: bool,
}

/// Parameters identifying this engine instance to view tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Application name.
    pub name: String,
    /// Protocol version.
    pub version: u32,
    /// Ledger chain identifier.
    pub chain_id: u64,
    /// Label of the deployed engine instance.
    pub verifying_engine: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: "Shroud".to_string(),
            version: 1,
            chain_id: 9090,
            verifying_engine: "shroud-local".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the engine can run with these values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players == 0 {
            return Err(ConfigError::Invalid("min_players must be at least 1".into()));
        }
        if self.max_players < self.min_players {
            return Err(ConfigError::Invalid(format!(
                "max_players {} is below min_players {}",
                self.max_players, self.min_players
            )));
        }
        // Player indices must stay clear of the sentinel tags.
        if self.max_players > NEUTRAL_OWNER as usize || self.max_players > TERRITORY_COUNT {
            return Err(ConfigError::Invalid(format!(
                "max_players {} leaves some player without a territory",
                self.max_players
            )));
        }
        if self.board.starting_territories == 0 {
            return Err(ConfigError::Invalid(
                "board.starting_territories must be at least 1".into(),
            ));
        }
        if self.board.max_neutral_troops == 0 {
            return Err(ConfigError::Invalid(
                "board.max_neutral_troops must be at least 1".into(),
            ));
        }
        if self.economy.territories_per_reinforcement == 0 {
            return Err(ConfigError::Invalid(
                "economy.territories_per_reinforcement must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
