//! Error types for the game engine.

use thiserror::Error;

use crate::game::{GameId, GameStatus, PlayerIndex};

/// Errors surfaced synchronously by engine operations.
///
/// Every variant aborts the call with no state change. Ownership checks
/// evaluated over ciphertexts never produce one of these: they degrade to
/// no-ops instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A lifecycle operation was attempted from the wrong state.
    #[error("game {game} is {actual:?}, expected {expected:?}")]
    InvalidState {
        /// The game the call targeted.
        game: GameId,
        /// The state the operation requires.
        expected: GameStatus,
        /// The state the game is actually in.
        actual: GameStatus,
    },
    /// The roster already holds the maximum number of players.
    #[error("game {game} roster is full ({capacity} players)")]
    RosterFull {
        /// The game the call targeted.
        game: GameId,
        /// Configured player cap.
        capacity: usize,
    },
    /// The address is already on this game's roster.
    #[error("address already joined game {game} as player {index}")]
    AlreadyJoined {
        /// The game the call targeted.
        game: GameId,
        /// Index the address already holds.
        index: PlayerIndex,
    },
    /// The roster is too small to start.
    #[error("game {game} needs {required} players to start, has {joined}")]
    NotEnoughPlayers {
        /// The game the call targeted.
        game: GameId,
        /// Configured minimum.
        required: usize,
        /// Current roster size.
        joined: usize,
    },
    /// No game exists with this identifier.
    #[error("unknown game {0}")]
    UnknownGame(GameId),
    /// Player index out of range, or caller not on the roster.
    #[error("unknown player in game {game}")]
    UnknownPlayer {
        /// The game the call targeted.
        game: GameId,
    },
    /// Plaintext territory identifier out of range.
    #[error("unknown territory {0}")]
    UnknownTerritory(usize),
    /// View token signature invalid or bound to another domain.
    #[error("view token rejected: {0}")]
    BadToken(&'static str),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from loading or validating an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field holds a value the engine cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors from unsealing a re-encrypted value on the client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SealError {
    /// The recipient public key is not a valid curve point.
    #[error("malformed re-encryption key")]
    MalformedKey,
    /// The sealed value was not produced for this key, or was altered.
    #[error("sealed value failed authentication")]
    Authentication,
}
