// Allow unwrap and casts in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::cast_possible_truncation))]
//! Shroud: a confidential territory-control game engine.
//!
//! Every piece of board state (who owns a territory, how many troops sit on
//! it, what each player holds in reserve) is a ciphertext. The engine
//! evaluates the rules homomorphically and never sees plaintext; players
//! read their own slice of the board through signed view tokens that
//! re-encrypt results to a key only they hold.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Ledger (ordering, recordings)     │
//! ├─────────────────────────────────────┤
//! │   Engine (transactions, views)      │
//! ├─────────────────────────────────────┤
//! │   Game rules (board, economy,       │
//! │   commands, registry)               │
//! ├─────────────────────────────────────┤
//! │   FheBackend (homomorphic ops)      │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use shroud::{Engine, EngineConfig, SimulatedFhe, TxContext, Wallet};
//!
//! let mut engine = Engine::new(SimulatedFhe::generate(), EngineConfig::default()).unwrap();
//! let alice = Wallet::generate();
//! let bob = Wallet::generate();
//!
//! let game = engine.create_game(&TxContext::new(alice.address(), 1));
//! engine.join_game(&TxContext::new(bob.address(), 2), game).unwrap();
//! engine.start_game(&TxContext::new(alice.address(), 3), game).unwrap();
//!
//! let token = alice.view_token(engine.domain()).unwrap();
//! let sealed = engine
//!     .view_total_soldiers(&TxContext::new(alice.address(), 4), game, &token)
//!     .unwrap();
//! assert_eq!(alice.open(&sealed).unwrap(), 5);
//! ```

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod fhe;
pub mod game;
pub mod ledger;
pub mod simulate;
pub mod view;

pub use client::{KnownTerritory, TerritoryView, Wallet};
pub use config::EngineConfig;
pub use engine::{Engine, TxContext};
pub use error::{ConfigError, EngineError, EngineResult, SealError};
pub use fhe::{AuditDecrypt, FheBackend, SimCiphertext, SimulatedFhe};

// Re-export key game types at crate root for convenience
pub use game::{Address, GameId, GameStatus, Owner, PlayerIndex, TERRITORY_COUNT};
pub use ledger::{Ledger, Recording, Transaction};
pub use view::{TerritoryReading, ViewToken};
