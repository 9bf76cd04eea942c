//! In-process transaction ordering and recordings.
//!
//! A [`Ledger`] stands in for the consensus layer: it stamps every submitted
//! transaction with a sequence number and timestamp, applies it to the
//! engine and keeps a [`Receipt`]. The log can be saved as a JSON
//! [`Recording`] and replayed against a fresh engine; because the deal is a
//! keyed function of `(game id, timestamp)`, replaying with the same backend
//! key reproduces the same games and the same receipts.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::{Engine, TxContext};
use crate::error::{ConfigError, EngineResult};
use crate::fhe::FheBackend;
use crate::game::{Address, GameId, PlayerIndex};

/// A state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transaction<C> {
    /// Open a new game.
    CreateGame,
    /// Join an open game.
    JoinGame {
        /// Target game.
        game: GameId,
    },
    /// Start an open game.
    StartGame {
        /// Target game.
        game: GameId,
    },
    /// Credit the next round.
    AdvanceRound {
        /// Target game.
        game: GameId,
    },
    /// End an active game.
    FinishGame {
        /// Target game.
        game: GameId,
    },
    /// Deploy reinforcements.
    DeployTroops {
        /// Target game.
        game: GameId,
        /// Encrypted territory id.
        territory: C,
        /// Encrypted troop count.
        amount: C,
    },
    /// Move troops between territories.
    MoveTroops {
        /// Target game.
        game: GameId,
        /// Encrypted source territory id.
        from: C,
        /// Encrypted destination territory id.
        to: C,
        /// Encrypted troop count.
        amount: C,
    },
}

/// A transaction as ordered by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry<C> {
    /// Position in the log.
    pub sequence: u64,
    /// Caller and timestamp.
    pub context: TxContext,
    /// The call.
    pub transaction: Transaction<C>,
}

/// Plaintext result of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// A game was created.
    Created(GameId),
    /// The caller joined at this index.
    Joined(PlayerIndex),
    /// The game started.
    Started,
    /// This round was credited.
    RoundCredited(u32),
    /// The game finished.
    Finished,
    /// A command was evaluated. Says nothing about its effect.
    Applied,
    /// The engine rejected the call; state is unchanged.
    Rejected(String),
}

/// Receipt for one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Sequence of the entry.
    pub sequence: u64,
    /// Caller.
    pub sender: Address,
    /// Result.
    pub outcome: Outcome,
}

impl Receipt {
    /// Whether the engine accepted the call.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        !matches!(self.outcome, Outcome::Rejected(_))
    }
}

/// Errors from saving, loading and replaying recordings.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// File access failed.
    #[error("recording I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The recording is not valid JSON for this schema.
    #[error("malformed recording: {0}")]
    Json(#[from] serde_json::Error),
    /// The recorded engine configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Replay produced a different receipt than recorded.
    #[error("replay diverged at sequence {sequence}: recorded {recorded:?}, replayed {replayed:?}")]
    Diverged {
        /// First differing entry.
        sequence: u64,
        /// Outcome in the recording.
        recorded: Outcome,
        /// Outcome on replay.
        replayed: Outcome,
    },
    /// Entries and receipts do not pair up one to one.
    #[error("recording has {entries} entries but {receipts} receipts")]
    Truncated {
        /// Recorded entries.
        entries: usize,
        /// Recorded receipts.
        receipts: usize,
    },
    /// An entry and its receipt carry different sequence numbers.
    #[error("entry {entry} is paired with receipt {receipt}")]
    Misordered {
        /// Sequence on the entry.
        entry: u64,
        /// Sequence on the receipt.
        receipt: u64,
    },
}

/// Everything needed to replay a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "C: Serialize", deserialize = "C: DeserializeOwned"))]
pub struct Recording<C> {
    /// Seed the simulated backend key was derived from.
    pub seed: u64,
    /// Engine configuration.
    pub config: EngineConfig,
    /// Ordered transactions.
    pub entries: Vec<LedgerEntry<C>>,
    /// Receipts produced when recorded.
    pub receipts: Vec<Receipt>,
}

impl<C: Serialize + DeserializeOwned> Recording<C> {
    /// Save as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Load from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Ordered log in front of an [`Engine`].
#[derive(Debug)]
pub struct Ledger<B: FheBackend> {
    engine: Engine<B>,
    clock: u64,
    entries: Vec<LedgerEntry<B::Ciphertext>>,
    receipts: Vec<Receipt>,
}

impl<B: FheBackend> Ledger<B> {
    /// Wrap an engine. The clock starts at zero.
    #[must_use]
    pub const fn new(engine: Engine<B>) -> Self {
        Self {
            engine,
            clock: 0,
            entries: Vec::new(),
            receipts: Vec::new(),
        }
    }

    /// The engine, for views and plaintext queries.
    #[must_use]
    pub const fn engine(&self) -> &Engine<B> {
        &self.engine
    }

    /// Context a read issued by `sender` right now would carry.
    #[must_use]
    pub const fn context(&self, sender: Address) -> TxContext {
        TxContext::new(sender, self.clock)
    }

    /// Receipts so far.
    #[must_use]
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Order, timestamp and apply a transaction.
    pub fn submit(&mut self, sender: Address, transaction: Transaction<B::Ciphertext>) -> &Receipt {
        self.clock += 1;
        let entry = LedgerEntry {
            sequence: self.entries.len() as u64,
            context: TxContext::new(sender, self.clock),
            transaction,
        };
        self.apply(entry)
    }

    fn apply(&mut self, entry: LedgerEntry<B::Ciphertext>) -> &Receipt {
        self.clock = self.clock.max(entry.context.timestamp);
        let outcome = match execute(&mut self.engine, &entry.context, &entry.transaction) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(sequence = entry.sequence, %error, "transaction rejected");
                Outcome::Rejected(error.to_string())
            }
        };
        debug!(sequence = entry.sequence, ?outcome, "transaction applied");

        self.receipts.push(Receipt {
            sequence: entry.sequence,
            sender: entry.context.sender,
            outcome,
        });
        self.entries.push(entry);
        let last = self.receipts.len() - 1;
        &self.receipts[last]
    }

    /// Snapshot the log as a recording.
    #[must_use]
    pub fn recording(&self, seed: u64) -> Recording<B::Ciphertext> {
        Recording {
            seed,
            config: self.engine.config().clone(),
            entries: self.entries.clone(),
            receipts: self.receipts.clone(),
        }
    }

    /// Replay `recording` against a fresh engine over `backend`, checking
    /// every receipt.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Config`] for a bad recorded config,
    /// [`LedgerError::Truncated`] or [`LedgerError::Misordered`] if entries
    /// and receipts do not pair up, or [`LedgerError::Diverged`] at the
    /// first receipt that differs.
    pub fn replay(backend: B, recording: Recording<B::Ciphertext>) -> Result<Self, LedgerError> {
        if recording.entries.len() != recording.receipts.len() {
            return Err(LedgerError::Truncated {
                entries: recording.entries.len(),
                receipts: recording.receipts.len(),
            });
        }
        let engine = Engine::new(backend, recording.config)?;
        let mut ledger = Self::new(engine);

        for (entry, recorded) in recording.entries.into_iter().zip(recording.receipts) {
            let expected = ledger.entries.len() as u64;
            if entry.sequence != recorded.sequence || entry.sequence != expected {
                return Err(LedgerError::Misordered {
                    entry: entry.sequence,
                    receipt: recorded.sequence,
                });
            }
            let replayed = ledger.apply(entry);
            if replayed.outcome != recorded.outcome {
                return Err(LedgerError::Diverged {
                    sequence: recorded.sequence,
                    recorded: recorded.outcome,
                    replayed: replayed.outcome.clone(),
                });
            }
        }
        Ok(ledger)
    }
}

fn execute<B: FheBackend>(
    engine: &mut Engine<B>,
    tx: &TxContext,
    transaction: &Transaction<B::Ciphertext>,
) -> EngineResult<Outcome> {
    Ok(match transaction {
        Transaction::CreateGame => Outcome::Created(engine.create_game(tx)),
        Transaction::JoinGame { game } => Outcome::Joined(engine.join_game(tx, *game)?),
        Transaction::StartGame { game } => {
            engine.start_game(tx, *game)?;
            Outcome::Started
        }
        Transaction::AdvanceRound { game } => Outcome::RoundCredited(engine.advance_round(tx, *game)?),
        Transaction::FinishGame { game } => {
            engine.finish_game(tx, *game)?;
            Outcome::Finished
        }
        Transaction::DeployTroops {
            game,
            territory,
            amount,
        } => {
            engine.deploy_troops(tx, *game, territory, amount)?;
            Outcome::Applied
        }
        Transaction::MoveTroops {
            game,
            from,
            to,
            amount,
        } => {
            engine.move_troops(tx, *game, from, to, amount)?;
            Outcome::Applied
        }
    })
}
