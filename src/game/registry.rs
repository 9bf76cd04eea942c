//! Game lifecycle and rosters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Game identifier, allocated from a monotonically increasing counter.
pub type GameId = u64;

/// Position of a player on a roster. Index 0 is the creator.
pub type PlayerIndex = u8;

/// Account identity: the bytes of the account's ed25519 verifying key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps logs readable.
        write!(f, "Address(0x{})", hex::encode(&self.0[..6]))
    }
}

/// Lifecycle state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// Accepting players.
    Open,
    /// Started; commands and views are accepted.
    Active,
    /// Ended; state is dropped and the game is inert.
    Finished,
}

/// Plaintext metadata for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Identifier.
    pub id: GameId,
    /// Lifecycle state.
    pub status: GameStatus,
    /// Roster in join order.
    pub players: Vec<Address>,
    /// Ledger timestamp of creation.
    pub created_at: u64,
    /// Ledger timestamp of `start_game`.
    pub started_at: Option<u64>,
    /// Ledger timestamp of `finish_game`.
    pub finished_at: Option<u64>,
    /// Rounds credited so far.
    pub round: u32,
}

impl Game {
    /// Roster index of `address`, if it joined.
    #[must_use]
    pub fn index_of(&self, address: &Address) -> Option<PlayerIndex> {
        self.players
            .iter()
            .position(|p| p == address)
            .and_then(|i| PlayerIndex::try_from(i).ok())
    }

    /// The creator (player 0).
    #[must_use]
    pub fn creator(&self) -> Option<&Address> {
        self.players.first()
    }

    /// Fail unless the game is in `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] on mismatch.
    pub fn require(&self, expected: GameStatus) -> EngineResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                game: self.id,
                expected,
                actual: self.status,
            })
        }
    }
}

/// All games known to the engine.
#[derive(Debug, Clone)]
pub struct GameRegistry {
    games: BTreeMap<GameId, Game>,
    next_id: GameId,
    max_players: usize,
    min_players: usize,
}

impl GameRegistry {
    /// Create an empty registry with the given roster bounds.
    #[must_use]
    pub fn new(min_players: usize, max_players: usize) -> Self {
        Self {
            games: BTreeMap::new(),
            next_id: 0,
            max_players,
            min_players,
        }
    }

    /// Identifier the next `create` will return.
    #[must_use]
    pub const fn game_counter(&self) -> GameId {
        self.next_id
    }

    /// Look up a game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGame`] if no game has this id.
    pub fn game(&self, id: GameId) -> EngineResult<&Game> {
        self.games.get(&id).ok_or(EngineError::UnknownGame(id))
    }

    fn game_mut(&mut self, id: GameId) -> EngineResult<&mut Game> {
        self.games.get_mut(&id).ok_or(EngineError::UnknownGame(id))
    }

    /// Iterate over all games in id order.
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }

    /// Register a new open game with `creator` as player 0.
    pub fn create(&mut self, creator: Address, timestamp: u64) -> GameId {
        let id = self.next_id;
        self.next_id += 1;
        self.games.insert(
            id,
            Game {
                id,
                status: GameStatus::Open,
                players: vec![creator],
                created_at: timestamp,
                started_at: None,
                finished_at: None,
                round: 0,
            },
        );
        id
    }

    /// Append `joiner` to an open game's roster.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGame`], [`EngineError::InvalidState`]
    /// when not open, [`EngineError::AlreadyJoined`], or
    /// [`EngineError::RosterFull`].
    pub fn join(&mut self, id: GameId, joiner: Address) -> EngineResult<PlayerIndex> {
        let max_players = self.max_players;
        let game = self.game_mut(id)?;
        game.require(GameStatus::Open)?;
        if let Some(index) = game.index_of(&joiner) {
            return Err(EngineError::AlreadyJoined { game: id, index });
        }
        if game.players.len() >= max_players {
            return Err(EngineError::RosterFull {
                game: id,
                capacity: max_players,
            });
        }
        let index = PlayerIndex::try_from(game.players.len()).map_err(|_| EngineError::RosterFull {
            game: id,
            capacity: max_players,
        })?;
        game.players.push(joiner);
        Ok(index)
    }

    /// Check that `id` may start, without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] unless open, or
    /// [`EngineError::NotEnoughPlayers`].
    pub fn check_startable(&self, id: GameId) -> EngineResult<&Game> {
        let game = self.game(id)?;
        game.require(GameStatus::Open)?;
        if game.players.len() < self.min_players {
            return Err(EngineError::NotEnoughPlayers {
                game: id,
                required: self.min_players,
                joined: game.players.len(),
            });
        }
        Ok(game)
    }

    /// Transition `Open → Active`.
    ///
    /// # Errors
    ///
    /// Same as [`check_startable`](Self::check_startable).
    pub fn activate(&mut self, id: GameId, timestamp: u64) -> EngineResult<&Game> {
        self.check_startable(id)?;
        let game = self.game_mut(id)?;
        game.status = GameStatus::Active;
        game.started_at = Some(timestamp);
        Ok(game)
    }

    /// Transition `Active → Finished`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] unless active.
    pub fn finish(&mut self, id: GameId, timestamp: u64) -> EngineResult<()> {
        let game = self.game_mut(id)?;
        game.require(GameStatus::Active)?;
        game.status = GameStatus::Finished;
        game.finished_at = Some(timestamp);
        Ok(())
    }

    /// Bump the round counter of an active game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] unless active.
    pub fn next_round(&mut self, id: GameId) -> EngineResult<u32> {
        let game = self.game_mut(id)?;
        game.require(GameStatus::Active)?;
        game.round += 1;
        Ok(game.round)
    }

    /// Address of the player at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownPlayer`] if `index` is past the roster.
    pub fn player(&self, id: GameId, index: PlayerIndex) -> EngineResult<Address> {
        self.game(id)?
            .players
            .get(usize::from(index))
            .copied()
            .ok_or(EngineError::UnknownPlayer { game: id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 32])
    }

    #[test]
    fn test_ids_increase() {
        let mut registry = GameRegistry::new(2, 4);
        assert_eq!(registry.game_counter(), 0);
        assert_eq!(registry.create(addr(1), 10), 0);
        assert_eq!(registry.create(addr(1), 11), 1);
        assert_eq!(registry.game_counter(), 2);
        assert_eq!(registry.games().count(), 2);
    }

    #[test]
    fn test_creator_is_player_zero() {
        let mut registry = GameRegistry::new(2, 4);
        let id = registry.create(addr(7), 0);
        assert_eq!(registry.player(id, 0).unwrap(), addr(7));
        assert_eq!(registry.game(id).unwrap().creator(), Some(&addr(7)));
        assert_eq!(registry.game(id).unwrap().status, GameStatus::Open);
    }

    #[test]
    fn test_join_appends_in_order() {
        let mut registry = GameRegistry::new(2, 4);
        let id = registry.create(addr(1), 0);
        assert_eq!(registry.join(id, addr(2)).unwrap(), 1);
        assert_eq!(registry.join(id, addr(3)).unwrap(), 2);
        assert_eq!(registry.game(id).unwrap().index_of(&addr(3)), Some(2));
    }

    #[test]
    fn test_roster_full() {
        let mut registry = GameRegistry::new(2, 2);
        let id = registry.create(addr(1), 0);
        registry.join(id, addr(2)).unwrap();
        assert_eq!(
            registry.join(id, addr(3)),
            Err(EngineError::RosterFull { game: id, capacity: 2 })
        );
    }

    #[test]
    fn test_double_join_rejected() {
        let mut registry = GameRegistry::new(2, 4);
        let id = registry.create(addr(1), 0);
        assert_eq!(
            registry.join(id, addr(1)),
            Err(EngineError::AlreadyJoined { game: id, index: 0 })
        );
    }

    #[test]
    fn test_join_unknown_game() {
        let mut registry = GameRegistry::new(2, 4);
        assert_eq!(registry.join(9, addr(1)), Err(EngineError::UnknownGame(9)));
    }

    #[test]
    fn test_start_once() {
        let mut registry = GameRegistry::new(2, 4);
        let id = registry.create(addr(1), 0);
        registry.join(id, addr(2)).unwrap();
        registry.activate(id, 5).unwrap();
        assert_eq!(registry.game(id).unwrap().started_at, Some(5));
        assert!(matches!(
            registry.activate(id, 6),
            Err(EngineError::InvalidState { actual: GameStatus::Active, .. })
        ));
        // Joining after start fails too.
        assert!(matches!(
            registry.join(id, addr(3)),
            Err(EngineError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_start_needs_min_players() {
        let mut registry = GameRegistry::new(2, 4);
        let id = registry.create(addr(1), 0);
        assert_eq!(
            registry.check_startable(id).err(),
            Some(EngineError::NotEnoughPlayers { game: id, required: 2, joined: 1 })
        );
    }

    #[test]
    fn test_finish_only_from_active() {
        let mut registry = GameRegistry::new(1, 4);
        let id = registry.create(addr(1), 0);
        assert!(registry.finish(id, 1).is_err());
        registry.activate(id, 1).unwrap();
        registry.finish(id, 2).unwrap();
        assert_eq!(registry.game(id).unwrap().status, GameStatus::Finished);
        assert!(registry.finish(id, 3).is_err());
        assert!(registry.next_round(id).is_err());
    }

    #[test]
    fn test_unknown_player_index() {
        let mut registry = GameRegistry::new(2, 4);
        let id = registry.create(addr(1), 0);
        assert_eq!(
            registry.player(id, 1),
            Err(EngineError::UnknownPlayer { game: id })
        );
    }

    #[test]
    fn test_address_display() {
        let text = addr(0xab).to_string();
        assert!(text.starts_with("0xabab"));
        assert_eq!(text.len(), 66);
    }
}
