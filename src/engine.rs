//! The transaction surface.
//!
//! [`Engine`] owns every game's encrypted state, keyed by game id, and
//! exposes one method per ledger transaction. Each method validates
//! everything it can in plaintext before touching state, so an `Err` always
//! leaves the engine unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError, EngineResult};
use crate::fhe::{AuditDecrypt, FheBackend, SealedValue};
use crate::game::invariants::{self, InvariantViolation};
use crate::game::{
    self, Address, DealPlan, Game, GameId, GameStatus, PlayerAccount, PlayerIndex,
    TERRITORY_COUNT, TerritoryBoard, TerritoryId,
};
use crate::view::{self, TerritoryReading, ViewDomain, ViewToken};

/// Ledger-supplied context for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    /// Authenticated caller.
    pub sender: Address,
    /// Ledger timestamp.
    pub timestamp: u64,
}

impl TxContext {
    /// Context for `sender` at `timestamp`.
    #[must_use]
    pub const fn new(sender: Address, timestamp: u64) -> Self {
        Self { sender, timestamp }
    }
}

/// Confidential game engine over backend `B`.
pub struct Engine<B: FheBackend> {
    backend: B,
    config: EngineConfig,
    domain: ViewDomain,
    registry: game::GameRegistry,
    boards: BTreeMap<GameId, TerritoryBoard<B::Ciphertext>>,
    accounts: BTreeMap<(GameId, PlayerIndex), PlayerAccount<B::Ciphertext>>,
}

impl<B: FheBackend> fmt::Debug for Engine<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("domain", &self.domain)
            .field("games", &self.registry.game_counter())
            .field("live_boards", &self.boards.len())
            .finish_non_exhaustive()
    }
}

impl<B: FheBackend> Engine<B> {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `config` fails validation.
    pub fn new(backend: B, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            backend,
            domain: ViewDomain::from(&config.domain),
            registry: game::GameRegistry::new(config.min_players, config.max_players),
            config,
            boards: BTreeMap::new(),
            accounts: BTreeMap::new(),
        })
    }

    /// The homomorphic backend, for encrypting command operands.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Domain view tokens must be signed for.
    #[must_use]
    pub const fn domain(&self) -> &ViewDomain {
        &self.domain
    }

    /// Identifier the next `create_game` will allocate.
    #[must_use]
    pub const fn game_counter(&self) -> GameId {
        self.registry.game_counter()
    }

    /// Plaintext metadata for a game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGame`].
    pub fn game(&self, id: GameId) -> EngineResult<&Game> {
        self.registry.game(id)
    }

    /// All games in id order.
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.registry.games()
    }

    /// Address of the player at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGame`] or [`EngineError::UnknownPlayer`].
    pub fn get_player(&self, id: GameId, index: PlayerIndex) -> EngineResult<Address> {
        self.registry.player(id, index)
    }

    /// Open a new game with the sender as player 0.
    pub fn create_game(&mut self, tx: &TxContext) -> GameId {
        let id = self.registry.create(tx.sender, tx.timestamp);
        info!(game = id, creator = %tx.sender, "game created");
        id
    }

    /// Add the sender to an open game's roster.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGame`], [`EngineError::InvalidState`],
    /// [`EngineError::AlreadyJoined`] or [`EngineError::RosterFull`].
    pub fn join_game(&mut self, tx: &TxContext, id: GameId) -> EngineResult<PlayerIndex> {
        let index = self.registry.join(id, tx.sender)?;
        info!(game = id, player = index, address = %tx.sender, "player joined");
        Ok(index)
    }

    /// Start a game: deal the board, open accounts and credit the first round.
    ///
    /// Any roster member may start the game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] unless open,
    /// [`EngineError::UnknownPlayer`] if the sender is not on the roster, or
    /// [`EngineError::NotEnoughPlayers`].
    pub fn start_game(&mut self, tx: &TxContext, id: GameId) -> EngineResult<()> {
        let game = self.registry.check_startable(id)?;
        if game.index_of(&tx.sender).is_none() {
            return Err(EngineError::UnknownPlayer { game: id });
        }
        let players = game.players.len();

        let mut context = Vec::with_capacity(16);
        context.extend_from_slice(&id.to_le_bytes());
        context.extend_from_slice(&tx.timestamp.to_le_bytes());
        let seed = self.backend.derive_seed(&context);
        let plan = DealPlan::deal(seed, players, &self.config.board);
        let board = TerritoryBoard::from_plan(&self.backend, &plan);

        self.registry.activate(id, tx.timestamp)?;
        for index in (0..players).filter_map(|p| PlayerIndex::try_from(p).ok()) {
            self.accounts
                .insert((id, index), PlayerAccount::opening(&self.backend));
        }
        self.boards.insert(id, board);
        self.credit_round(id, players);

        info!(
            game = id,
            players,
            per_player = DealPlan::territories_per_player(players, &self.config.board),
            "game started"
        );
        Ok(())
    }

    /// Credit the next round's bonuses to every player.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] unless active, or
    /// [`EngineError::UnknownPlayer`] if the sender is not on the roster.
    pub fn advance_round(&mut self, tx: &TxContext, id: GameId) -> EngineResult<u32> {
        let players = self.member(tx, id, GameStatus::Active)?.1;
        let round = self.registry.next_round(id)?;
        self.credit_round(id, players);
        info!(game = id, round, "round credited");
        Ok(round)
    }

    /// End a game and drop its encrypted state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] unless active, or
    /// [`EngineError::UnknownPlayer`] if the sender is not on the roster.
    pub fn finish_game(&mut self, tx: &TxContext, id: GameId) -> EngineResult<()> {
        self.member(tx, id, GameStatus::Active)?;
        self.registry.finish(id, tx.timestamp)?;
        self.boards.remove(&id);
        self.accounts.retain(|(game, _), _| *game != id);
        info!(game = id, "game finished");
        Ok(())
    }

    /// Deploy up to `amount` reinforcements onto the territory `territory`
    /// names. Silently does nothing unless the sender owns it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] unless active, or
    /// [`EngineError::UnknownPlayer`] if the sender is not on the roster.
    pub fn deploy_troops(
        &mut self,
        tx: &TxContext,
        id: GameId,
        territory: &B::Ciphertext,
        amount: &B::Ciphertext,
    ) -> EngineResult<()> {
        let (player, _) = self.member(tx, id, GameStatus::Active)?;
        let board = self.boards.get_mut(&id).ok_or(EngineError::UnknownGame(id))?;
        let account = self
            .accounts
            .get_mut(&(id, player))
            .ok_or(EngineError::UnknownPlayer { game: id })?;
        game::deploy_troops(&self.backend, board, account, player, territory, amount);
        debug!(game = id, player, "deploy evaluated");
        Ok(())
    }

    /// Move up to `amount` troops between the territories `from` and `to`
    /// name. Silently does nothing unless the move is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] unless active, or
    /// [`EngineError::UnknownPlayer`] if the sender is not on the roster.
    pub fn move_troops(
        &mut self,
        tx: &TxContext,
        id: GameId,
        from: &B::Ciphertext,
        to: &B::Ciphertext,
        amount: &B::Ciphertext,
    ) -> EngineResult<()> {
        let (player, _) = self.member(tx, id, GameStatus::Active)?;
        let rules = self.config.rules;
        let board = self.boards.get_mut(&id).ok_or(EngineError::UnknownGame(id))?;
        game::move_troops(&self.backend, board, player, from, to, amount, &rules);
        debug!(game = id, player, "move evaluated");
        Ok(())
    }

    /// One territory, masked and sealed for the sender.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTerritory`], [`EngineError::InvalidState`],
    /// [`EngineError::UnknownPlayer`] or [`EngineError::BadToken`].
    pub fn view_territory(
        &self,
        tx: &TxContext,
        id: GameId,
        territory: TerritoryId,
        token: &ViewToken,
    ) -> EngineResult<TerritoryReading> {
        if territory >= TERRITORY_COUNT {
            return Err(EngineError::UnknownTerritory(territory));
        }
        let (viewer, board) = self.authorized_board(tx, id, token)?;
        debug!(game = id, viewer, territory, "territory viewed");
        Ok(view::read_territory(
            &self.backend,
            board,
            territory,
            viewer,
            self.config.rules.visibility,
            &token.public_key,
        ))
    }

    /// All territories, masked and sealed for the sender.
    ///
    /// # Errors
    ///
    /// Same as [`view_territory`](Self::view_territory), minus the range check.
    pub fn view_board(
        &self,
        tx: &TxContext,
        id: GameId,
        token: &ViewToken,
    ) -> EngineResult<Vec<TerritoryReading>> {
        let (viewer, board) = self.authorized_board(tx, id, token)?;
        debug!(game = id, viewer, "board viewed");
        Ok(view::read_board(
            &self.backend,
            board,
            viewer,
            self.config.rules.visibility,
            &token.public_key,
        ))
    }

    /// The sender's balance, sealed to the token key.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`], [`EngineError::UnknownPlayer`]
    /// or [`EngineError::BadToken`].
    pub fn view_balance(
        &self,
        tx: &TxContext,
        id: GameId,
        token: &ViewToken,
    ) -> EngineResult<SealedValue> {
        let account = self.authorized_account(tx, id, token)?;
        Ok(self.backend.reencrypt(&account.balance, &token.public_key))
    }

    /// The sender's undeployed reinforcements, sealed to the token key.
    ///
    /// # Errors
    ///
    /// Same as [`view_balance`](Self::view_balance).
    pub fn view_total_soldiers(
        &self,
        tx: &TxContext,
        id: GameId,
        token: &ViewToken,
    ) -> EngineResult<SealedValue> {
        let account = self.authorized_account(tx, id, token)?;
        Ok(self
            .backend
            .reencrypt(&account.reinforcements, &token.public_key))
    }

    /// Encrypted board of an active game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGame`] or [`EngineError::InvalidState`].
    pub fn board(&self, id: GameId) -> EngineResult<&TerritoryBoard<B::Ciphertext>> {
        self.registry.game(id)?.require(GameStatus::Active)?;
        self.boards.get(&id).ok_or(EngineError::UnknownGame(id))
    }

    /// Encrypted accounts of an active game, in roster order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGame`] or [`EngineError::InvalidState`].
    pub fn accounts(&self, id: GameId) -> EngineResult<Vec<&PlayerAccount<B::Ciphertext>>> {
        self.registry.game(id)?.require(GameStatus::Active)?;
        Ok(self
            .accounts
            .range((id, 0)..=(id, PlayerIndex::MAX))
            .map(|(_, account)| account)
            .collect())
    }

    /// Roster index of the sender in a game in state `expected`, plus the
    /// roster size.
    fn member(
        &self,
        tx: &TxContext,
        id: GameId,
        expected: GameStatus,
    ) -> EngineResult<(PlayerIndex, usize)> {
        let game = self.registry.game(id)?;
        game.require(expected)?;
        let index = game
            .index_of(&tx.sender)
            .ok_or(EngineError::UnknownPlayer { game: id })?;
        Ok((index, game.players.len()))
    }

    fn authorized_board(
        &self,
        tx: &TxContext,
        id: GameId,
        token: &ViewToken,
    ) -> EngineResult<(PlayerIndex, &TerritoryBoard<B::Ciphertext>)> {
        let (viewer, _) = self.member(tx, id, GameStatus::Active)?;
        token.verify(&tx.sender, &self.domain)?;
        let board = self.boards.get(&id).ok_or(EngineError::UnknownGame(id))?;
        Ok((viewer, board))
    }

    fn authorized_account(
        &self,
        tx: &TxContext,
        id: GameId,
        token: &ViewToken,
    ) -> EngineResult<&PlayerAccount<B::Ciphertext>> {
        let (viewer, _) = self.member(tx, id, GameStatus::Active)?;
        token.verify(&tx.sender, &self.domain)?;
        self.accounts
            .get(&(id, viewer))
            .ok_or(EngineError::UnknownPlayer { game: id })
    }

    fn credit_round(&mut self, id: GameId, players: usize) {
        let Some(board) = self.boards.get(&id) else {
            return;
        };
        let economy = self.config.economy;
        let bonuses = game::round_bonuses(&self.backend, board, players, &economy);
        for (index, bonus) in bonuses.iter().enumerate() {
            let Ok(index) = PlayerIndex::try_from(index) else {
                continue;
            };
            if let Some(account) = self.accounts.get_mut(&(id, index)) {
                account.credit(&self.backend, bonus, &economy);
            }
        }
    }
}

impl<B: AuditDecrypt> Engine<B> {
    /// Decrypt and check one active game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGame`] or [`EngineError::InvalidState`].
    pub fn audit_game(&self, id: GameId) -> EngineResult<Vec<InvariantViolation>> {
        let board = self.board(id)?;
        let accounts = self.accounts(id)?;
        let players = self.registry.game(id)?.players.len();
        Ok(invariants::check_game(&self.backend, board, &accounts, players))
    }

    /// Troops on the board plus all reinforcement pools of an active game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGame`] or [`EngineError::InvalidState`].
    pub fn troop_total(&self, id: GameId) -> EngineResult<u64> {
        let board = self.board(id)?;
        let accounts = self.accounts(id)?;
        Ok(invariants::troop_total(&self.backend, board, &accounts))
    }
}
