//! End-to-end game scenarios through the public API.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use shroud::config::{RulesConfig, VisibilityPolicy};
use shroud::game::{MASKED_OWNER, NEUTRAL_OWNER};
use shroud::{
    Engine, EngineConfig, EngineError, FheBackend, GameId, GameStatus, Owner, SimulatedFhe,
    TerritoryView, TxContext, Wallet,
};

struct Table {
    engine: Engine<SimulatedFhe>,
    wallets: Vec<Wallet>,
    game: GameId,
    clock: u64,
}

impl Table {
    fn new(players: usize, config: EngineConfig) -> Self {
        let engine = Engine::new(SimulatedFhe::from_seed(2024), config).unwrap();
        let wallets = (0..players)
            .map(|i| Wallet::from_seed(&[u8::try_from(i + 1).unwrap(); 32]))
            .collect();
        let mut table = Self {
            engine,
            wallets,
            game: 0,
            clock: 0,
        };
        let tx = table.tx(0);
        table.game = table.engine.create_game(&tx);
        for i in 1..players {
            let tx = table.tx(i);
            table.engine.join_game(&tx, table.game).unwrap();
        }
        table
    }

    fn started(players: usize) -> Self {
        Self::started_with(players, EngineConfig::default())
    }

    fn started_with(players: usize, config: EngineConfig) -> Self {
        let mut table = Self::new(players, config);
        let tx = table.tx(0);
        table.engine.start_game(&tx, table.game).unwrap();
        table
    }

    fn tx(&mut self, player: usize) -> TxContext {
        self.clock += 1;
        TxContext::new(self.wallets[player].address(), self.clock)
    }

    fn board(&mut self, player: usize) -> Vec<TerritoryView> {
        let tx = self.tx(player);
        let wallet = &self.wallets[player];
        let token = wallet.view_token(self.engine.domain()).unwrap();
        let readings = self.engine.view_board(&tx, self.game, &token).unwrap();
        wallet.decode_board(&readings).unwrap()
    }

    fn reinforcements(&mut self, player: usize) -> u32 {
        let tx = self.tx(player);
        let wallet = &self.wallets[player];
        let token = wallet.view_token(self.engine.domain()).unwrap();
        let sealed = self.engine.view_total_soldiers(&tx, self.game, &token).unwrap();
        wallet.open(&sealed).unwrap()
    }

    fn balance(&mut self, player: usize) -> u32 {
        let tx = self.tx(player);
        let wallet = &self.wallets[player];
        let token = wallet.view_token(self.engine.domain()).unwrap();
        let sealed = self.engine.view_balance(&tx, self.game, &token).unwrap();
        wallet.open(&sealed).unwrap()
    }

    fn owned_by(&mut self, player: usize) -> Vec<usize> {
        let index = u8::try_from(player).unwrap();
        self.board(player)
            .into_iter()
            .filter(|t| t.owner == Owner::Owned(index))
            .map(|t| t.id)
            .collect()
    }

    fn deploy(&mut self, player: usize, territory: u32, amount: u32) {
        let tx = self.tx(player);
        let backend = self.engine.backend().clone();
        self.engine
            .deploy_troops(&tx, self.game, &backend.encrypt(territory), &backend.encrypt(amount))
            .unwrap();
    }

    fn move_troops(&mut self, player: usize, from: u32, to: u32, amount: u32) {
        let tx = self.tx(player);
        let backend = self.engine.backend().clone();
        self.engine
            .move_troops(
                &tx,
                self.game,
                &backend.encrypt(from),
                &backend.encrypt(to),
                &backend.encrypt(amount),
            )
            .unwrap();
    }
}

fn as_u32(id: usize) -> u32 {
    u32::try_from(id).unwrap()
}

#[test]
fn test_create_join_start_credits_opening_round() {
    let mut table = Table::started(2);
    assert_eq!(table.engine.game(table.game).unwrap().status, GameStatus::Active);
    assert_eq!(table.engine.game_counter(), 1);
    assert_eq!(
        table.engine.get_player(table.game, 1).unwrap(),
        table.wallets[1].address()
    );

    for player in 0..2 {
        assert_eq!(table.balance(player), 10);
        assert_eq!(table.reinforcements(player), 5);
        assert_eq!(table.owned_by(player).len(), 15);
    }
}

#[test]
fn test_fog_of_war() {
    let mut table = Table::started(2);
    let alice = table.board(0);
    let bob_owned = table.owned_by(1);

    for view in &alice {
        match view.owner {
            Owner::Masked => {
                assert!(bob_owned.contains(&view.id));
                assert_eq!(view.troops, 0);
            }
            Owner::Owned(0) => assert_eq!(view.troops, 1),
            Owner::Neutral => assert!((1..=3).contains(&view.troops)),
            Owner::Owned(other) => panic!("alice decoded foreign owner {other}"),
        }
    }
    assert_eq!(alice.iter().filter(|v| v.owner == Owner::Masked).count(), 15);
}

#[test]
fn test_deploy_then_move() {
    let mut table = Table::started(2);
    let owned = table.owned_by(0);
    let (a, b) = (owned[0], owned[1]);

    table.deploy(0, as_u32(a), 2);
    assert_eq!(table.reinforcements(0), 3);
    assert_eq!(table.board(0)[a].troops, 3);

    table.move_troops(0, as_u32(a), as_u32(b), 1);
    let board = table.board(0);
    assert_eq!(board[a].troops, 2);
    assert_eq!(board[b].troops, 2);
}

#[test]
fn test_unowned_deploy_is_silent_noop() {
    let mut table = Table::started(2);
    let enemy = table.owned_by(1)[0];
    let before = table.board(1);

    table.deploy(0, as_u32(enemy), 3);
    table.deploy(0, 42, 3);

    assert_eq!(table.reinforcements(0), 5);
    assert_eq!(table.board(1), before);
}

#[test]
fn test_move_can_reinforce_neutral_or_enemy_by_default() {
    let mut table = Table::started(2);
    let mine = table.owned_by(0)[0];
    let enemy = table.owned_by(1)[0];
    let enemy_before = table.board(1)[enemy].troops;

    table.move_troops(0, as_u32(mine), as_u32(enemy), 1);

    assert_eq!(table.board(0)[mine].troops, 0);
    assert_eq!(table.board(1)[enemy].troops, enemy_before + 1);
    // Ownership never changes through moves.
    assert_eq!(table.board(1)[enemy].owner, Owner::Owned(1));
}

#[test]
fn test_owned_destination_rule() {
    let config = EngineConfig {
        rules: RulesConfig {
            require_owned_destination: true,
            ..RulesConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut table = Table::started_with(2, config);
    let mine = table.owned_by(0)[0];
    let enemy = table.owned_by(1)[0];

    table.move_troops(0, as_u32(mine), as_u32(enemy), 1);
    assert_eq!(table.board(0)[mine].troops, 1);
}

#[test]
fn test_adjacent_visibility_policy() {
    let config = EngineConfig {
        rules: RulesConfig {
            visibility: VisibilityPolicy::OwnedAndAdjacent,
            ..RulesConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut table = Table::started_with(2, config);
    let mine = table.owned_by(0);
    let board = table.board(0);

    for view in &board {
        let borders_mine = shroud::game::territories::neighbors(view.id).any(|n| mine.contains(&n));
        if view.owner == Owner::Masked {
            assert!(!borders_mine, "{} borders an owned territory", view.name);
        }
    }
}

#[test]
fn test_view_range_and_token_errors() {
    let mut table = Table::started(2);
    let tx = table.tx(0);
    let token = table.wallets[0].view_token(table.engine.domain()).unwrap();
    assert_eq!(
        table.engine.view_territory(&tx, table.game, 42, &token).err(),
        Some(EngineError::UnknownTerritory(42))
    );

    // Bob's token presented by Alice.
    let stolen = table.wallets[1].view_token(table.engine.domain()).unwrap();
    assert!(matches!(
        table.engine.view_territory(&tx, table.game, 0, &stolen),
        Err(EngineError::BadToken(_))
    ));
}

#[test]
fn test_raw_tags_at_the_wire() {
    let mut table = Table::started(2);
    let tx = table.tx(0);
    let wallet = &table.wallets[0];
    let token = wallet.view_token(table.engine.domain()).unwrap();
    let readings = table.engine.view_board(&tx, table.game, &token).unwrap();

    for reading in &readings {
        let tag = wallet.viewer().open(&reading.owner).unwrap();
        assert!(tag == 0 || tag == NEUTRAL_OWNER || tag == MASKED_OWNER);
    }
}

#[test]
fn test_lifecycle_errors() {
    let mut table = Table::new(3, EngineConfig::default());
    let game = table.game;

    let tx = table.tx(1);
    assert!(matches!(
        table.engine.join_game(&tx, game),
        Err(EngineError::AlreadyJoined { index: 1, .. })
    ));

    let tx = table.tx(2);
    assert_eq!(table.engine.join_game(&tx, 99), Err(EngineError::UnknownGame(99)));

    let tx = table.tx(0);
    table.engine.start_game(&tx, game).unwrap();
    let tx = table.tx(0);
    assert!(matches!(
        table.engine.start_game(&tx, game),
        Err(EngineError::InvalidState { .. })
    ));
    assert_eq!(
        table.engine.get_player(game, 3),
        Err(EngineError::UnknownPlayer { game })
    );
}

#[test]
fn test_roster_cap() {
    let config = EngineConfig {
        max_players: 2,
        ..EngineConfig::default()
    };
    let mut table = Table::new(2, config);
    let outsider = Wallet::from_seed(&[77; 32]);
    let tx = TxContext::new(outsider.address(), 100);
    assert!(matches!(
        table.engine.join_game(&tx, table.game),
        Err(EngineError::RosterFull { capacity: 2, .. })
    ));
}

#[test]
fn test_start_needs_two_players() {
    let mut table = Table::new(1, EngineConfig::default());
    let tx = table.tx(0);
    assert!(matches!(
        table.engine.start_game(&tx, table.game),
        Err(EngineError::NotEnoughPlayers { required: 2, joined: 1, .. })
    ));
    assert_eq!(table.engine.game(table.game).unwrap().status, GameStatus::Open);
}

#[test]
fn test_finished_game_is_inert() {
    let mut table = Table::started(2);
    let tx = table.tx(0);
    table.engine.finish_game(&tx, table.game).unwrap();

    let tx = table.tx(0);
    let backend = table.engine.backend().clone();
    let zero = backend.encrypt(0);
    assert!(matches!(
        table.engine.deploy_troops(&tx, table.game, &zero, &zero),
        Err(EngineError::InvalidState { actual: GameStatus::Finished, .. })
    ));
    let token = table.wallets[0].view_token(table.engine.domain()).unwrap();
    assert!(matches!(
        table.engine.view_board(&tx, table.game, &token),
        Err(EngineError::InvalidState { .. })
    ));
    assert!(table.engine.advance_round(&tx, table.game).is_err());
}

#[test]
fn test_games_are_isolated() {
    let mut table = Table::started(2);
    let first = table.game;

    let tx = table.tx(0);
    let second = table.engine.create_game(&tx);
    let tx = table.tx(1);
    table.engine.join_game(&tx, second).unwrap();
    let tx = table.tx(1);
    table.engine.start_game(&tx, second).unwrap();

    table.game = second;
    let target = table.owned_by(0)[0];
    table.deploy(0, as_u32(target), 5);
    assert_eq!(table.reinforcements(0), 0);

    table.game = first;
    assert_eq!(table.reinforcements(0), 5);
}

#[test]
fn test_known_territories_against_roster() {
    let mut table = Table::started(2);
    let tx = table.tx(0);
    let wallet = &table.wallets[0];
    let token = wallet.view_token(table.engine.domain()).unwrap();
    let readings = table.engine.view_board(&tx, table.game, &token).unwrap();
    let roster = &table.engine.game(table.game).unwrap().players;

    let known = wallet.known_territories(&readings, roster).unwrap();
    // Bob's 15 territories are masked and dropped.
    assert_eq!(known.len(), 27);
    assert_eq!(known.iter().filter(|t| t.ours).count(), 15);
    for territory in &known {
        assert_eq!(territory.ours, territory.owner.is_some());
        if territory.ours {
            assert_eq!(territory.owner, Some(wallet.address()));
        }
    }
}
