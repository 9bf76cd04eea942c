//! Property-based tests for the engine.
//!
//! Commands are generated with arbitrary (often invalid) plaintext operands
//! and checked against the audited state.
//! Run with: cargo test --release prop_engine

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use shroud::game::{NEUTRAL_OWNER, Owner};
use shroud::{AuditDecrypt, Engine, EngineConfig, FheBackend, SimulatedFhe, TxContext, Wallet};

#[derive(Debug, Clone)]
enum Op {
    Deploy { player: usize, territory: u32, amount: u32 },
    Move { player: usize, from: u32, to: u32, amount: u32 },
}

fn op_strategy(players: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..players, 0u32..50, 0u32..20).prop_map(|(player, territory, amount)| Op::Deploy {
            player,
            territory,
            amount
        }),
        (0..players, 0u32..50, 0u32..50, 0u32..20).prop_map(|(player, from, to, amount)| {
            Op::Move {
                player,
                from,
                to,
                amount,
            }
        }),
    ]
}

fn started(seed: u64, players: usize) -> (Engine<SimulatedFhe>, Vec<Wallet>) {
    let mut engine = Engine::new(SimulatedFhe::from_seed(seed), EngineConfig::default()).unwrap();
    let wallets: Vec<Wallet> = (0..players)
        .map(|i| {
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&seed.to_le_bytes());
            bytes[8] = u8::try_from(i).unwrap();
            Wallet::from_seed(&bytes)
        })
        .collect();
    let game = engine.create_game(&TxContext::new(wallets[0].address(), 1));
    for wallet in &wallets[1..] {
        engine.join_game(&TxContext::new(wallet.address(), 2), game).unwrap();
    }
    engine.start_game(&TxContext::new(wallets[0].address(), 3), game).unwrap();
    (engine, wallets)
}

fn apply(engine: &mut Engine<SimulatedFhe>, wallets: &[Wallet], op: &Op) {
    let backend = engine.backend().clone();
    match *op {
        Op::Deploy { player, territory, amount } => {
            let tx = TxContext::new(wallets[player].address(), 10);
            engine
                .deploy_troops(&tx, 0, &backend.encrypt(territory), &backend.encrypt(amount))
                .unwrap();
        }
        Op::Move { player, from, to, amount } => {
            let tx = TxContext::new(wallets[player].address(), 10);
            engine
                .move_troops(
                    &tx,
                    0,
                    &backend.encrypt(from),
                    &backend.encrypt(to),
                    &backend.encrypt(amount),
                )
                .unwrap();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Commands only shift troops; the audited total never changes and no
    /// invariant breaks.
    #[test]
    fn prop_commands_conserve_troops(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(3), 1..12)
    ) {
        let (mut engine, wallets) = started(seed, 3);
        let total = engine.troop_total(0).unwrap();

        for op in &ops {
            apply(&mut engine, &wallets, op);
            prop_assert_eq!(engine.troop_total(0).unwrap(), total);
        }
        prop_assert!(engine.audit_game(0).unwrap().is_empty());
    }

    /// Ownership is fixed after the deal: commands never change owner tags.
    #[test]
    fn prop_owners_never_change(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(2), 1..8)
    ) {
        let (mut engine, wallets) = started(seed, 2);
        let owners = |engine: &Engine<SimulatedFhe>| -> Vec<u32> {
            engine
                .board(0)
                .unwrap()
                .territories()
                .iter()
                .map(|t| engine.backend().audit(&t.owner))
                .collect()
        };
        let before = owners(&engine);
        for op in &ops {
            apply(&mut engine, &wallets, op);
        }
        prop_assert_eq!(owners(&engine), before);
    }

    /// A viewer's decoded board never exposes another player's index.
    #[test]
    fn prop_views_only_reveal_self_or_neutral(
        seed in any::<u64>(),
        viewer in 0usize..4
    ) {
        let (engine, wallets) = started(seed, 4);
        let wallet = &wallets[viewer];
        let tx = TxContext::new(wallet.address(), 20);
        let token = wallet.view_token(engine.domain()).unwrap();
        let board = wallet.decode_board(&engine.view_board(&tx, 0, &token).unwrap()).unwrap();
        let me = u8::try_from(viewer).unwrap();

        for view in board {
            match view.owner {
                Owner::Owned(index) => prop_assert_eq!(index, me),
                Owner::Neutral | Owner::Masked => {}
            }
            if view.owner == Owner::Masked {
                prop_assert_eq!(view.troops, 0);
            }
        }
    }

    /// Reinforcement pools only shrink under commands and never wrap.
    #[test]
    fn prop_pool_never_underflows(
        seed in any::<u64>(),
        amounts in prop::collection::vec(0u32..1_000, 1..6)
    ) {
        let (mut engine, wallets) = started(seed, 2);
        let target = engine
            .board(0)
            .unwrap()
            .territories()
            .iter()
            .position(|t| engine.backend().audit(&t.owner) == 0)
            .unwrap();
        let mut last = u32::MAX;
        for amount in amounts {
            apply(
                &mut engine,
                &wallets,
                &Op::Deploy { player: 0, territory: u32::try_from(target).unwrap(), amount },
            );
            let pool = engine.backend().audit(&engine.accounts(0).unwrap()[0].reinforcements);
            prop_assert!(pool <= 5);
            prop_assert!(pool <= last);
            last = pool;
        }
        let stored = engine.backend().audit(&engine.board(0).unwrap().territories()[target].owner);
        prop_assert_ne!(stored, NEUTRAL_OWNER);
    }
}
