#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shroud::{Engine, EngineConfig, FheBackend, Ledger, SimulatedFhe, Transaction, Wallet};

/// One plaintext command before encryption.
#[derive(Arbitrary, Debug)]
enum Command {
    Deploy { player: u8, territory: u8, amount: u16 },
    Move { player: u8, from: u8, to: u8, amount: u16 },
    AdvanceRound { player: u8 },
    Join { player: u8 },
}

#[derive(Arbitrary, Debug)]
struct GameInput {
    seed: u64,
    /// Extra joiners beyond the creator (capped to the roster).
    joiners: u8,
    commands: Vec<Command>,
}

fuzz_target!(|input: GameInput| {
    let players = 2 + usize::from(input.joiners % 3);
    let backend = SimulatedFhe::from_seed(input.seed);
    let Ok(engine) = Engine::new(backend.clone(), EngineConfig::default()) else {
        return;
    };
    let mut ledger = Ledger::new(engine);
    let wallets: Vec<Wallet> = (0..=players)
        .map(|i| Wallet::from_seed(&[i as u8 + 1; 32]))
        .collect();

    ledger.submit(wallets[0].address(), Transaction::CreateGame);
    for wallet in &wallets[1..players] {
        ledger.submit(wallet.address(), Transaction::JoinGame { game: 0 });
    }
    if !ledger
        .submit(wallets[0].address(), Transaction::StartGame { game: 0 })
        .is_accepted()
    {
        return;
    }

    let Ok(mut total) = ledger.engine().troop_total(0) else {
        return;
    };

    // The last wallet never joined; its commands must be rejected.
    let sender = |player: u8| wallets[usize::from(player) % wallets.len()].address();

    for command in input.commands.iter().take(32) {
        match *command {
            Command::Deploy { player, territory, amount } => {
                ledger.submit(
                    sender(player),
                    Transaction::DeployTroops {
                        game: 0,
                        territory: backend.encrypt(u32::from(territory)),
                        amount: backend.encrypt(u32::from(amount)),
                    },
                );
                // Deploys move troops from the pool onto the board.
                assert_eq!(ledger.engine().troop_total(0).ok(), Some(total));
            }
            Command::Move { player, from, to, amount } => {
                ledger.submit(
                    sender(player),
                    Transaction::MoveTroops {
                        game: 0,
                        from: backend.encrypt(u32::from(from)),
                        to: backend.encrypt(u32::from(to)),
                        amount: backend.encrypt(u32::from(amount)),
                    },
                );
                assert_eq!(ledger.engine().troop_total(0).ok(), Some(total));
            }
            Command::AdvanceRound { player } => {
                ledger.submit(sender(player), Transaction::AdvanceRound { game: 0 });
                let after = ledger.engine().troop_total(0).unwrap_or(0);
                assert!(after >= total, "a round credit lost troops");
                total = after;
            }
            Command::Join { player } => {
                let receipt = ledger.submit(sender(player), Transaction::JoinGame { game: 0 });
                assert!(!receipt.is_accepted(), "joined an active game");
            }
        }
    }

    let violations = ledger.engine().audit_game(0).unwrap_or_default();
    assert!(violations.is_empty(), "invariant violations: {violations:?}");
});
