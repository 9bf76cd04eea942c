//! Game invariants - audit checks that detect engine bugs.
//!
//! These decrypt engine state through [`AuditDecrypt`], so they only run
//! against backends that allow it (tests, simulation). A correct engine
//! never trips them.

use std::fmt;

use crate::fhe::AuditDecrypt;
use crate::game::{NEUTRAL_OWNER, PlayerAccount, TerritoryBoard};

/// Sanity bound on a single garrison or pool. Encrypted arithmetic wraps, so
/// an underflow shows up as a value near `u32::MAX`.
pub const SANITY_MAX_TROOPS: u32 = 1_000_000;

/// Invariant violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check a game's board and accounts.
///
/// `players` is the roster size; stored owners must be a roster index or
/// neutral, and never the masking sentinel.
#[must_use]
pub fn check_game<B: AuditDecrypt>(
    backend: &B,
    board: &TerritoryBoard<B::Ciphertext>,
    accounts: &[&PlayerAccount<B::Ciphertext>],
    players: usize,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (id, territory) in board.territories().iter().enumerate() {
        let owner = backend.audit(&territory.owner);
        let on_roster = usize::try_from(owner).is_ok_and(|o| o < players);
        if !on_roster && owner != NEUTRAL_OWNER {
            violations.push(InvariantViolation {
                message: format!("Territory {id} has stored owner tag {owner}"),
            });
        }

        let troops = backend.audit(&territory.troops);
        if troops > SANITY_MAX_TROOPS {
            violations.push(InvariantViolation {
                message: format!(
                    "Territory {id} has {troops} troops > sanity max {SANITY_MAX_TROOPS}"
                ),
            });
        }
    }

    if accounts.len() != players {
        violations.push(InvariantViolation {
            message: format!("{} accounts for {players} players", accounts.len()),
        });
    }

    for (index, account) in accounts.iter().enumerate() {
        let reinforcements = backend.audit(&account.reinforcements);
        if reinforcements > SANITY_MAX_TROOPS {
            violations.push(InvariantViolation {
                message: format!(
                    "Player {index} has {reinforcements} reinforcements > sanity max {SANITY_MAX_TROOPS}"
                ),
            });
        }
    }

    violations
}

/// Troops on the board plus every reinforcement pool.
///
/// Commands only shift troops around, so this is unchanged by them.
#[must_use]
pub fn troop_total<B: AuditDecrypt>(
    backend: &B,
    board: &TerritoryBoard<B::Ciphertext>,
    accounts: &[&PlayerAccount<B::Ciphertext>],
) -> u64 {
    let on_board: u64 = board
        .territories()
        .iter()
        .map(|t| u64::from(backend.audit(&t.troops)))
        .sum();
    let pooled: u64 = accounts
        .iter()
        .map(|a| u64::from(backend.audit(&a.reinforcements)))
        .sum();
    on_board + pooled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::fhe::{FheBackend, SimCiphertext, SimulatedFhe};
    use crate::game::{DealPlan, MASKED_OWNER};

    fn create_valid_game(
        fhe: &SimulatedFhe,
    ) -> (TerritoryBoard<SimCiphertext>, Vec<PlayerAccount<SimCiphertext>>) {
        let plan = DealPlan::deal(3, 2, &BoardConfig::default());
        let board = TerritoryBoard::from_plan(fhe, &plan);
        let accounts = vec![PlayerAccount::opening(fhe), PlayerAccount::opening(fhe)];
        (board, accounts)
    }

    #[test]
    fn test_valid_game_passes() {
        let fhe = SimulatedFhe::from_seed(4);
        let (board, accounts) = create_valid_game(&fhe);
        let refs: Vec<_> = accounts.iter().collect();
        assert!(check_game(&fhe, &board, &refs, 2).is_empty());
        // 30 dealt troops plus 12 neutrals holding 1..=3 each.
        let total = troop_total(&fhe, &board, &refs);
        assert!((42..=66).contains(&total));
    }

    #[test]
    fn test_masked_owner_detected() {
        let fhe = SimulatedFhe::from_seed(4);
        let (mut board, accounts) = create_valid_game(&fhe);
        board.territories_mut()[7].owner = fhe.encrypt(MASKED_OWNER);

        let refs: Vec<_> = accounts.iter().collect();
        let violations = check_game(&fhe, &board, &refs, 2);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("owner tag 99"));
    }

    #[test]
    fn test_owner_beyond_roster_detected() {
        let fhe = SimulatedFhe::from_seed(4);
        let (mut board, accounts) = create_valid_game(&fhe);
        board.territories_mut()[0].owner = fhe.encrypt(2);

        let refs: Vec<_> = accounts.iter().collect();
        assert_eq!(check_game(&fhe, &board, &refs, 2).len(), 1);
    }

    #[test]
    fn test_underflow_detected() {
        let fhe = SimulatedFhe::from_seed(4);
        let (mut board, mut accounts) = create_valid_game(&fhe);
        board.territories_mut()[3].troops = fhe.sub(&fhe.trivial(0), &fhe.trivial(1));
        accounts[1].reinforcements = fhe.encrypt(SANITY_MAX_TROOPS + 1);

        let refs: Vec<_> = accounts.iter().collect();
        let violations = check_game(&fhe, &board, &refs, 2);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("Territory 3"));
        assert!(violations[1].message.contains("Player 1"));
    }

    #[test]
    fn test_troops_at_max_passes() {
        let fhe = SimulatedFhe::from_seed(4);
        let (mut board, accounts) = create_valid_game(&fhe);
        board.territories_mut()[3].troops = fhe.encrypt(SANITY_MAX_TROOPS);

        let refs: Vec<_> = accounts.iter().collect();
        assert!(check_game(&fhe, &board, &refs, 2).is_empty());
    }

    #[test]
    fn test_account_count_mismatch() {
        let fhe = SimulatedFhe::from_seed(4);
        let (board, accounts) = create_valid_game(&fhe);
        let refs: Vec<_> = accounts.iter().take(1).collect();
        assert_eq!(check_game(&fhe, &board, &refs, 2).len(), 1);
    }
}
