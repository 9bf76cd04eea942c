//! Troop commands over encrypted operands.
//!
//! The target territory, the amount and the outcome are all ciphertexts, so
//! nothing here may branch on them. A command is evaluated against every
//! territory:
//!
//! 1. Compute a one-hot mask `hit_i = eq(target, i)` per territory.
//! 2. Combine the masks with encrypted ownership into a single `allowed` bit.
//! 3. Clamp the amount to what is available and zero it unless allowed.
//! 4. Rewrite every territory with `select(hit_i, effective, 0)`.
//!
//! A command the caller is not entitled to issue (unowned source, target out
//! of range, empty pool) therefore still rewrites every ciphertext, only with
//! a zero delta. Callers cannot tell from the stored state which territory
//! was touched or whether anything happened.

use rayon::prelude::*;

use crate::config::RulesConfig;
use crate::fhe::FheBackend;
use crate::game::{PlayerAccount, PlayerIndex, TERRITORY_COUNT, Territory, TerritoryBoard};

/// One-hot encrypted mask selecting the territory `target` names.
///
/// All zero when `target` is outside `0..TERRITORY_COUNT`.
#[allow(clippy::cast_possible_truncation)]
pub fn hit_masks<B: FheBackend>(backend: &B, target: &B::Ciphertext) -> Vec<B::Ciphertext> {
    (0..TERRITORY_COUNT)
        .into_par_iter()
        .map(|i| backend.equal(target, &backend.trivial(i as u32)))
        .collect()
}

/// Encrypted bit: some territory selected by `hits` is owned by `player`.
pub fn owns_any<B: FheBackend>(
    backend: &B,
    territories: &[Territory<B::Ciphertext>],
    hits: &[B::Ciphertext],
    player: PlayerIndex,
) -> B::Ciphertext {
    let me = backend.trivial(u32::from(player));
    let owned: Vec<_> = territories
        .par_iter()
        .zip(hits.par_iter())
        .map(|(territory, hit)| backend.and(hit, &backend.equal(&territory.owner, &me)))
        .collect();
    backend.or_all(&owned)
}

/// Place up to `amount` troops from `account`'s pool onto `territory`.
///
/// Returns the encrypted number of troops actually deployed, which is zero
/// unless `player` owns the target.
pub fn deploy_troops<B: FheBackend>(
    backend: &B,
    board: &mut TerritoryBoard<B::Ciphertext>,
    account: &mut PlayerAccount<B::Ciphertext>,
    player: PlayerIndex,
    territory: &B::Ciphertext,
    amount: &B::Ciphertext,
) -> B::Ciphertext {
    let hits = hit_masks(backend, territory);
    let owned = owns_any(backend, board.territories(), &hits, player);

    let zero = backend.trivial(0);
    let granted = backend.minimum(amount, &account.reinforcements);
    let effective = backend.select(&owned, &granted, &zero);

    account.reinforcements = backend.sub(&account.reinforcements, &effective);
    board
        .territories_mut()
        .par_iter_mut()
        .zip(hits.par_iter())
        .for_each(|(cell, hit)| {
            let delta = backend.select(hit, &effective, &zero);
            cell.troops = backend.add(&cell.troops, &delta);
        });

    effective
}

/// Move up to `amount` troops from `from` to `to`.
///
/// The source must be owned by `player` and the destination must exist;
/// with [`RulesConfig::require_owned_destination`] it must be owned too.
/// The amount is clamped to the source garrison. Returns the encrypted
/// number of troops moved.
pub fn move_troops<B: FheBackend>(
    backend: &B,
    board: &mut TerritoryBoard<B::Ciphertext>,
    player: PlayerIndex,
    from: &B::Ciphertext,
    to: &B::Ciphertext,
    amount: &B::Ciphertext,
    rules: &RulesConfig,
) -> B::Ciphertext {
    let (from_hits, to_hits) = rayon::join(|| hit_masks(backend, from), || hit_masks(backend, to));
    let territories = board.territories();

    let owned_from = owns_any(backend, territories, &from_hits, player);
    let destination_ok = if rules.require_owned_destination {
        owns_any(backend, territories, &to_hits, player)
    } else {
        backend.or_all(&to_hits)
    };

    let zero = backend.trivial(0);
    let garrisons: Vec<_> = territories
        .par_iter()
        .zip(from_hits.par_iter())
        .map(|(cell, hit)| backend.select(hit, &cell.troops, &zero))
        .collect();
    let available = backend.sum(&garrisons);

    let allowed = backend.and(&owned_from, &destination_ok);
    let granted = backend.minimum(amount, &available);
    let effective = backend.select(&allowed, &granted, &zero);

    board
        .territories_mut()
        .par_iter_mut()
        .zip(from_hits.par_iter().zip(to_hits.par_iter()))
        .for_each(|(cell, (from_hit, to_hit))| {
            // Debit before credit so from == to nets out.
            let debit = backend.select(from_hit, &effective, &zero);
            let credit = backend.select(to_hit, &effective, &zero);
            let drained = backend.sub(&cell.troops, &debit);
            cell.troops = backend.add(&drained, &credit);
        });

    effective
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::fhe::{AuditDecrypt, SimCiphertext, SimulatedFhe};
    use crate::game::{DealPlan, TerritoryId};

    struct Fixture {
        fhe: SimulatedFhe,
        plan: DealPlan,
        board: TerritoryBoard<SimCiphertext>,
        account: PlayerAccount<SimCiphertext>,
    }

    fn fixture() -> Fixture {
        let fhe = SimulatedFhe::from_seed(21);
        let plan = DealPlan::deal(8, 2, &BoardConfig::default());
        let board = TerritoryBoard::from_plan(&fhe, &plan);
        let mut account = PlayerAccount::opening(&fhe);
        account.reinforcements = fhe.encrypt(5);
        Fixture { fhe, plan, board, account }
    }

    impl Fixture {
        fn owned_by(&self, player: Option<PlayerIndex>) -> TerritoryId {
            (0..TERRITORY_COUNT)
                .find(|&id| self.plan.owners[id] == player)
                .unwrap()
        }

        fn troops(&self, id: TerritoryId) -> u32 {
            self.fhe.audit(&self.board.territory(id).unwrap().troops)
        }

        fn board_total(&self) -> u32 {
            (0..TERRITORY_COUNT).map(|id| self.troops(id)).sum()
        }
    }

    #[test]
    fn test_hit_mask_is_one_hot() {
        let fhe = SimulatedFhe::from_seed(2);
        let hits = hit_masks(&fhe, &fhe.encrypt(17));
        let decoded: Vec<u32> = hits.iter().map(|h| fhe.audit(h)).collect();
        assert_eq!(decoded.iter().sum::<u32>(), 1);
        assert_eq!(decoded[17], 1);

        let outside = hit_masks(&fhe, &fhe.encrypt(42));
        assert!(outside.iter().all(|h| fhe.audit(h) == 0));
    }

    #[test]
    fn test_deploy_to_owned() {
        let mut f = fixture();
        let target = f.owned_by(Some(0));
        let before = f.troops(target);

        let moved = deploy_troops(
            &f.fhe,
            &mut f.board,
            &mut f.account,
            0,
            &f.fhe.encrypt(target as u32),
            &f.fhe.encrypt(2),
        );

        assert_eq!(f.fhe.audit(&moved), 2);
        assert_eq!(f.troops(target), before + 2);
        assert_eq!(f.fhe.audit(&f.account.reinforcements), 3);
    }

    #[test]
    fn test_deploy_clamps_to_pool() {
        let mut f = fixture();
        let target = f.owned_by(Some(0));
        let before_total = f.board_total();

        deploy_troops(
            &f.fhe,
            &mut f.board,
            &mut f.account,
            0,
            &f.fhe.encrypt(target as u32),
            &f.fhe.encrypt(1_000),
        );

        assert_eq!(f.fhe.audit(&f.account.reinforcements), 0);
        assert_eq!(f.board_total(), before_total + 5);
    }

    #[test]
    fn test_deploy_unowned_is_noop() {
        let mut f = fixture();
        let enemy = f.owned_by(Some(1));
        let neutral = f.owned_by(None);
        let before: Vec<u32> = (0..TERRITORY_COUNT).map(|id| f.troops(id)).collect();

        for target in [enemy as u32, neutral as u32, 42, 97, u32::MAX] {
            let moved = deploy_troops(
                &f.fhe,
                &mut f.board,
                &mut f.account,
                0,
                &f.fhe.encrypt(target),
                &f.fhe.encrypt(3),
            );
            assert_eq!(f.fhe.audit(&moved), 0);
        }

        let after: Vec<u32> = (0..TERRITORY_COUNT).map(|id| f.troops(id)).collect();
        assert_eq!(before, after);
        assert_eq!(f.fhe.audit(&f.account.reinforcements), 5);
    }

    #[test]
    fn test_noop_still_rewrites_ciphertexts() {
        let mut f = fixture();
        let enemy = f.owned_by(Some(1));
        let before: Vec<SimCiphertext> =
            f.board.territories().iter().map(|t| t.troops).collect();

        deploy_troops(
            &f.fhe,
            &mut f.board,
            &mut f.account,
            0,
            &f.fhe.encrypt(enemy as u32),
            &f.fhe.encrypt(1),
        );

        for (old, new) in before.iter().zip(f.board.territories()) {
            assert_ne!(*old, new.troops);
        }
    }

    #[test]
    fn test_move_between_owned() {
        let mut f = fixture();
        let owned: Vec<TerritoryId> = (0..TERRITORY_COUNT)
            .filter(|&id| f.plan.owners[id] == Some(0))
            .collect();
        let (src, dst) = (owned[0], owned[1]);

        let moved = move_troops(
            &f.fhe,
            &mut f.board,
            0,
            &f.fhe.encrypt(src as u32),
            &f.fhe.encrypt(dst as u32),
            &f.fhe.encrypt(1),
            &RulesConfig::default(),
        );

        assert_eq!(f.fhe.audit(&moved), 1);
        assert_eq!(f.troops(src), 0);
        assert_eq!(f.troops(dst), 2);
    }

    #[test]
    fn test_move_clamps_to_garrison() {
        let mut f = fixture();
        let src = f.owned_by(Some(0));
        let dst = f.owned_by(None);
        let before_total = f.board_total();
        let dst_before = f.troops(dst);

        let moved = move_troops(
            &f.fhe,
            &mut f.board,
            0,
            &f.fhe.encrypt(src as u32),
            &f.fhe.encrypt(dst as u32),
            &f.fhe.encrypt(50),
            &RulesConfig::default(),
        );

        assert_eq!(f.fhe.audit(&moved), 1);
        assert_eq!(f.troops(src), 0);
        assert_eq!(f.troops(dst), dst_before + 1);
        assert_eq!(f.board_total(), before_total);
    }

    #[test]
    fn test_move_rejections() {
        let mut f = fixture();
        let mine = f.owned_by(Some(0));
        let theirs = f.owned_by(Some(1));
        let before: Vec<u32> = (0..TERRITORY_COUNT).map(|id| f.troops(id)).collect();
        let strict = RulesConfig {
            require_owned_destination: true,
            ..RulesConfig::default()
        };

        let cases = [
            (theirs as u32, mine as u32, RulesConfig::default()),
            (mine as u32, 42, RulesConfig::default()),
            (mine as u32, theirs as u32, strict),
        ];
        for (src, dst, rules) in cases {
            let moved = move_troops(
                &f.fhe,
                &mut f.board,
                0,
                &f.fhe.encrypt(src),
                &f.fhe.encrypt(dst),
                &f.fhe.encrypt(1),
                &rules,
            );
            assert_eq!(f.fhe.audit(&moved), 0);
        }

        let after: Vec<u32> = (0..TERRITORY_COUNT).map(|id| f.troops(id)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_move_to_self_is_neutral() {
        let mut f = fixture();
        let src = f.owned_by(Some(0));
        move_troops(
            &f.fhe,
            &mut f.board,
            0,
            &f.fhe.encrypt(src as u32),
            &f.fhe.encrypt(src as u32),
            &f.fhe.encrypt(1),
            &RulesConfig::default(),
        );
        assert_eq!(f.troops(src), 1);
    }
}
