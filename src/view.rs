//! Authorized reads of encrypted game state.
//!
//! Every territory can be requested by any roster member. What comes back is
//! decided homomorphically: the owner tag and troop count are replaced with
//! `(99, 0)` unless the viewer may see the territory, then both are sealed to
//! the key in the caller's [`ViewToken`]. The engine never learns which
//! branch was taken.

pub mod token;

pub use token::{REENCRYPT_PURPOSE, ReencryptMessage, ViewDomain, ViewToken};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::VisibilityPolicy;
use crate::fhe::{FheBackend, ReencryptionKey, SealedValue};
use crate::game::{
    MASKED_OWNER, NEUTRAL_OWNER, PlayerIndex, TERRITORY_COUNT, TerritoryBoard, TerritoryId,
    territories,
};

/// One territory as returned to a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryReading {
    /// Territory the reading is for.
    pub id: TerritoryId,
    /// Sealed troop count, `0` when masked.
    pub troops: SealedValue,
    /// Sealed owner tag, `99` when masked.
    pub owner: SealedValue,
}

/// Encrypted bit: `viewer` may see territory `id` under `policy`.
pub fn visibility<B: FheBackend>(
    backend: &B,
    board: &TerritoryBoard<B::Ciphertext>,
    id: TerritoryId,
    viewer: PlayerIndex,
    policy: VisibilityPolicy,
) -> B::Ciphertext {
    let cells = board.territories();
    let me = backend.trivial(u32::from(viewer));
    let owner = &cells[id].owner;

    let neutral = backend.equal(owner, &backend.trivial(NEUTRAL_OWNER));
    let mine = backend.equal(owner, &me);
    let visible = backend.or(&neutral, &mine);

    match policy {
        VisibilityPolicy::OwnedOnly => visible,
        VisibilityPolicy::OwnedAndAdjacent => {
            let bordering: Vec<_> = territories::neighbors(id)
                .map(|n| backend.equal(&cells[n].owner, &me))
                .collect();
            backend.or(&visible, &backend.or_all(&bordering))
        }
    }
}

/// Mask and seal one territory for `viewer`. `id` must be in range.
pub fn read_territory<B: FheBackend>(
    backend: &B,
    board: &TerritoryBoard<B::Ciphertext>,
    id: TerritoryId,
    viewer: PlayerIndex,
    policy: VisibilityPolicy,
    recipient: &ReencryptionKey,
) -> TerritoryReading {
    let visible = visibility(backend, board, id, viewer, policy);
    let cell = &board.territories()[id];

    let troops = backend.select(&visible, &cell.troops, &backend.trivial(0));
    let owner = backend.select(&visible, &cell.owner, &backend.trivial(MASKED_OWNER));

    TerritoryReading {
        id,
        troops: backend.reencrypt(&troops, recipient),
        owner: backend.reencrypt(&owner, recipient),
    }
}

/// Readings for all territories, evaluated in parallel.
pub fn read_board<B: FheBackend>(
    backend: &B,
    board: &TerritoryBoard<B::Ciphertext>,
    viewer: PlayerIndex,
    policy: VisibilityPolicy,
    recipient: &ReencryptionKey,
) -> Vec<TerritoryReading> {
    (0..TERRITORY_COUNT)
        .into_par_iter()
        .map(|id| read_territory(backend, board, id, viewer, policy, recipient))
        .collect()
}
