//! Encrypted territory board.
//!
//! Each of the 42 territories is a `(troops, owner)` pair of ciphertexts.
//! Stored owner tags are player indices or [`NEUTRAL_OWNER`]; the
//! [`MASKED_OWNER`] sentinel only ever appears in view responses.

use serde::Serialize;

use crate::config::BoardConfig;
use crate::fhe::FheBackend;
use crate::game::{PlayerIndex, TERRITORY_COUNT, TerritoryId};

/// Owner tag of an unclaimed territory.
pub const NEUTRAL_OWNER: u32 = 98;

/// Owner tag returned to a viewer who may not see a territory.
pub const MASKED_OWNER: u32 = 99;

/// Decoded owner tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Owner {
    /// Controlled by the player at this roster index.
    Owned(PlayerIndex),
    /// Unclaimed.
    Neutral,
    /// The viewer is not authorized to see this territory.
    Masked,
}

impl Owner {
    /// Decode a wire tag. Returns `None` for tags outside the protocol.
    #[must_use]
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            NEUTRAL_OWNER => Some(Self::Neutral),
            MASKED_OWNER => Some(Self::Masked),
            t if t < NEUTRAL_OWNER => PlayerIndex::try_from(t).ok().map(Self::Owned),
            _ => None,
        }
    }

    /// Encode as a wire tag.
    #[must_use]
    pub fn tag(self) -> u32 {
        match self {
            Self::Owned(index) => u32::from(index),
            Self::Neutral => NEUTRAL_OWNER,
            Self::Masked => MASKED_OWNER,
        }
    }
}

/// One territory's encrypted state.
#[derive(Debug, Clone)]
pub struct Territory<C> {
    /// Encrypted troop count.
    pub troops: C,
    /// Encrypted owner tag.
    pub owner: C,
}

/// Deterministic PRNG using xorshift64.
#[derive(Debug, Clone, Copy)]
struct Rng {
    state: u64,
}

impl Rng {
    const fn new(seed: u64) -> Self {
        // xorshift has a fixed point at zero
        let state = if seed == 0 { 0x5555_5555_5555_5555 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform-ish value in `[0, max)`.
    #[allow(clippy::cast_possible_truncation)]
    fn below(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }
}

/// Plaintext initial assignment, computed inside the engine and encrypted
/// before storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealPlan {
    /// Owner per territory; `None` is neutral.
    pub owners: [Option<PlayerIndex>; TERRITORY_COUNT],
    /// Troops per territory.
    pub troops: [u32; TERRITORY_COUNT],
}

impl DealPlan {
    /// Territories each of `players` players receives under `config`.
    #[must_use]
    pub fn territories_per_player(players: usize, config: &BoardConfig) -> usize {
        if players == 0 {
            return 0;
        }
        config.starting_territories.min(TERRITORY_COUNT / players)
    }

    /// Shuffle the board and deal it among `players` players plus neutrals.
    #[must_use]
    pub fn deal(seed: u64, players: usize, config: &BoardConfig) -> Self {
        let mut rng = Rng::new(seed);

        let mut order: [TerritoryId; TERRITORY_COUNT] = std::array::from_fn(|i| i);
        for i in (1..TERRITORY_COUNT).rev() {
            let j = rng.below(i + 1);
            order.swap(i, j);
        }

        let per_player = Self::territories_per_player(players, config);
        let mut owners = [None; TERRITORY_COUNT];
        let mut troops = [0u32; TERRITORY_COUNT];

        for (slot, &territory) in order.iter().enumerate() {
            let player = if per_player == 0 { players } else { slot / per_player };
            if player < players {
                owners[territory] = PlayerIndex::try_from(player).ok();
                troops[territory] = config.starting_troops;
            } else {
                let extra = rng.below(config.max_neutral_troops as usize);
                troops[territory] = 1 + u32::try_from(extra).unwrap_or(0);
            }
        }

        Self { owners, troops }
    }

    /// Owner tag for a territory.
    #[must_use]
    pub fn owner_tag(&self, territory: TerritoryId) -> u32 {
        self.owners[territory].map_or(NEUTRAL_OWNER, u32::from)
    }
}

/// The 42 encrypted territories of one game.
#[derive(Debug, Clone)]
pub struct TerritoryBoard<C> {
    territories: Vec<Territory<C>>,
}

impl<C: Clone> TerritoryBoard<C> {
    /// Encrypt a deal into a board.
    ///
    /// Values are encrypted with fresh randomness so equal owners or troop
    /// counts do not produce equal ciphertexts.
    pub fn from_plan<B>(backend: &B, plan: &DealPlan) -> Self
    where
        B: FheBackend<Ciphertext = C>,
    {
        let territories = (0..TERRITORY_COUNT)
            .map(|id| Territory {
                troops: backend.encrypt(plan.troops[id]),
                owner: backend.encrypt(plan.owner_tag(id)),
            })
            .collect();
        Self { territories }
    }

    /// One territory, or `None` if out of range.
    #[must_use]
    pub fn territory(&self, id: TerritoryId) -> Option<&Territory<C>> {
        self.territories.get(id)
    }

    /// All territories in index order.
    #[must_use]
    pub fn territories(&self) -> &[Territory<C>] {
        &self.territories
    }

    pub(crate) fn territories_mut(&mut self) -> &mut [Territory<C>] {
        &mut self.territories
    }
}
