//! Client-side wallet and response decoding.
//!
//! A [`Wallet`] holds the two secrets a player needs: the ed25519 key behind
//! their [`Address`] and the viewer keypair results are sealed to. Raw owner
//! tags never escape this module; readings are decoded into [`Owner`].

use ed25519_dalek::SigningKey;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use thiserror::Error;

use crate::error::SealError;
use crate::fhe::{SealedValue, ViewerKeypair};
use crate::game::{Address, Owner, PlayerIndex, TerritoryId, territories};
use crate::view::{TerritoryReading, ViewDomain, ViewToken};

/// Errors decoding a view response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A sealed value did not open under this wallet's viewer key.
    #[error(transparent)]
    Seal(#[from] SealError),
    /// An opened owner tag is outside the wire protocol.
    #[error("unexpected owner tag {0}")]
    UnknownOwnerTag(u32),
    /// An opened owner index has no roster entry.
    #[error("owner index {0} is not on the roster")]
    OwnerNotOnRoster(PlayerIndex),
}

/// A decoded territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TerritoryView {
    /// Territory index.
    pub id: TerritoryId,
    /// Territory name.
    pub name: &'static str,
    /// Decoded owner.
    pub owner: Owner,
    /// Troop count, `0` when masked.
    pub troops: u32,
}

impl TerritoryView {
    /// Whether the viewer could see this territory.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.owner != Owner::Masked
    }
}

/// A territory the viewer can see, with its owner resolved to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KnownTerritory {
    /// Territory index.
    pub id: TerritoryId,
    /// Territory name.
    pub name: &'static str,
    /// Owning account, `None` when neutral.
    pub owner: Option<Address>,
    /// Troop count.
    pub troops: u32,
    /// Whether this wallet owns it.
    pub ours: bool,
}

/// A player's signing and viewing keys.
pub struct Wallet {
    signing: SigningKey,
    viewer: ViewerKeypair,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl Wallet {
    /// Fresh wallet from the operating system RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// Deterministic wallet; both keys are derived from `seed`.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_seed = blake3::derive_key("shroud 2026-10 wallet signing key", seed);
        Self {
            signing: SigningKey::from_bytes(&signing_seed),
            viewer: ViewerKeypair::from_seed(seed),
        }
    }

    /// Account address.
    #[must_use]
    pub fn address(&self) -> Address {
        Address(self.signing.verifying_key().to_bytes())
    }

    /// Signing key, for building tokens by hand.
    #[must_use]
    pub const fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    /// Viewer keypair results are sealed to.
    #[must_use]
    pub const fn viewer(&self) -> &ViewerKeypair {
        &self.viewer
    }

    /// Sign a view token for `domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the signed message fails to encode.
    pub fn view_token(&self, domain: &ViewDomain) -> bincode::Result<ViewToken> {
        ViewToken::sign(&self.signing, domain, self.viewer.public_key())
    }

    /// Open a sealed scalar such as a balance.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Authentication`] if it was not sealed to this wallet.
    pub fn open(&self, sealed: &SealedValue) -> Result<u32, SealError> {
        self.viewer.open(sealed)
    }

    /// Open and decode one territory reading.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if a value does not open or the owner tag is
    /// not part of the protocol.
    pub fn decode(&self, reading: &TerritoryReading) -> Result<TerritoryView, ClientError> {
        let tag = self.viewer.open(&reading.owner)?;
        let troops = self.viewer.open(&reading.troops)?;
        let owner = Owner::from_tag(tag).ok_or(ClientError::UnknownOwnerTag(tag))?;
        Ok(TerritoryView {
            id: reading.id,
            name: territories::name(reading.id).unwrap_or("?"),
            owner,
            troops,
        })
    }

    /// Decode a whole board.
    ///
    /// # Errors
    ///
    /// Same as [`decode`](Self::decode).
    pub fn decode_board(
        &self,
        readings: &[TerritoryReading],
    ) -> Result<Vec<TerritoryView>, ClientError> {
        readings.iter().map(|r| self.decode(r)).collect()
    }

    /// Decode a board and keep only what is visible, resolving owner indices
    /// against `roster` (the game's players in join order).
    ///
    /// # Errors
    ///
    /// Same as [`decode`](Self::decode), plus
    /// [`ClientError::OwnerNotOnRoster`] for an index past the roster.
    pub fn known_territories(
        &self,
        readings: &[TerritoryReading],
        roster: &[Address],
    ) -> Result<Vec<KnownTerritory>, ClientError> {
        let me = self.address();
        let mut known = Vec::with_capacity(readings.len());
        for reading in readings {
            let view = self.decode(reading)?;
            let owner = match view.owner {
                Owner::Masked => continue,
                Owner::Neutral => None,
                Owner::Owned(index) => Some(
                    *roster
                        .get(usize::from(index))
                        .ok_or(ClientError::OwnerNotOnRoster(index))?,
                ),
            };
            known.push(KnownTerritory {
                id: view.id,
                name: view.name,
                owner,
                troops: view.troops,
                ours: owner == Some(me),
            });
        }
        Ok(known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;
    use crate::game::{MASKED_OWNER, NEUTRAL_OWNER};

    fn reading(wallet: &Wallet, owner: u32, troops: u32) -> TerritoryReading {
        let key = wallet.viewer().public_key();
        TerritoryReading {
            id: 3,
            troops: SealedValue::seal(troops, &key).unwrap(),
            owner: SealedValue::seal(owner, &key).unwrap(),
        }
    }

    #[test]
    fn test_wallet_is_deterministic() {
        let a = Wallet::from_seed(&[7; 32]);
        let b = Wallet::from_seed(&[7; 32]);
        assert_eq!(a.address(), b.address());
        assert_ne!(a.address(), Wallet::from_seed(&[8; 32]).address());
    }

    #[test]
    fn test_token_verifies_for_wallet_address() {
        let wallet = Wallet::generate();
        let domain = ViewDomain::from(&DomainConfig::default());
        let token = wallet.view_token(&domain).unwrap();
        token.verify(&wallet.address(), &domain).unwrap();
    }

    #[test]
    fn test_decode_sentinels() {
        let wallet = Wallet::from_seed(&[1; 32]);

        let masked = wallet.decode(&reading(&wallet, MASKED_OWNER, 0)).unwrap();
        assert_eq!(masked.owner, Owner::Masked);
        assert!(!masked.is_visible());

        let neutral = wallet.decode(&reading(&wallet, NEUTRAL_OWNER, 2)).unwrap();
        assert_eq!(neutral.owner, Owner::Neutral);
        assert_eq!(neutral.troops, 2);
        assert_eq!(neutral.name, "Alberta");

        let mine = wallet.decode(&reading(&wallet, 1, 4)).unwrap();
        assert_eq!(mine.owner, Owner::Owned(1));
    }

    #[test]
    fn test_decode_rejects_bad_tag() {
        let wallet = Wallet::from_seed(&[1; 32]);
        assert_eq!(
            wallet.decode(&reading(&wallet, 150, 0)),
            Err(ClientError::UnknownOwnerTag(150))
        );
    }

    #[test]
    fn test_known_territories_resolve_roster() {
        let wallet = Wallet::from_seed(&[1; 32]);
        let rival = Wallet::from_seed(&[2; 32]);
        let roster = [rival.address(), wallet.address()];
        let readings = [
            reading(&wallet, 1, 4),
            reading(&wallet, MASKED_OWNER, 0),
            reading(&wallet, NEUTRAL_OWNER, 2),
            reading(&wallet, 0, 3),
        ];

        let known = wallet.known_territories(&readings, &roster).unwrap();
        assert_eq!(known.len(), 3);
        assert_eq!(known[0].owner, Some(wallet.address()));
        assert!(known[0].ours);
        assert_eq!(known[0].troops, 4);
        assert_eq!(known[1].owner, None);
        assert!(!known[1].ours);
        assert_eq!(known[2].owner, Some(rival.address()));
        assert!(!known[2].ours);
    }

    #[test]
    fn test_known_territories_reject_index_past_roster() {
        let wallet = Wallet::from_seed(&[1; 32]);
        let roster = [wallet.address()];
        assert_eq!(
            wallet.known_territories(&[reading(&wallet, 3, 1)], &roster),
            Err(ClientError::OwnerNotOnRoster(3))
        );
    }

    #[test]
    fn test_decode_foreign_reading() {
        let wallet = Wallet::from_seed(&[1; 32]);
        let other = Wallet::from_seed(&[2; 32]);
        assert_eq!(
            wallet.decode(&reading(&other, 0, 1)),
            Err(ClientError::Seal(SealError::Authentication))
        );
    }
}
