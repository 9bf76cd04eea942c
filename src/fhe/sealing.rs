//! Public-key sealing for re-encrypted values.
//!
//! A viewer holds a Ristretto secret scalar `s` and publishes `P = s·G`.
//! Sealing picks an ephemeral scalar `r`, publishes `R = r·G` and derives a
//! keystream and MAC key from `r·P`. Only the holder of `s` can recompute
//! `s·R = r·P` and open the value.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::SealError;

const KEYSTREAM_CONTEXT: &str = "shroud 2026-10 reencrypt keystream";
const MAC_CONTEXT: &str = "shroud 2026-10 reencrypt mac";

/// A viewer's re-encryption public key (compressed Ristretto point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReencryptionKey(pub [u8; 32]);

impl ReencryptionKey {
    fn point(&self) -> Result<RistrettoPoint, SealError> {
        CompressedRistretto(self.0)
            .decompress()
            .ok_or(SealError::MalformedKey)
    }

    /// Whether the bytes decode to a valid curve point.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.point().is_ok()
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// A value re-encrypted to one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    ephemeral: [u8; 32],
    body: [u8; 4],
    tag: [u8; 16],
}

impl SealedValue {
    /// Seal `value` so that only the owner of `recipient` can open it.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::MalformedKey`] if `recipient` is not a valid point.
    pub fn seal(value: u32, recipient: &ReencryptionKey) -> Result<Self, SealError> {
        let point = recipient.point()?;
        let r = random_scalar();
        let ephemeral = (RISTRETTO_BASEPOINT_POINT * r).compress().to_bytes();
        let shared = (point * r).compress().to_bytes();

        let (stream, mac) = derive_keys(&shared, &ephemeral, recipient);
        let body = xor4(value.to_le_bytes(), &stream);
        let tag = mac_tag(&mac, &body);

        Ok(Self {
            ephemeral,
            body,
            tag,
        })
    }

    /// Produce a value that opens under no key.
    ///
    /// Used when the recipient key is not a valid point: the caller learns
    /// nothing and the engine does not branch on key validity.
    #[must_use]
    pub fn unopenable() -> Self {
        let mut bytes = [0u8; 52];
        OsRng.fill_bytes(&mut bytes);
        let mut ephemeral = [0u8; 32];
        let mut body = [0u8; 4];
        let mut tag = [0u8; 16];
        ephemeral.copy_from_slice(&bytes[..32]);
        body.copy_from_slice(&bytes[32..36]);
        tag.copy_from_slice(&bytes[36..]);
        Self {
            ephemeral,
            body,
            tag,
        }
    }
}

/// A viewer's re-encryption keypair. Lives client-side only.
#[derive(Clone)]
pub struct ViewerKeypair {
    secret: Scalar,
    public: ReencryptionKey,
}

impl std::fmt::Debug for ViewerKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerKeypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl ViewerKeypair {
    /// Generate a keypair from the operating system RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_scalar(random_scalar())
    }

    /// Derive a keypair deterministically from a 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut wide = [0u8; 64];
        blake3::Hasher::new_derive_key("shroud 2026-10 viewer key")
            .update(seed)
            .finalize_xof()
            .fill(&mut wide);
        Self::from_scalar(Scalar::from_bytes_mod_order_wide(&wide))
    }

    fn from_scalar(secret: Scalar) -> Self {
        let public = ReencryptionKey((RISTRETTO_BASEPOINT_POINT * secret).compress().to_bytes());
        Self { secret, public }
    }

    /// The public half, embedded in view tokens.
    #[must_use]
    pub const fn public_key(&self) -> ReencryptionKey {
        self.public
    }

    /// Open a value sealed to this keypair.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Authentication`] if the value was sealed to a
    /// different key or tampered with.
    pub fn open(&self, sealed: &SealedValue) -> Result<u32, SealError> {
        let ephemeral = CompressedRistretto(sealed.ephemeral)
            .decompress()
            .ok_or(SealError::Authentication)?;
        let shared = (ephemeral * self.secret).compress().to_bytes();

        let (stream, mac) = derive_keys(&shared, &sealed.ephemeral, &self.public);
        if mac_tag(&mac, &sealed.body) != sealed.tag {
            return Err(SealError::Authentication);
        }
        Ok(u32::from_le_bytes(xor4(sealed.body, &stream)))
    }
}

fn random_scalar() -> Scalar {
    let mut wide = [0u8; 64];
    OsRng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

fn derive_keys(
    shared: &[u8; 32],
    ephemeral: &[u8; 32],
    recipient: &ReencryptionKey,
) -> ([u8; 32], [u8; 32]) {
    let mut material = [0u8; 96];
    material[..32].copy_from_slice(shared);
    material[32..64].copy_from_slice(ephemeral);
    material[64..].copy_from_slice(recipient.as_bytes());
    (
        blake3::derive_key(KEYSTREAM_CONTEXT, &material),
        blake3::derive_key(MAC_CONTEXT, &material),
    )
}

fn mac_tag(key: &[u8; 32], body: &[u8; 4]) -> [u8; 16] {
    let hash = blake3::keyed_hash(key, body);
    let mut tag = [0u8; 16];
    tag.copy_from_slice(&hash.as_bytes()[..16]);
    tag
}

fn xor4(bytes: [u8; 4], stream: &[u8; 32]) -> [u8; 4] {
    let mut out = bytes;
    for (byte, key) in out.iter_mut().zip(stream) {
        *byte ^= key;
    }
    out
}
