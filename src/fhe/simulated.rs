//! Reference backend that simulates homomorphic evaluation.
//!
//! Ciphertexts are values masked with a keystream derived from a secret
//! engine key and a per-ciphertext nonce. Each operation unmasks its inputs,
//! computes in the clear and masks the result under a nonce derived from the
//! operation and its operands, so evaluation is deterministic while every
//! output looks unrelated to its inputs.
//!
//! This gives the engine the exact interface and data flow of a real FHE
//! library. It does not give its security: whoever holds the key can read
//! everything.

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::fhe::{AuditDecrypt, FheBackend, ReencryptionKey, SealedValue};

const KEY_CONTEXT: &str = "shroud 2026-10 simulated fhe key";
const STREAM_CONTEXT: &str = "shroud 2026-10 simulated fhe keystream";
const NONCE_CONTEXT: &str = "shroud 2026-10 simulated fhe nonce";
const SEED_CONTEXT: &str = "shroud 2026-10 simulated fhe seed";

/// A ciphertext of the simulated backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimCiphertext {
    nonce: [u8; 16],
    body: [u8; 4],
}

impl SimCiphertext {
    fn to_bytes(self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out[..16].copy_from_slice(&self.nonce);
        out[16..].copy_from_slice(&self.body);
        out
    }
}

/// Operation tags mixed into result nonces.
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum Op {
    Trivial = 0,
    Add = 1,
    Sub = 2,
    MulScalar = 3,
    DivScalar = 4,
    Equal = 5,
    LessThan = 6,
    And = 7,
    Or = 8,
    Select = 9,
}

/// Simulated FHE backend keyed by a 32-byte secret.
///
/// The keystream, derived nonces and derived seeds each use their own
/// subkey of the secret.
#[derive(Clone)]
pub struct SimulatedFhe {
    stream_key: [u8; 32],
    nonce_key: [u8; 32],
    seed_key: [u8; 32],
}

impl std::fmt::Debug for SimulatedFhe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedFhe").finish_non_exhaustive()
    }
}

impl SimulatedFhe {
    /// Create a backend with a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self::from_key(&key)
    }

    /// Create a backend whose key is derived from `seed`.
    ///
    /// Two backends built from the same seed interoperate, which is what
    /// recordings rely on for replay.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self::from_key(&blake3::derive_key(KEY_CONTEXT, &seed.to_le_bytes()))
    }

    fn from_key(key: &[u8; 32]) -> Self {
        Self {
            stream_key: blake3::derive_key(STREAM_CONTEXT, key),
            nonce_key: blake3::derive_key(NONCE_CONTEXT, key),
            seed_key: blake3::derive_key(SEED_CONTEXT, key),
        }
    }

    fn keystream(&self, nonce: &[u8; 16]) -> [u8; 4] {
        let hash = blake3::keyed_hash(&self.stream_key, nonce);
        let mut stream = [0u8; 4];
        stream.copy_from_slice(&hash.as_bytes()[..4]);
        stream
    }

    fn mask(&self, value: u32, nonce: [u8; 16]) -> SimCiphertext {
        let stream = self.keystream(&nonce);
        let mut body = value.to_le_bytes();
        for (byte, key) in body.iter_mut().zip(stream) {
            *byte ^= key;
        }
        SimCiphertext { nonce, body }
    }

    fn unmask(&self, ct: &SimCiphertext) -> u32 {
        let stream = self.keystream(&ct.nonce);
        let mut body = ct.body;
        for (byte, key) in body.iter_mut().zip(stream) {
            *byte ^= key;
        }
        u32::from_le_bytes(body)
    }

    fn derived_nonce(&self, op: Op, operands: &[&[u8]]) -> [u8; 16] {
        let mut hasher = blake3::Hasher::new_keyed(&self.nonce_key);
        hasher.update(&[op as u8]);
        for operand in operands {
            hasher.update(operand);
        }
        let mut nonce = [0u8; 16];
        nonce.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
        nonce
    }

    fn binary(
        &self,
        op: Op,
        lhs: &SimCiphertext,
        rhs: &SimCiphertext,
        f: impl FnOnce(u32, u32) -> u32,
    ) -> SimCiphertext {
        let value = f(self.unmask(lhs), self.unmask(rhs));
        let nonce = self.derived_nonce(op, &[&lhs.to_bytes(), &rhs.to_bytes()]);
        self.mask(value, nonce)
    }

    fn scalar(
        &self,
        op: Op,
        value: &SimCiphertext,
        scalar: u32,
        f: impl FnOnce(u32, u32) -> u32,
    ) -> SimCiphertext {
        let result = f(self.unmask(value), scalar);
        let nonce = self.derived_nonce(op, &[&value.to_bytes(), &scalar.to_le_bytes()]);
        self.mask(result, nonce)
    }
}

impl FheBackend for SimulatedFhe {
    type Ciphertext = SimCiphertext;

    fn encrypt(&self, value: u32) -> SimCiphertext {
        let mut nonce = [0u8; 16];
        OsRng.fill_bytes(&mut nonce);
        self.mask(value, nonce)
    }

    fn trivial(&self, value: u32) -> SimCiphertext {
        let nonce = self.derived_nonce(Op::Trivial, &[&value.to_le_bytes()]);
        self.mask(value, nonce)
    }

    fn add(&self, lhs: &SimCiphertext, rhs: &SimCiphertext) -> SimCiphertext {
        self.binary(Op::Add, lhs, rhs, u32::wrapping_add)
    }

    fn sub(&self, lhs: &SimCiphertext, rhs: &SimCiphertext) -> SimCiphertext {
        self.binary(Op::Sub, lhs, rhs, u32::wrapping_sub)
    }

    fn mul_scalar(&self, value: &SimCiphertext, factor: u32) -> SimCiphertext {
        self.scalar(Op::MulScalar, value, factor, u32::wrapping_mul)
    }

    fn div_scalar(&self, value: &SimCiphertext, divisor: u32) -> SimCiphertext {
        self.scalar(Op::DivScalar, value, divisor, |v, d| {
            v.checked_div(d).unwrap_or(u32::MAX)
        })
    }

    fn equal(&self, lhs: &SimCiphertext, rhs: &SimCiphertext) -> SimCiphertext {
        self.binary(Op::Equal, lhs, rhs, |a, b| u32::from(a == b))
    }

    fn less_than(&self, lhs: &SimCiphertext, rhs: &SimCiphertext) -> SimCiphertext {
        self.binary(Op::LessThan, lhs, rhs, |a, b| u32::from(a < b))
    }

    fn and(&self, lhs: &SimCiphertext, rhs: &SimCiphertext) -> SimCiphertext {
        self.binary(Op::And, lhs, rhs, |a, b| u32::from(a != 0 && b != 0))
    }

    fn or(&self, lhs: &SimCiphertext, rhs: &SimCiphertext) -> SimCiphertext {
        self.binary(Op::Or, lhs, rhs, |a, b| u32::from(a != 0 || b != 0))
    }

    fn select(
        &self,
        condition: &SimCiphertext,
        if_true: &SimCiphertext,
        if_false: &SimCiphertext,
    ) -> SimCiphertext {
        let chosen = if self.unmask(condition) == 0 {
            self.unmask(if_false)
        } else {
            self.unmask(if_true)
        };
        let nonce = self.derived_nonce(
            Op::Select,
            &[
                &condition.to_bytes(),
                &if_true.to_bytes(),
                &if_false.to_bytes(),
            ],
        );
        self.mask(chosen, nonce)
    }

    fn reencrypt(&self, value: &SimCiphertext, recipient: &ReencryptionKey) -> SealedValue {
        SealedValue::seal(self.unmask(value), recipient).unwrap_or_else(|_| SealedValue::unopenable())
    }

    fn derive_seed(&self, context: &[u8]) -> u64 {
        let hash = blake3::keyed_hash(&self.seed_key, context);
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(seed)
    }
}

impl AuditDecrypt for SimulatedFhe {
    fn audit(&self, value: &SimCiphertext) -> u32 {
        self.unmask(value)
    }
}
