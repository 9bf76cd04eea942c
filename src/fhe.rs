//! Homomorphic primitive interface.
//!
//! The engine never computes on plaintext game state. Every comparison,
//! addition and conditional assignment goes through an [`FheBackend`], whose
//! ciphertexts are opaque to the engine. Encrypted booleans are ordinary
//! ciphertexts holding `0` or `1`.
//!
//! [`SimulatedFhe`] is a reference backend suitable for tests, demos and
//! simulation. Production deployments supply their own backend.

pub mod sealing;
mod simulated;

pub use sealing::{ReencryptionKey, SealedValue, ViewerKeypair};
pub use simulated::{SimCiphertext, SimulatedFhe};

use std::fmt;

/// Homomorphic operations over encrypted `u32` values.
///
/// All operations are deterministic functions of their inputs except
/// [`encrypt`](FheBackend::encrypt) and [`reencrypt`](FheBackend::reencrypt),
/// which are randomized. Arithmetic wraps on overflow like the underlying
/// integer circuits; callers clamp with [`minimum`](FheBackend::minimum) where
/// underflow matters.
pub trait FheBackend: Send + Sync {
    /// Ciphertext handle produced and consumed by this backend.
    type Ciphertext: Clone + fmt::Debug + Send + Sync;

    /// Encrypt a value with fresh randomness (client inputs).
    fn encrypt(&self, value: u32) -> Self::Ciphertext;

    /// Deterministically encrypt a public constant.
    fn trivial(&self, value: u32) -> Self::Ciphertext;

    /// `lhs + rhs`, wrapping.
    fn add(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Self::Ciphertext;

    /// `lhs - rhs`, wrapping.
    fn sub(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Self::Ciphertext;

    /// `value * factor`, wrapping.
    fn mul_scalar(&self, value: &Self::Ciphertext, factor: u32) -> Self::Ciphertext;

    /// `value / divisor`. A zero divisor yields `u32::MAX`.
    fn div_scalar(&self, value: &Self::Ciphertext, divisor: u32) -> Self::Ciphertext;

    /// Encrypted `lhs == rhs`.
    fn equal(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Self::Ciphertext;

    /// Encrypted `lhs < rhs`.
    fn less_than(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Self::Ciphertext;

    /// Encrypted boolean conjunction.
    fn and(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Self::Ciphertext;

    /// Encrypted boolean disjunction.
    fn or(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Self::Ciphertext;

    /// `if condition { if_true } else { if_false }` without revealing the branch.
    fn select(
        &self,
        condition: &Self::Ciphertext,
        if_true: &Self::Ciphertext,
        if_false: &Self::Ciphertext,
    ) -> Self::Ciphertext;

    /// Re-encrypt a ciphertext so only the holder of `recipient`'s secret can read it.
    fn reencrypt(&self, value: &Self::Ciphertext, recipient: &ReencryptionKey) -> SealedValue;

    /// Keyed seed derivation.
    ///
    /// Deterministic for a given backend key and context, unpredictable to
    /// anyone without the key.
    fn derive_seed(&self, context: &[u8]) -> u64;

    /// Encrypted `min(lhs, rhs)`.
    fn minimum(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Self::Ciphertext {
        let less = self.less_than(lhs, rhs);
        self.select(&less, lhs, rhs)
    }

    /// Encrypted `max(lhs, rhs)`.
    fn maximum(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> Self::Ciphertext {
        let less = self.less_than(lhs, rhs);
        self.select(&less, rhs, lhs)
    }

    /// Disjunction over a sequence of encrypted booleans. Empty is false.
    fn or_all<'a, I>(&self, values: I) -> Self::Ciphertext
    where
        I: IntoIterator<Item = &'a Self::Ciphertext>,
        Self::Ciphertext: 'a,
    {
        values
            .into_iter()
            .fold(self.trivial(0), |acc, value| self.or(&acc, value))
    }

    /// Sum over a sequence of ciphertexts. Empty is zero.
    fn sum<'a, I>(&self, values: I) -> Self::Ciphertext
    where
        I: IntoIterator<Item = &'a Self::Ciphertext>,
        Self::Ciphertext: 'a,
    {
        values
            .into_iter()
            .fold(self.trivial(0), |acc, value| self.add(&acc, value))
    }
}

/// Plaintext access to engine ciphertexts, for audits and tests only.
///
/// Real deployments have no such capability inside the engine; the
/// simulated backend exposes it so invariants can be checked.
pub trait AuditDecrypt: FheBackend {
    /// Decrypt an engine ciphertext.
    fn audit(&self, value: &Self::Ciphertext) -> u32;
}
