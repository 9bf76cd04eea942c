//! Signed view tokens.
//!
//! A token binds a re-encryption public key to the engine instance it is
//! presented to. The caller signs
//! `blake3(bincode(ViewDomain) || bincode(ReencryptMessage))` with the
//! ed25519 key behind its address; the engine recomputes the digest from its
//! own domain, so a token signed for another engine or chain never verifies.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::config::DomainConfig;
use crate::error::{EngineError, EngineResult};
use crate::fhe::ReencryptionKey;
use crate::game::Address;

/// Purpose string for re-encryption grants.
pub const REENCRYPT_PURPOSE: &str = "reencrypt";

/// Identity of the engine instance a token is valid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDomain {
    /// Application name.
    pub name: String,
    /// Protocol version.
    pub version: u32,
    /// Ledger chain identifier.
    pub chain_id: u64,
    /// Deployed engine label.
    pub verifying_engine: String,
}

impl From<&DomainConfig> for ViewDomain {
    fn from(config: &DomainConfig) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version,
            chain_id: config.chain_id,
            verifying_engine: config.verifying_engine.clone(),
        }
    }
}

/// The structured message a token signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReencryptMessage {
    /// Always [`REENCRYPT_PURPOSE`].
    pub purpose: String,
    /// Key the caller wants results sealed to.
    pub public_key: ReencryptionKey,
}

impl ViewDomain {
    /// Digest signed for `public_key` under this domain.
    ///
    /// # Errors
    ///
    /// Returns an error if either part fails to encode.
    pub fn signing_digest(&self, public_key: &ReencryptionKey) -> bincode::Result<[u8; 32]> {
        let message = ReencryptMessage {
            purpose: REENCRYPT_PURPOSE.to_string(),
            public_key: *public_key,
        };
        let mut hasher = blake3::Hasher::new();
        hasher.update(&bincode::serialize(self)?);
        hasher.update(&bincode::serialize(&message)?);
        Ok(*hasher.finalize().as_bytes())
    }
}

/// A re-encryption key plus the caller's signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewToken {
    /// Key results are sealed to.
    pub public_key: ReencryptionKey,
    /// 64-byte ed25519 signature.
    pub signature: Vec<u8>,
}

impl ViewToken {
    /// Sign a token for `public_key` under `domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to encode.
    pub fn sign(
        signer: &SigningKey,
        domain: &ViewDomain,
        public_key: ReencryptionKey,
    ) -> bincode::Result<Self> {
        let digest = domain.signing_digest(&public_key)?;
        let signature: Signature = signer.sign(&digest);
        Ok(Self {
            public_key,
            signature: signature.to_bytes().to_vec(),
        })
    }

    /// Check that `caller` signed this token for `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadToken`] naming the failed check.
    pub fn verify(&self, caller: &Address, domain: &ViewDomain) -> EngineResult<()> {
        let verifying_key = VerifyingKey::from_bytes(caller.as_bytes())
            .map_err(|_| EngineError::BadToken("caller address is not a verifying key"))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| EngineError::BadToken("malformed signature"))?;
        let digest = domain
            .signing_digest(&self.public_key)
            .map_err(|_| EngineError::BadToken("unencodable message"))?;
        verifying_key
            .verify(&digest, &signature)
            .map_err(|_| EngineError::BadToken("signature mismatch"))?;
        if !self.public_key.is_valid() {
            return Err(EngineError::BadToken("re-encryption key is not a curve point"));
        }
        Ok(())
    }
}
