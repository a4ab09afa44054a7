pub mod scheme;
pub mod sealed;

pub use scheme::{Commitment, CommitmentScheme};
pub use sealed::{SealedNumber, SealedOpening};

use crate::error::{GameError, Result};
use crate::types::Identity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Binding hash over a number, a secret and the committing identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashCommitment([u8; 32]);

/// What a participant supplies on reveal
#[derive(Debug, Clone)]
pub struct HashOpening {
    pub number: u16,
    pub secret: String,
    pub identity: Identity,
}

impl HashCommitment {
    /// Encoding: number (big-endian) || secret || identity, each string
    /// prefixed with its length as a big-endian u32
    pub fn new(number: u16, secret: &str, identity: &Identity) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(number.to_be_bytes());
        update_prefixed(&mut hasher, secret.as_bytes());
        update_prefixed(&mut hasher, identity.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    pub fn from_hex(hex_hash: &str) -> Result<Self> {
        let bytes = hex::decode(hex_hash.trim_start_matches("0x"))
            .map_err(|e| GameError::malformed_commitment(format!("Invalid hex: {}", e)))?;
        let hash: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            GameError::malformed_commitment(format!("Expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(hash))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

fn update_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
}

impl CommitmentScheme for HashCommitment {
    type Opening = HashOpening;

    fn verify(&self, opening: &HashOpening) -> bool {
        Self::new(opening.number, &opening.secret, &opening.identity) == *self
    }
}

impl fmt::Display for HashCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
