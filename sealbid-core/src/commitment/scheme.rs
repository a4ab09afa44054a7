use crate::commitment::{HashCommitment, SealedNumber};
use crate::types::Variant;
use serde::{Deserialize, Serialize};

/// Trait for commitment schemes
pub trait CommitmentScheme {
    /// What a party must present to show the commitment hides a given number
    type Opening;

    fn verify(&self, opening: &Self::Opening) -> bool;
}

/// A commitment as stored in a bid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Commitment {
    Hashed(HashCommitment),
    Sealed(SealedNumber),
}

impl Commitment {
    /// Variant of game this commitment form belongs to
    pub fn variant(&self) -> Variant {
        match self {
            Commitment::Hashed(_) => Variant::Decentralized,
            Commitment::Sealed(_) => Variant::Managed,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Commitment::Hashed(hash) => hash.as_bytes(),
            Commitment::Sealed(sealed) => sealed.as_bytes(),
        }
    }

    pub fn as_hashed(&self) -> Option<&HashCommitment> {
        match self {
            Commitment::Hashed(hash) => Some(hash),
            Commitment::Sealed(_) => None,
        }
    }

    pub fn as_sealed(&self) -> Option<&SealedNumber> {
        match self {
            Commitment::Sealed(sealed) => Some(sealed),
            Commitment::Hashed(_) => None,
        }
    }
}

impl From<HashCommitment> for Commitment {
    fn from(hash: HashCommitment) -> Self {
        Commitment::Hashed(hash)
    }
}

impl From<SealedNumber> for Commitment {
    fn from(sealed: SealedNumber) -> Self {
        Commitment::Sealed(sealed)
    }
}
