use crate::types::{GameId, Identity, Phase};
use bitcoin::Amount;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Operation not allowed in phase {current:?}")]
    InvalidPhase { current: Phase },

    #[error("At least {required} bids required, have {actual}")]
    InsufficientParticipants { required: usize, actual: usize },

    #[error("Bid already placed by {0}")]
    DuplicateBid(Identity),

    #[error("Stake must be exactly {required} sats, got {attached} sats")]
    InsufficientStake { required: u64, attached: u64 },

    #[error("Number or secret does not match the commitment of {0}")]
    CommitmentMismatch(Identity),

    #[error("Caller {0} is not the game manager")]
    NotManager(Identity),

    #[error("Malformed settlement input: {0}")]
    MalformedSettlementInput(String),

    #[error("Game {0} has ended")]
    GameEnded(GameId),

    #[error("Malformed commitment: {0}")]
    MalformedCommitment(String),

    #[error("{0} has no bid in this game")]
    NotParticipant(Identity),

    #[error("Bid of {0} is already verified")]
    AlreadyVerified(Identity),

    #[error("Operation not supported by {0} games")]
    WrongVariant(&'static str),

    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error("Submitted value for {participant} does not open its ciphertext")]
    AttestationMismatch { participant: Identity },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Amount overflow adding {0}")]
    Overflow(Amount),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GameError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    pub fn malformed_input(msg: impl Into<String>) -> Self {
        Self::MalformedSettlementInput(msg.into())
    }

    pub fn malformed_commitment(msg: impl Into<String>) -> Self {
        Self::MalformedCommitment(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
