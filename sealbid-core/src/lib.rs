//! Sealbid - sealed-bid number games settled through an escrow
//!
//! Participants stake a fixed amount on a hidden number. Decentralized games
//! hide numbers behind hash commitments that each participant later reveals;
//! managed games seal numbers to a manager who discloses the key and reports
//! the values. A configurable winner rule picks the winning number and the
//! escrowed pool is paid out.

pub mod bid;
pub mod commitment;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod phase;
pub mod registry;
pub mod settlement;
pub mod storage;
pub mod types;

pub use bid::{Bid, BidLedger, Escrow};
pub use commitment::sealed::public_key_for;
pub use commitment::{
    Commitment, CommitmentScheme, HashCommitment, HashOpening, SealedNumber, SealedOpening,
};
pub use config::{GameConfig, RegistryConfig};
pub use error::{GameError, Result};
pub use events::{EventRecord, EventSink, GameEvent, MemorySink, TracingSink};
pub use game::{Disclosure, Game, GameInfo};
pub use registry::GameRegistry;
pub use settlement::{AttestationPolicy, Payout, SettlementInput, WinnerRule};
pub use storage::{GameRecord, GameStore, Storage};
pub use types::{GameId, Identity, Phase, Variant, MIN_QUORUM};

pub use ::bitcoin::Amount;
