use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stand-in for a game's ledger address.
pub type GameId = Uuid;

/// Minimum number of distinct bidders before a game may leave betting.
pub const MIN_QUORUM: usize = 3;

/// Opaque participant or manager address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Trust model of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// Participants reveal and verify their own bids
    Decentralized,
    /// Bids are sealed to the manager, who discloses the key and reports values
    Managed,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Decentralized => "decentralized",
            Variant::Managed => "managed",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = crate::GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decentralized" => Ok(Variant::Decentralized),
            "managed" => Ok(Variant::Managed),
            other => Err(crate::GameError::config(format!("Unknown variant: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Created,
    Betting,
    /// Decentralized only
    Verification,
    Evaluation,
    Ended,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::Betting => "betting",
            Phase::Verification => "verification",
            Phase::Evaluation => "evaluation",
            Phase::Ended => "ended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
