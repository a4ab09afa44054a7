use crate::commitment::Commitment;
use crate::error::{GameError, Result};
use crate::types::Identity;
use bitcoin::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One participant's sealed bid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    participant: Identity,
    commitment: Commitment,
    stake: Amount,
    revealed_value: Option<u16>,
    verified: bool,
    placed_at: DateTime<Utc>,
}

impl Bid {
    fn new(participant: Identity, commitment: Commitment, stake: Amount) -> Self {
        Self {
            participant,
            commitment,
            stake,
            revealed_value: None,
            verified: false,
            placed_at: Utc::now(),
        }
    }

    pub fn participant(&self) -> &Identity {
        &self.participant
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    pub fn stake(&self) -> Amount {
        self.stake
    }

    pub fn revealed_value(&self) -> Option<u16> {
        self.revealed_value
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    /// Self-verified reveal
    pub(crate) fn mark_verified(&mut self, number: u16) {
        self.revealed_value = Some(number);
        self.verified = true;
    }

    /// Value reported by the manager; `verified` tells whether it was checked
    /// against the ciphertext
    pub(crate) fn record_value(&mut self, number: u16, verified: bool) {
        self.revealed_value = Some(number);
        self.verified = verified;
    }
}

/// Escrowed stakes of one game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    held: Amount,
    released: Amount,
}

impl Escrow {
    pub fn held(&self) -> Amount {
        self.held
    }

    pub fn released(&self) -> Amount {
        self.released
    }

    /// Everything ever paid in
    pub fn total(&self) -> Amount {
        self.held + self.released
    }
}

/// Insertion-ordered bids, at most one per identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidLedger {
    stake: Amount,
    bids: Vec<Bid>,
    escrow: Escrow,
}

impl BidLedger {
    pub fn new(stake: Amount) -> Self {
        Self {
            stake,
            bids: Vec::new(),
            escrow: Escrow {
                held: Amount::ZERO,
                released: Amount::ZERO,
            },
        }
    }

    pub fn stake(&self) -> Amount {
        self.stake
    }

    pub fn escrow(&self) -> Escrow {
        self.escrow
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bid> {
        self.bids.iter()
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn contains(&self, participant: &Identity) -> bool {
        self.get(participant).is_some()
    }

    pub fn get(&self, participant: &Identity) -> Option<&Bid> {
        self.bids.iter().find(|b| &b.participant == participant)
    }

    pub(crate) fn get_mut(&mut self, participant: &Identity) -> Option<&mut Bid> {
        self.bids.iter_mut().find(|b| &b.participant == participant)
    }

    /// Submission order of a participant's bid
    pub fn position(&self, participant: &Identity) -> Option<usize> {
        self.bids.iter().position(|b| &b.participant == participant)
    }

    pub fn all_verified(&self) -> bool {
        self.bids.iter().all(|b| b.verified)
    }

    /// Stake and uniqueness checks, without touching state
    pub fn check_commit(&self, participant: &Identity, attached: Amount) -> Result<()> {
        if attached != self.stake {
            return Err(GameError::InsufficientStake {
                required: self.stake.to_sat(),
                attached: attached.to_sat(),
            });
        }

        if self.contains(participant) {
            return Err(GameError::DuplicateBid(participant.clone()));
        }

        Ok(())
    }

    /// Append a bid and escrow its stake
    pub(crate) fn insert(
        &mut self,
        participant: Identity,
        commitment: Commitment,
        attached: Amount,
    ) -> Result<&Bid> {
        self.check_commit(&participant, attached)?;

        let held = self
            .escrow
            .held
            .checked_add(attached)
            .ok_or(GameError::Overflow(attached))?;

        self.escrow.held = held;
        self.bids.push(Bid::new(participant, commitment, attached));

        tracing::debug!(
            "Escrow now holds {} sats across {} bids",
            held.to_sat(),
            self.bids.len()
        );

        self.bids
            .last()
            .ok_or_else(|| GameError::internal("Bid vanished after insert"))
    }

    /// Move `amount` out of escrow
    pub(crate) fn release(&mut self, amount: Amount) -> Result<()> {
        let held = self.escrow.held.checked_sub(amount).ok_or_else(|| {
            GameError::internal(format!(
                "Cannot release {} sats, escrow holds {} sats",
                amount.to_sat(),
                self.escrow.held.to_sat()
            ))
        })?;
        let released = self
            .escrow
            .released
            .checked_add(amount)
            .ok_or(GameError::Overflow(amount))?;

        self.escrow.held = held;
        self.escrow.released = released;
        Ok(())
    }
}
