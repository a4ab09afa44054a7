//! Winner selection and pool distribution.
//!
//! The two variants only differ in where revealed values come from: decentralized
//! games read them from self-verified bids, managed games take them from the
//! manager. Everything after that (winner rule, fee split) is shared.

use crate::bid::BidLedger;
use crate::commitment::{CommitmentScheme, SealedOpening};
use crate::error::{GameError, Result};
use crate::types::Identity;
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const HUNDRED_PERCENT_BPS: u64 = 10_000;

/// How the winning value is picked from the revealed values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum WinnerRule {
    /// Smallest value chosen by exactly one participant
    #[default]
    LowestUnique,
    /// Largest value chosen by exactly one participant
    HighestUnique,
    /// Value nearest to a fixed target
    ClosestTo { target: u16 },
}

/// Trust placed in values reported by a manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationPolicy {
    /// Reported values are taken as-is. This is a trust boundary: nothing ties
    /// them to the stored ciphertexts.
    #[default]
    Trusted,
    /// Every bid must be reported, and each value must open the participant's
    /// ciphertext under the disclosed key
    VerifyCiphertexts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedBid {
    pub participant: Identity,
    pub value: u16,
    /// Submission order, earliest wins ties
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub winner: Identity,
    pub winning_value: u16,
    /// Every participant the rule ranks equal to the winner
    pub candidates: Vec<Identity>,
}

impl WinnerRule {
    pub fn select(&self, reveals: &[RevealedBid]) -> Option<Selection> {
        if reveals.is_empty() {
            return None;
        }

        let mut candidates: Vec<&RevealedBid> = match *self {
            WinnerRule::ClosestTo { target } => {
                let distance = |r: &RevealedBid| r.value.abs_diff(target);
                let best = reveals.iter().map(distance).min()?;
                reveals.iter().filter(|r| distance(*r) == best).collect()
            }
            WinnerRule::LowestUnique | WinnerRule::HighestUnique => {
                let mut counts: BTreeMap<u16, usize> = BTreeMap::new();
                for reveal in reveals {
                    *counts.entry(reveal.value).or_default() += 1;
                }
                let mut unique = counts.iter().filter(|(_, n)| **n == 1).map(|(v, _)| *v);

                let value = if *self == WinnerRule::LowestUnique {
                    unique.next().or_else(|| counts.keys().next().copied())
                } else {
                    unique.last().or_else(|| counts.keys().next_back().copied())
                }?;
                reveals.iter().filter(|r| r.value == value).collect()
            }
        };

        candidates.sort_by_key(|r| r.order);
        let winner = candidates.first()?;

        Some(Selection {
            winner: winner.participant.clone(),
            winning_value: winner.value,
            candidates: candidates.iter().map(|r| r.participant.clone()).collect(),
        })
    }
}

/// Split the pool into winner prize and manager fee.
///
/// The fee rounds down and the prize takes the rest, so nothing is left over.
pub fn split_pool(pool: Amount, fee_bps: u16) -> Result<(Amount, Amount)> {
    if u64::from(fee_bps) > HUNDRED_PERCENT_BPS {
        return Err(GameError::config(format!("Fee of {} bps exceeds pool", fee_bps)));
    }

    let fee_sats = u128::from(pool.to_sat()) * u128::from(fee_bps) / u128::from(HUNDRED_PERCENT_BPS);
    let fee = Amount::from_sat(
        u64::try_from(fee_sats).map_err(|_| GameError::Overflow(pool))?,
    );
    let prize = pool
        .checked_sub(fee)
        .ok_or_else(|| GameError::internal("Fee larger than pool"))?;

    Ok((prize, fee))
}

/// Values a manager reports for settlement, as parallel address/value lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInput {
    entries: Vec<(Identity, u16)>,
}

impl SettlementInput {
    pub fn new(entries: Vec<(Identity, u16)>) -> Self {
        Self { entries }
    }

    pub fn from_arrays(addresses: Vec<Identity>, values: Vec<u16>) -> Result<Self> {
        if addresses.len() != values.len() {
            return Err(GameError::malformed_input(format!(
                "{} addresses but {} values",
                addresses.len(),
                values.len()
            )));
        }

        Ok(Self {
            entries: addresses.into_iter().zip(values).collect(),
        })
    }

    pub fn entries(&self) -> &[(Identity, u16)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of revealed values, one per variant
#[derive(Debug, Clone, Copy)]
pub enum Settlement<'a> {
    /// Values already verified on reveal
    SelfVerified,
    /// Values reported by the manager
    ManagerAttested {
        input: &'a SettlementInput,
        policy: AttestationPolicy,
        disclosed_key: Option<&'a [u8]>,
    },
}

impl Settlement<'_> {
    /// Revealed values in submission order, checked against the ledger
    pub fn collect(&self, ledger: &BidLedger) -> Result<Vec<RevealedBid>> {
        match *self {
            Settlement::SelfVerified => ledger
                .iter()
                .enumerate()
                .map(|(order, bid)| {
                    let value = bid
                        .revealed_value()
                        .filter(|_| bid.is_verified())
                        .ok_or_else(|| {
                            GameError::internal(format!(
                                "Bid of {} reached settlement unverified",
                                bid.participant()
                            ))
                        })?;
                    Ok(RevealedBid {
                        participant: bid.participant().clone(),
                        value,
                        order,
                    })
                })
                .collect(),
            Settlement::ManagerAttested {
                input,
                policy,
                disclosed_key,
            } => {
                if input.is_empty() {
                    return Err(GameError::malformed_input("No values submitted"));
                }
                if policy == AttestationPolicy::VerifyCiphertexts
                    && input.entries().len() != ledger.len()
                {
                    return Err(GameError::malformed_input(format!(
                        "Verified settlement needs all {} bids, got {}",
                        ledger.len(),
                        input.entries().len()
                    )));
                }

                let mut seen = HashSet::new();
                let mut reveals = Vec::with_capacity(input.entries().len());

                for (participant, value) in input.entries() {
                    if !seen.insert(participant) {
                        return Err(GameError::malformed_input(format!(
                            "{} listed twice",
                            participant
                        )));
                    }

                    let order = ledger.position(participant).ok_or_else(|| {
                        GameError::malformed_input(format!("{} has no bid", participant))
                    })?;

                    if policy == AttestationPolicy::VerifyCiphertexts {
                        verify_attested(ledger, participant, *value, disclosed_key)?;
                    }

                    reveals.push(RevealedBid {
                        participant: participant.clone(),
                        value: *value,
                        order,
                    });
                }

                reveals.sort_by_key(|r| r.order);
                Ok(reveals)
            }
        }
    }
}

fn verify_attested(
    ledger: &BidLedger,
    participant: &Identity,
    value: u16,
    disclosed_key: Option<&[u8]>,
) -> Result<()> {
    let private_key = disclosed_key
        .ok_or_else(|| GameError::crypto("No disclosed key to verify reported values"))?;

    let sealed = ledger
        .get(participant)
        .and_then(|bid| bid.commitment().as_sealed())
        .ok_or_else(|| GameError::malformed_input(format!("{} has no sealed bid", participant)))?;

    let opening = SealedOpening {
        private_key: private_key.to_vec(),
        number: value,
    };
    if !sealed.verify(&opening) {
        return Err(GameError::AttestationMismatch {
            participant: participant.clone(),
        });
    }

    Ok(())
}

/// Final distribution of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub winner: Identity,
    pub winning_value: u16,
    pub winner_prize: Amount,
    pub manager_fee: Amount,
    pub possible_winners: Vec<Identity>,
}

impl Payout {
    pub fn compute(pool: Amount, fee_bps: u16, selection: Selection) -> Result<Self> {
        let (winner_prize, manager_fee) = split_pool(pool, fee_bps)?;

        Ok(Self {
            winner: selection.winner,
            winning_value: selection.winning_value,
            winner_prize,
            manager_fee,
            possible_winners: selection.candidates,
        })
    }

    /// Everything paid out
    pub fn total(&self) -> Amount {
        self.winner_prize + self.manager_fee
    }
}
