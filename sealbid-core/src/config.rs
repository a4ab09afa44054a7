use crate::error::{GameError, Result};
use crate::settlement::{AttestationPolicy, WinnerRule, HUNDRED_PERCENT_BPS};
use crate::types::Variant;
use bitcoin::Amount;
use serde::{Deserialize, Serialize};

/// Parameters fixed when a game is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Exact stake every bid must attach
    pub stake: Amount,
    pub winner_rule: WinnerRule,
    /// Manager's cut of the pool, managed games only
    pub manager_fee_bps: u16,
    /// How manager-reported values are checked, managed games only
    pub attestation: AttestationPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            stake: Amount::from_sat(1_000),
            winner_rule: WinnerRule::default(),
            manager_fee_bps: 1_000, // 10%
            attestation: AttestationPolicy::default(),
        }
    }
}

impl GameConfig {
    pub fn new(stake: Amount) -> Self {
        Self {
            stake,
            ..Self::default()
        }
    }

    pub fn with_winner_rule(mut self, rule: WinnerRule) -> Self {
        self.winner_rule = rule;
        self
    }

    pub fn with_manager_fee_bps(mut self, bps: u16) -> Self {
        self.manager_fee_bps = bps;
        self
    }

    pub fn with_attestation(mut self, attestation: AttestationPolicy) -> Self {
        self.attestation = attestation;
        self
    }

    /// Fee actually charged for a variant
    pub fn effective_fee_bps(&self, variant: Variant) -> u16 {
        match variant {
            Variant::Decentralized => 0,
            Variant::Managed => self.manager_fee_bps,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.stake == Amount::ZERO {
            return Err(GameError::config("Stake must be greater than 0"));
        }

        if u64::from(self.manager_fee_bps) > HUNDRED_PERCENT_BPS {
            return Err(GameError::config(format!(
                "Manager fee {} bps exceeds {} bps",
                self.manager_fee_bps, HUNDRED_PERCENT_BPS
            )));
        }

        Ok(())
    }
}

/// Registry-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Used when a game is created without its own config
    pub defaults: GameConfig,
    /// Log every published event through `tracing`
    pub log_events: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

impl RegistryConfig {
    pub fn new(defaults: GameConfig) -> Self {
        Self {
            defaults,
            log_events: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.defaults.validate()
    }
}
