//! Ordered phases of a game.
//!
//! Each variant walks a fixed sequence; a transition only ever moves one step
//! forward and `Ended` is terminal.

use crate::error::{GameError, Result};
use crate::types::{GameId, Phase, Variant};
use serde::{Deserialize, Serialize};

const DECENTRALIZED_SEQUENCE: &[Phase] = &[
    Phase::Created,
    Phase::Betting,
    Phase::Verification,
    Phase::Evaluation,
    Phase::Ended,
];

const MANAGED_SEQUENCE: &[Phase] = &[
    Phase::Created,
    Phase::Betting,
    Phase::Evaluation,
    Phase::Ended,
];

impl Variant {
    pub fn phases(&self) -> &'static [Phase] {
        match self {
            Variant::Decentralized => DECENTRALIZED_SEQUENCE,
            Variant::Managed => MANAGED_SEQUENCE,
        }
    }

    /// Phase following `phase`, if any
    pub fn next_phase(&self, phase: Phase) -> Option<Phase> {
        let phases = self.phases();
        phases
            .iter()
            .position(|p| *p == phase)
            .and_then(|i| phases.get(i + 1))
            .copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMachine {
    game_id: GameId,
    variant: Variant,
    phase: Phase,
}

impl PhaseMachine {
    pub fn new(game_id: GameId, variant: Variant) -> Self {
        Self {
            game_id,
            variant,
            phase: Phase::Created,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Guard for any mutating call that requires `expected`
    pub fn require(&self, expected: Phase) -> Result<()> {
        if self.is_ended() {
            return Err(GameError::GameEnded(self.game_id));
        }

        if self.phase != expected {
            return Err(GameError::InvalidPhase {
                current: self.phase,
            });
        }

        Ok(())
    }

    /// Guard for the step into `to`, without moving
    pub fn check_advance(&self, to: Phase) -> Result<()> {
        if self.is_ended() {
            return Err(GameError::GameEnded(self.game_id));
        }

        match self.variant.next_phase(self.phase) {
            Some(next) if next == to => Ok(()),
            _ => Err(GameError::InvalidPhase {
                current: self.phase,
            }),
        }
    }

    /// Move one step forward to `to`
    pub fn advance(&mut self, to: Phase) -> Result<Phase> {
        self.check_advance(to)?;

        let from = self.phase;
        self.phase = to;

        tracing::info!("Game {} moved from {:?} to {:?}", self.game_id, from, to);
        Ok(from)
    }
}
