use crate::bid::{Bid, BidLedger, Escrow};
use crate::commitment::{sealed, Commitment, CommitmentScheme, HashOpening};
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::events::GameEvent;
use crate::phase::PhaseMachine;
use crate::settlement::{AttestationPolicy, Payout, Settlement, SettlementInput};
use crate::types::{GameId, Identity, Phase, Variant, MIN_QUORUM};
use bitcoin::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key and note published by the manager when evaluation starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    pub private_key: Vec<u8>,
    pub message: String,
    pub disclosed_at: DateTime<Utc>,
}

/// Variant-specific state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantState {
    Decentralized,
    Managed {
        /// Opaque blob supplied at creation
        public_key: Vec<u8>,
        disclosure: Option<Disclosure>,
    },
}

impl VariantState {
    pub fn variant(&self) -> Variant {
        match self {
            VariantState::Decentralized => Variant::Decentralized,
            VariantState::Managed { .. } => Variant::Managed,
        }
    }
}

/// One match of the sealed-bid number game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    id: GameId,
    manager: Identity,
    state: VariantState,
    config: GameConfig,
    phase: PhaseMachine,
    ledger: BidLedger,
    payout: Option<Payout>,
    created_at: DateTime<Utc>,
}

impl Game {
    /// Create a self-verified game; it opens for betting immediately
    pub fn decentralized(
        id: GameId,
        manager: Identity,
        config: GameConfig,
        message: impl Into<String>,
    ) -> Result<(Self, Vec<GameEvent>)> {
        Self::create(id, manager, VariantState::Decentralized, config, message.into())
    }

    /// Create a manager-mediated game; bids are sealed to `public_key`
    pub fn managed(
        id: GameId,
        manager: Identity,
        public_key: Vec<u8>,
        config: GameConfig,
        message: impl Into<String>,
    ) -> Result<(Self, Vec<GameEvent>)> {
        let state = VariantState::Managed {
            public_key,
            disclosure: None,
        };
        Self::create(id, manager, state, config, message.into())
    }

    fn create(
        id: GameId,
        manager: Identity,
        state: VariantState,
        config: GameConfig,
        message: String,
    ) -> Result<(Self, Vec<GameEvent>)> {
        config.validate()?;

        let variant = state.variant();
        let mut game = Self {
            id,
            manager: manager.clone(),
            state,
            ledger: BidLedger::new(config.stake),
            config,
            phase: PhaseMachine::new(id, variant),
            payout: None,
            created_at: Utc::now(),
        };

        let from = game.phase.advance(Phase::Betting)?;

        let events = vec![
            GameEvent::GameCreated {
                game_id: id,
                variant,
                manager,
                message,
            },
            GameEvent::PhaseAdvanced {
                game_id: id,
                from,
                to: Phase::Betting,
                message: None,
            },
        ];
        Ok((game, events))
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn manager(&self) -> &Identity {
        &self.manager
    }

    pub fn variant(&self) -> Variant {
        self.state.variant()
    }

    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn stake(&self) -> Amount {
        self.ledger.stake()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn bids(&self) -> &[Bid] {
        self.ledger.bids()
    }

    pub fn bid(&self, participant: &Identity) -> Option<&Bid> {
        self.ledger.get(participant)
    }

    pub fn escrow(&self) -> Escrow {
        self.ledger.escrow()
    }

    /// Value currently held in escrow
    pub fn balance(&self) -> Amount {
        self.ledger.escrow().held()
    }

    pub fn payout(&self) -> Option<&Payout> {
        self.payout.as_ref()
    }

    pub fn winner(&self) -> Option<&Identity> {
        self.payout.as_ref().map(|p| &p.winner)
    }

    pub fn winner_prize(&self) -> Option<Amount> {
        self.payout.as_ref().map(|p| p.winner_prize)
    }

    pub fn manager_fee(&self) -> Option<Amount> {
        self.payout.as_ref().map(|p| p.manager_fee)
    }

    pub fn possible_winners(&self) -> &[Identity] {
        self.payout
            .as_ref()
            .map(|p| p.possible_winners.as_slice())
            .unwrap_or_default()
    }

    pub fn manager_public_key(&self) -> Option<&[u8]> {
        match &self.state {
            VariantState::Managed { public_key, .. } => Some(public_key),
            VariantState::Decentralized => None,
        }
    }

    pub fn disclosure(&self) -> Option<&Disclosure> {
        match &self.state {
            VariantState::Managed { disclosure, .. } => disclosure.as_ref(),
            VariantState::Decentralized => None,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.phase.is_ended() {
            return Err(GameError::GameEnded(self.id));
        }
        Ok(())
    }

    fn ensure_variant(&self, variant: Variant) -> Result<()> {
        if self.variant() != variant {
            return Err(GameError::WrongVariant(self.variant().as_str()));
        }
        Ok(())
    }

    fn ensure_quorum(&self) -> Result<()> {
        if self.ledger.len() < MIN_QUORUM {
            return Err(GameError::InsufficientParticipants {
                required: MIN_QUORUM,
                actual: self.ledger.len(),
            });
        }
        Ok(())
    }

    fn ensure_participant_or_manager(&self, caller: &Identity) -> Result<()> {
        if caller != &self.manager && !self.ledger.contains(caller) {
            return Err(GameError::NotParticipant(caller.clone()));
        }
        Ok(())
    }

    fn ensure_manager(&self, caller: &Identity) -> Result<()> {
        if caller != &self.manager {
            return Err(GameError::NotManager(caller.clone()));
        }
        Ok(())
    }

    /// Place a bid with its stake
    pub fn commit(
        &mut self,
        participant: Identity,
        commitment: Commitment,
        stake: Amount,
    ) -> Result<Vec<GameEvent>> {
        self.phase.require(Phase::Betting)?;
        self.ledger.check_commit(&participant, stake)?;

        if commitment.variant() != self.variant() {
            return Err(GameError::malformed_commitment(format!(
                "{} games do not accept this commitment form",
                self.variant()
            )));
        }
        if let Commitment::Sealed(sealed) = &commitment {
            sealed.validate()?;
        }

        let participant = self
            .ledger
            .insert(participant, commitment, stake)?
            .participant()
            .clone();
        tracing::info!("Game {}: {} placed a bid", self.id, participant);

        Ok(vec![GameEvent::BidAccepted {
            game_id: self.id,
            participant,
            stake,
            bid_count: self.ledger.len(),
        }])
    }

    /// Close betting and open self-verification
    pub fn begin_verification(
        &mut self,
        caller: &Identity,
        message: impl Into<String>,
    ) -> Result<Vec<GameEvent>> {
        self.ensure_live()?;
        self.ensure_variant(Variant::Decentralized)?;
        self.phase.check_advance(Phase::Verification)?;
        self.ensure_quorum()?;
        self.ensure_participant_or_manager(caller)?;

        let from = self.phase.advance(Phase::Verification)?;

        Ok(vec![GameEvent::PhaseAdvanced {
            game_id: self.id,
            from,
            to: Phase::Verification,
            message: Some(message.into()),
        }])
    }

    /// Reveal a committed number; the last successful reveal starts evaluation
    pub fn reveal(
        &mut self,
        participant: &Identity,
        number: u16,
        secret: &str,
    ) -> Result<Vec<GameEvent>> {
        self.ensure_live()?;
        self.ensure_variant(Variant::Decentralized)?;
        self.phase.require(Phase::Verification)?;

        let bid = self
            .ledger
            .get(participant)
            .ok_or_else(|| GameError::NotParticipant(participant.clone()))?;

        if bid.is_verified() {
            return Err(GameError::AlreadyVerified(participant.clone()));
        }

        let hash = bid
            .commitment()
            .as_hashed()
            .ok_or_else(|| GameError::internal("Decentralized bid without a hash commitment"))?;

        let opening = HashOpening {
            number,
            secret: secret.to_string(),
            identity: participant.clone(),
        };
        if !hash.verify(&opening) {
            tracing::warn!("Game {}: reveal by {} does not match", self.id, participant);
            return Err(GameError::CommitmentMismatch(participant.clone()));
        }

        self.ledger
            .get_mut(participant)
            .ok_or_else(|| GameError::NotParticipant(participant.clone()))?
            .mark_verified(number);

        let mut events = vec![GameEvent::BidVerified {
            game_id: self.id,
            participant: participant.clone(),
            value: number,
        }];

        if self.ledger.all_verified() {
            let from = self.phase.advance(Phase::Evaluation)?;
            events.push(GameEvent::PhaseAdvanced {
                game_id: self.id,
                from,
                to: Phase::Evaluation,
                message: Some("All bids verified".to_string()),
            });
        }

        Ok(events)
    }

    /// Publish the decryption key and start evaluation
    pub fn disclose_key(
        &mut self,
        caller: &Identity,
        private_key: Vec<u8>,
        message: impl Into<String>,
    ) -> Result<Vec<GameEvent>> {
        self.ensure_live()?;
        self.ensure_variant(Variant::Managed)?;
        self.phase.check_advance(Phase::Evaluation)?;
        self.ensure_quorum()?;
        self.ensure_manager(caller)?;

        if self.config.attestation == AttestationPolicy::VerifyCiphertexts {
            let expected = self.manager_public_key().unwrap_or_default();
            if sealed::public_key_for(&private_key)? != expected {
                return Err(GameError::crypto(
                    "Disclosed key does not match the manager public key",
                ));
            }
        }

        let message = message.into();
        let from = self.phase.advance(Phase::Evaluation)?;

        if let VariantState::Managed { disclosure, .. } = &mut self.state {
            *disclosure = Some(Disclosure {
                private_key: private_key.clone(),
                message: message.clone(),
                disclosed_at: Utc::now(),
            });
        }

        Ok(vec![
            GameEvent::KeyDisclosed {
                game_id: self.id,
                private_key,
                message: message.clone(),
            },
            GameEvent::PhaseAdvanced {
                game_id: self.id,
                from,
                to: Phase::Evaluation,
                message: Some(message),
            },
        ])
    }

    /// Pick the winner and pay out the pool.
    ///
    /// Decentralized games take no input; managed games need the manager's
    /// decrypted values.
    pub fn end_game(
        &mut self,
        caller: &Identity,
        input: Option<&SettlementInput>,
    ) -> Result<Vec<GameEvent>> {
        self.ensure_live()?;

        let settlement = match self.variant() {
            Variant::Decentralized => {
                self.phase.require(Phase::Evaluation)?;
                self.ensure_participant_or_manager(caller)?;
                if input.is_some() {
                    return Err(GameError::malformed_input(
                        "Decentralized games settle from verified bids only",
                    ));
                }
                Settlement::SelfVerified
            }
            Variant::Managed => {
                self.ensure_manager(caller)?;
                self.phase.require(Phase::Evaluation)?;
                let input = input
                    .ok_or_else(|| GameError::malformed_input("Managed games need reported values"))?;
                Settlement::ManagerAttested {
                    input,
                    policy: self.config.attestation,
                    disclosed_key: self.disclosure().map(|d| d.private_key.as_slice()),
                }
            }
        };

        let reveals = settlement.collect(&self.ledger)?;
        // Some(verified) when values came from the manager
        let attested = match settlement {
            Settlement::SelfVerified => None,
            Settlement::ManagerAttested { policy, .. } => {
                Some(policy == AttestationPolicy::VerifyCiphertexts)
            }
        };
        let selection = self
            .config
            .winner_rule
            .select(&reveals)
            .ok_or_else(|| GameError::malformed_input("No values to settle"))?;

        let pool = self.ledger.escrow().held();
        let fee_bps = self.config.effective_fee_bps(self.variant());
        let payout = Payout::compute(pool, fee_bps, selection)?;
        self.phase.check_advance(Phase::Ended)?;

        // validated, apply
        self.ledger.release(payout.total())?;
        if let Some(verified) = attested {
            for reveal in &reveals {
                if let Some(bid) = self.ledger.get_mut(&reveal.participant) {
                    bid.record_value(reveal.value, verified);
                }
            }
        }
        let from = self.phase.advance(Phase::Ended)?;

        let events = vec![
            GameEvent::WinnerAnnounced {
                game_id: self.id,
                winner: payout.winner.clone(),
                winner_prize: payout.winner_prize,
                winning_value: payout.winning_value,
                manager_fee: payout.manager_fee,
            },
            GameEvent::PhaseAdvanced {
                game_id: self.id,
                from,
                to: Phase::Ended,
                message: None,
            },
        ];

        tracing::info!(
            "Game {} ended. Winner: {} ({} sats)",
            self.id,
            payout.winner,
            payout.winner_prize.to_sat()
        );
        self.payout = Some(payout);

        Ok(events)
    }

    pub fn info(&self) -> GameInfo {
        GameInfo {
            id: self.id,
            variant: self.variant(),
            manager: self.manager.clone(),
            phase: self.phase(),
            stake: self.stake(),
            bid_count: self.ledger.len(),
            balance: self.balance(),
            winner: self.winner().cloned(),
            winner_prize: self.winner_prize(),
            manager_fee: self.manager_fee(),
            created_at: self.created_at,
        }
    }
}

/// Game summary for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInfo {
    pub id: GameId,
    pub variant: Variant,
    pub manager: Identity,
    pub phase: Phase,
    pub stake: Amount,
    pub bid_count: usize,
    pub balance: Amount,
    pub winner: Option<Identity>,
    pub winner_prize: Option<Amount>,
    pub manager_fee: Option<Amount>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{HashCommitment, SealedNumber};
    use crate::settlement::WinnerRule;
    use uuid::Uuid;

    const STAKE: Amount = Amount::from_sat(1_000);
    const MANAGER_SECRET: [u8; 32] = [0x42; 32];

    fn id(name: &str) -> Identity {
        Identity::new(name)
    }

    fn decentralized_game() -> Game {
        let (game, _) = Game::decentralized(
            Uuid::new_v4(),
            id("manager"),
            GameConfig::new(STAKE),
            "new game",
        )
        .unwrap();
        game
    }

    fn managed_game(config: GameConfig) -> Game {
        let public_key = sealed::public_key_for(&MANAGER_SECRET).unwrap();
        let (game, _) =
            Game::managed(Uuid::new_v4(), id("manager"), public_key, config, "new game").unwrap();
        game
    }

    fn hashed(number: u16, secret: &str, who: &str) -> Commitment {
        HashCommitment::new(number, secret, &id(who)).into()
    }

    fn sealed_bid(game: &Game, number: u16) -> Commitment {
        SealedNumber::seal(game.manager_public_key().unwrap(), number)
            .unwrap()
            .into()
    }

    /// Three decentralized bids: A=500, B=350, C=400
    fn decentralized_with_bids() -> Game {
        let mut game = decentralized_game();
        game.commit(id("A"), hashed(500, "pwA", "A"), STAKE).unwrap();
        game.commit(id("B"), hashed(350, "pwB", "B"), STAKE).unwrap();
        game.commit(id("C"), hashed(400, "pwC", "C"), STAKE).unwrap();
        game
    }

    fn managed_with_bids(config: GameConfig) -> Game {
        let mut game = managed_game(config);
        for (who, number) in [("A", 500), ("B", 350), ("C", 400)] {
            let bid = sealed_bid(&game, number);
            game.commit(id(who), bid, STAKE).unwrap();
        }
        game
    }

    fn reported(values: &[(&str, u16)]) -> SettlementInput {
        SettlementInput::new(values.iter().map(|(who, v)| (id(who), *v)).collect())
    }

    #[test]
    fn test_new_game_opens_betting() {
        let (game, events) =
            Game::decentralized(Uuid::new_v4(), id("manager"), GameConfig::new(STAKE), "hi")
                .unwrap();

        assert_eq!(game.phase(), Phase::Betting);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], GameEvent::GameCreated { .. }));
        assert!(game.winner().is_none());
        assert!(game.manager_public_key().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Game::decentralized(
            Uuid::new_v4(),
            id("manager"),
            GameConfig::new(Amount::ZERO),
            "",
        );
        assert!(matches!(result, Err(GameError::Config(_))));
    }

    #[test]
    fn test_commit_requires_matching_form() {
        let mut game = decentralized_game();
        let sealed = Commitment::Sealed(SealedNumber::from_bytes(vec![1; 63]));

        let err = game.commit(id("A"), sealed, STAKE).unwrap_err();
        assert!(matches!(err, GameError::MalformedCommitment(_)));
        assert!(game.bids().is_empty());
    }

    #[test]
    fn test_stake_checked_before_duplicate() {
        let mut game = decentralized_game();
        game.commit(id("A"), hashed(1, "s", "A"), STAKE).unwrap();

        let err = game
            .commit(id("A"), hashed(2, "s", "A"), Amount::ZERO)
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientStake { .. }));

        let err = game.commit(id("A"), hashed(2, "s", "A"), STAKE).unwrap_err();
        assert!(matches!(err, GameError::DuplicateBid(_)));
        assert_eq!(game.bid(&id("A")).unwrap().commitment(), &hashed(1, "s", "A"));
        assert_eq!(game.balance(), STAKE);
    }

    #[test]
    fn test_quorum_gate() {
        let mut game = decentralized_game();
        game.commit(id("A"), hashed(500, "pwA", "A"), STAKE).unwrap();
        game.commit(id("B"), hashed(350, "pwB", "B"), STAKE).unwrap();

        for caller in ["B", "manager", "stranger"] {
            let err = game.begin_verification(&id(caller), "go").unwrap_err();
            assert!(matches!(
                err,
                GameError::InsufficientParticipants {
                    required: 3,
                    actual: 2
                }
            ));
        }
        assert_eq!(game.phase(), Phase::Betting);

        game.commit(id("C"), hashed(400, "pwC", "C"), STAKE).unwrap();
        game.begin_verification(&id("manager"), "go").unwrap();
        assert_eq!(game.phase(), Phase::Verification);
    }

    #[test]
    fn test_begin_verification_needs_participant_or_manager() {
        let mut game = decentralized_with_bids();

        let err = game.begin_verification(&id("stranger"), "go").unwrap_err();
        assert!(matches!(err, GameError::NotParticipant(_)));

        game.begin_verification(&id("A"), "go").unwrap();
        let err = game.begin_verification(&id("A"), "again").unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase { .. }));
    }

    #[test]
    fn test_commit_frozen_after_betting() {
        let mut game = decentralized_with_bids();
        game.begin_verification(&id("A"), "go").unwrap();

        let err = game.commit(id("D"), hashed(1, "s", "D"), STAKE).unwrap_err();
        assert!(matches!(
            err,
            GameError::InvalidPhase {
                current: Phase::Verification
            }
        ));
    }

    #[test]
    fn test_reveal_before_verification_fails() {
        let mut game = decentralized_with_bids();
        let err = game.reveal(&id("A"), 500, "pwA").unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase { .. }));
        assert!(!game.bid(&id("A")).unwrap().is_verified());
    }

    #[test]
    fn test_decentralized_scenario() {
        let mut game = decentralized_with_bids();
        game.begin_verification(&id("manager"), "reveal your numbers")
            .unwrap();

        game.reveal(&id("A"), 500, "pwA").unwrap();
        game.reveal(&id("C"), 400, "pwC").unwrap();
        assert_eq!(game.phase(), Phase::Verification);

        let err = game.reveal(&id("B"), 999, "pwB").unwrap_err();
        assert!(matches!(err, GameError::CommitmentMismatch(_)));
        assert!(!game.bid(&id("B")).unwrap().is_verified());
        assert_eq!(game.bid(&id("B")).unwrap().revealed_value(), None);

        let events = game.reveal(&id("B"), 350, "pwB").unwrap();
        assert_eq!(game.phase(), Phase::Evaluation);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::PhaseAdvanced {
                to: Phase::Evaluation,
                ..
            }
        )));

        let events = game.end_game(&id("A"), None).unwrap();
        assert_eq!(game.phase(), Phase::Ended);
        assert_eq!(game.winner(), Some(&id("B")));
        assert_eq!(game.winner_prize(), Some(Amount::from_sat(3_000)));
        assert_eq!(game.manager_fee(), Some(Amount::ZERO));
        assert_eq!(game.balance(), Amount::ZERO);
        assert!(matches!(events[0], GameEvent::WinnerAnnounced { .. }));
    }

    #[test]
    fn test_evaluation_freezes_reveals() {
        let mut game = decentralized_with_bids();
        game.begin_verification(&id("A"), "go").unwrap();
        for (who, number, secret) in [("A", 500, "pwA"), ("B", 350, "pwB"), ("C", 400, "pwC")] {
            game.reveal(&id(who), number, secret).unwrap();
        }
        assert_eq!(game.phase(), Phase::Evaluation);
        let before = game.bids().to_vec();

        let err = game.reveal(&id("B"), 350, "pwB").unwrap_err();
        assert!(matches!(
            err,
            GameError::InvalidPhase {
                current: Phase::Evaluation
            }
        ));
        let err = game.reveal(&id("D"), 1, "x").unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase { .. }));

        assert_eq!(game.phase(), Phase::Evaluation);
        assert_eq!(game.bids(), before.as_slice());
        assert_eq!(game.balance(), Amount::from_sat(3_000));
    }

    #[test]
    fn test_copied_commitment_from_suffix_identity() {
        let mut game = decentralized_game();
        let victim = id("0xabA");
        let copied = hashed(350, "pw", "0xabA");
        game.commit(victim.clone(), copied.clone(), STAKE).unwrap();
        game.commit(id("A"), copied, STAKE).unwrap();
        game.commit(id("C"), hashed(400, "pwC", "C"), STAKE).unwrap();
        game.begin_verification(&id("C"), "go").unwrap();

        let err = game.reveal(&id("A"), 350, "pw0xab").unwrap_err();
        assert!(matches!(err, GameError::CommitmentMismatch(_)));
        assert!(!game.bid(&id("A")).unwrap().is_verified());

        game.reveal(&victim, 350, "pw").unwrap();
    }

    #[test]
    fn test_reveal_rejects_repeats_and_strangers() {
        let mut game = decentralized_with_bids();
        game.begin_verification(&id("A"), "go").unwrap();
        game.reveal(&id("A"), 500, "pwA").unwrap();

        let err = game.reveal(&id("A"), 500, "pwA").unwrap_err();
        assert!(matches!(err, GameError::AlreadyVerified(_)));

        let err = game.reveal(&id("D"), 1, "x").unwrap_err();
        assert!(matches!(err, GameError::NotParticipant(_)));
    }

    #[test]
    fn test_reveal_with_someone_elses_opening_fails() {
        let mut game = decentralized_game();
        // B copies A's commitment verbatim
        game.commit(id("A"), hashed(500, "pwA", "A"), STAKE).unwrap();
        game.commit(id("B"), hashed(500, "pwA", "A"), STAKE).unwrap();
        game.commit(id("C"), hashed(400, "pwC", "C"), STAKE).unwrap();
        game.begin_verification(&id("A"), "go").unwrap();

        let err = game.reveal(&id("B"), 500, "pwA").unwrap_err();
        assert!(matches!(err, GameError::CommitmentMismatch(_)));
    }

    #[test]
    fn test_decentralized_end_game_rejects_input() {
        let mut game = decentralized_with_bids();
        game.begin_verification(&id("A"), "go").unwrap();
        for (who, number, secret) in [("A", 500, "pwA"), ("B", 350, "pwB"), ("C", 400, "pwC")] {
            game.reveal(&id(who), number, secret).unwrap();
        }

        let input = reported(&[("A", 1)]);
        let err = game.end_game(&id("A"), Some(&input)).unwrap_err();
        assert!(matches!(err, GameError::MalformedSettlementInput(_)));

        let err = game.end_game(&id("stranger"), None).unwrap_err();
        assert!(matches!(err, GameError::NotParticipant(_)));
        assert_eq!(game.phase(), Phase::Evaluation);
    }

    #[test]
    fn test_managed_scenario() {
        let mut game = managed_with_bids(GameConfig::new(STAKE));
        let input = reported(&[("A", 500), ("B", 350), ("C", 400)]);

        let err = game.end_game(&id("C"), Some(&input)).unwrap_err();
        assert!(matches!(err, GameError::NotManager(_)));

        let err = game.end_game(&id("manager"), Some(&input)).unwrap_err();
        assert!(matches!(
            err,
            GameError::InvalidPhase {
                current: Phase::Betting
            }
        ));

        game.disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "key inside")
            .unwrap();
        assert_eq!(game.phase(), Phase::Evaluation);
        let disclosure = game.disclosure().unwrap();
        assert_eq!(disclosure.message, "key inside");

        // anyone can now read the bids
        let opened: Vec<u16> = game
            .bids()
            .iter()
            .map(|b| {
                b.commitment()
                    .as_sealed()
                    .unwrap()
                    .open(&disclosure.private_key)
                    .unwrap()
            })
            .collect();
        assert_eq!(opened, vec![500, 350, 400]);

        game.end_game(&id("manager"), Some(&input)).unwrap();
        assert_eq!(game.winner(), Some(&id("B")));
        assert_eq!(game.winner_prize(), Some(Amount::from_sat(2_700)));
        assert_eq!(game.manager_fee(), Some(Amount::from_sat(300)));
        assert_eq!(
            game.winner_prize().unwrap() + game.manager_fee().unwrap(),
            Amount::from_sat(3_000)
        );
        assert_eq!(game.bid(&id("A")).unwrap().revealed_value(), Some(500));
    }

    #[test]
    fn test_managed_quorum_and_manager_checks() {
        let mut game = managed_game(GameConfig::new(STAKE));
        for (who, number) in [("A", 500), ("B", 350)] {
            let bid = sealed_bid(&game, number);
            game.commit(id(who), bid, STAKE).unwrap();
        }

        let err = game
            .disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "early")
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientParticipants { .. }));

        let bid = sealed_bid(&game, 400);
        game.commit(id("C"), bid, STAKE).unwrap();

        let err = game
            .disclose_key(&id("A"), MANAGER_SECRET.to_vec(), "not mine")
            .unwrap_err();
        assert!(matches!(err, GameError::NotManager(_)));

        game.disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "ok")
            .unwrap();
        let err = game
            .disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "twice")
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase { .. }));
    }

    #[test]
    fn test_managed_rejects_placeholder_ciphertext() {
        let mut game = managed_game(GameConfig::new(STAKE));
        let placeholder = SealedNumber::from_bytes(b"encryptedNumberString".to_vec());

        let err = game
            .commit(id("A"), placeholder.into(), STAKE)
            .unwrap_err();
        assert!(matches!(err, GameError::MalformedCommitment(_)));

        let err = game
            .commit(id("A"), hashed(1, "s", "A"), STAKE)
            .unwrap_err();
        assert!(matches!(err, GameError::MalformedCommitment(_)));
        assert!(game.bids().is_empty());
    }

    #[test]
    fn test_managed_settlement_input_validation() {
        let mut game = managed_with_bids(GameConfig::new(STAKE));
        game.disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "ok")
            .unwrap();

        for input in [
            reported(&[]),
            reported(&[("A", 1), ("D", 2)]),
            reported(&[("A", 1), ("A", 2)]),
        ] {
            let err = game.end_game(&id("manager"), Some(&input)).unwrap_err();
            assert!(matches!(err, GameError::MalformedSettlementInput(_)));
        }

        let err = game.end_game(&id("manager"), None).unwrap_err();
        assert!(matches!(err, GameError::MalformedSettlementInput(_)));

        assert_eq!(game.phase(), Phase::Evaluation);
        assert_eq!(game.balance(), Amount::from_sat(3_000));
    }

    #[test]
    fn test_trusted_attestation_accepts_any_values() {
        let mut game = managed_with_bids(GameConfig::new(STAKE));
        game.disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "ok")
            .unwrap();

        let input = reported(&[("A", 900), ("B", 900), ("C", 600)]);
        game.end_game(&id("manager"), Some(&input)).unwrap();

        assert_eq!(game.winner(), Some(&id("C")));
        assert!(!game.bid(&id("C")).unwrap().is_verified());
    }

    #[test]
    fn test_verified_attestation_catches_false_values() {
        let config = GameConfig::new(STAKE).with_attestation(AttestationPolicy::VerifyCiphertexts);
        let mut game = managed_with_bids(config);

        let err = game
            .disclose_key(&id("manager"), [0x07; 32].to_vec(), "wrong key")
            .unwrap_err();
        assert!(matches!(err, GameError::Crypto(_)));

        game.disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "ok")
            .unwrap();

        // leaving out the real lowest bid is refused
        let partial = reported(&[("A", 500), ("C", 400)]);
        let err = game.end_game(&id("manager"), Some(&partial)).unwrap_err();
        assert!(matches!(err, GameError::MalformedSettlementInput(_)));

        let lie = reported(&[("A", 900), ("B", 350), ("C", 400)]);
        let err = game.end_game(&id("manager"), Some(&lie)).unwrap_err();
        assert!(matches!(err, GameError::AttestationMismatch { .. }));
        assert_eq!(game.phase(), Phase::Evaluation);

        let truth = reported(&[("A", 500), ("B", 350), ("C", 400)]);
        game.end_game(&id("manager"), Some(&truth)).unwrap();
        assert!(game.bid(&id("B")).unwrap().is_verified());
    }

    #[test]
    fn test_winner_rule_is_configurable() {
        let config = GameConfig::new(STAKE).with_winner_rule(WinnerRule::ClosestTo { target: 450 });
        let mut game = managed_with_bids(config);
        game.disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "ok")
            .unwrap();

        let input = reported(&[("A", 500), ("B", 350), ("C", 400)]);
        game.end_game(&id("manager"), Some(&input)).unwrap();

        // 500 and 400 are both 50 away; A bid first
        assert_eq!(game.winner(), Some(&id("A")));
        assert_eq!(game.possible_winners(), &[id("A"), id("C")]);
    }

    #[test]
    fn test_ended_game_rejects_everything() {
        let mut game = managed_with_bids(GameConfig::new(STAKE));
        game.disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "ok")
            .unwrap();
        let input = reported(&[("A", 500), ("B", 350), ("C", 400)]);
        game.end_game(&id("manager"), Some(&input)).unwrap();

        let bid = sealed_bid(&game, 1);
        assert!(matches!(
            game.commit(id("D"), bid, STAKE),
            Err(GameError::GameEnded(_))
        ));
        assert!(matches!(
            game.disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "again"),
            Err(GameError::GameEnded(_))
        ));
        assert!(matches!(
            game.end_game(&id("manager"), Some(&input)),
            Err(GameError::GameEnded(_))
        ));
        assert!(matches!(
            game.end_game(&id("A"), Some(&input)),
            Err(GameError::GameEnded(_))
        ));
    }

    #[test]
    fn test_variant_specific_calls() {
        let mut managed = managed_with_bids(GameConfig::new(STAKE));
        assert!(matches!(
            managed.begin_verification(&id("manager"), "go"),
            Err(GameError::WrongVariant(_))
        ));
        assert!(matches!(
            managed.reveal(&id("A"), 500, "pw"),
            Err(GameError::WrongVariant(_))
        ));

        let mut decentralized = decentralized_with_bids();
        assert!(matches!(
            decentralized.disclose_key(&id("manager"), MANAGER_SECRET.to_vec(), "x"),
            Err(GameError::WrongVariant(_))
        ));
    }
}
