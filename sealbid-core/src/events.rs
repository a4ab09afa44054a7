use crate::types::{GameId, Identity, Phase, Variant};
use bitcoin::Amount;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Notification published after a call has fully applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    GameCreated {
        game_id: GameId,
        variant: Variant,
        manager: Identity,
        message: String,
    },
    BidAccepted {
        game_id: GameId,
        participant: Identity,
        stake: Amount,
        bid_count: usize,
    },
    PhaseAdvanced {
        game_id: GameId,
        from: Phase,
        to: Phase,
        message: Option<String>,
    },
    BidVerified {
        game_id: GameId,
        participant: Identity,
        value: u16,
    },
    KeyDisclosed {
        game_id: GameId,
        private_key: Vec<u8>,
        message: String,
    },
    WinnerAnnounced {
        game_id: GameId,
        winner: Identity,
        winner_prize: Amount,
        winning_value: u16,
        manager_fee: Amount,
    },
}

impl GameEvent {
    pub fn game_id(&self) -> GameId {
        match self {
            GameEvent::GameCreated { game_id, .. }
            | GameEvent::BidAccepted { game_id, .. }
            | GameEvent::PhaseAdvanced { game_id, .. }
            | GameEvent::BidVerified { game_id, .. }
            | GameEvent::KeyDisclosed { game_id, .. }
            | GameEvent::WinnerAnnounced { game_id, .. } => *game_id,
        }
    }
}

/// An event with the time it was published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: GameEvent,
    pub published_at: DateTime<Utc>,
}

/// Receiver of game notifications
pub trait EventSink: Send + Sync {
    fn publish(&self, record: &EventRecord);
}

/// Logs every event through `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, record: &EventRecord) {
        match &record.event {
            GameEvent::GameCreated {
                game_id,
                variant,
                manager,
                ..
            } => tracing::info!("Game {} ({}) created by {}", game_id, variant, manager),
            GameEvent::BidAccepted {
                game_id,
                participant,
                stake,
                bid_count,
            } => tracing::info!(
                "Game {}: bid #{} from {} with {} sats",
                game_id,
                bid_count,
                participant,
                stake.to_sat()
            ),
            GameEvent::PhaseAdvanced {
                game_id, from, to, ..
            } => tracing::info!("Game {}: {:?} -> {:?}", game_id, from, to),
            GameEvent::BidVerified {
                game_id,
                participant,
                ..
            } => tracing::info!("Game {}: {} verified their bid", game_id, participant),
            GameEvent::KeyDisclosed { game_id, .. } => {
                tracing::info!("Game {}: manager disclosed the decryption key", game_id)
            }
            GameEvent::WinnerAnnounced {
                game_id,
                winner,
                winner_prize,
                winning_value,
                manager_fee,
            } => tracing::info!(
                "Game {}: {} wins {} sats with {} (manager fee {} sats)",
                game_id,
                winner,
                winner_prize.to_sat(),
                winning_value,
                manager_fee.to_sat()
            ),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.records.lock().iter().map(|r| r.event.clone()).collect()
    }

    pub fn events_for(&self, game_id: GameId) -> Vec<GameEvent> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.event.game_id() == game_id)
            .map(|r| r.event.clone())
            .collect()
    }
}

impl EventSink for MemorySink {
    fn publish(&self, record: &EventRecord) {
        self.records.lock().push(record.clone());
    }
}
