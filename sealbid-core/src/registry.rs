use crate::bid::Bid;
use crate::commitment::Commitment;
use crate::config::{GameConfig, RegistryConfig};
use crate::error::{GameError, Result};
use crate::events::{EventRecord, EventSink, GameEvent, TracingSink};
use crate::game::{Disclosure, Game, GameInfo};
use crate::settlement::SettlementInput;
use crate::types::{GameId, Identity, Phase, Variant};
use bitcoin::Amount;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct RegistryState {
    games: HashMap<GameId, Game>,
    /// Append-only, creation order
    index: HashMap<Variant, Vec<GameId>>,
}

impl RegistryState {
    fn insert(&mut self, game: Game) {
        self.index.entry(game.variant()).or_default().push(game.id());
        self.games.insert(game.id(), game);
    }
}

/// Creates games and routes every call to the addressed one
pub struct GameRegistry {
    config: RegistryConfig,
    state: Arc<RwLock<RegistryState>>,
    sinks: Arc<RwLock<Vec<Arc<dyn EventSink>>>>,
}

impl GameRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let mut sinks: Vec<Arc<dyn EventSink>> = Vec::new();
        if config.log_events {
            sinks.push(Arc::new(TracingSink));
        }

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(RegistryState::default())),
            sinks: Arc::new(RwLock::new(sinks)),
        })
    }

    /// Rebuild a registry from stored games, oldest first
    pub fn from_games(config: RegistryConfig, games: Vec<Game>) -> Result<Self> {
        let registry = Self::new(config)?;
        {
            let mut state = registry.state.write();
            for game in games {
                if state.games.contains_key(&game.id()) {
                    return Err(GameError::internal(format!(
                        "Game {} loaded twice",
                        game.id()
                    )));
                }
                state.insert(game);
            }
        }

        tracing::debug!("Registry restored with {} games", registry.len());
        Ok(registry)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    pub fn len(&self) -> usize {
        self.state.read().games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, events: Vec<GameEvent>) {
        let sinks = self.sinks.read();
        for event in events {
            let record = EventRecord {
                event,
                published_at: Utc::now(),
            };
            for sink in sinks.iter() {
                sink.publish(&record);
            }
        }
    }

    /// Run a mutating call against one game. Events go out only once the
    /// call has succeeded and the lock is released.
    fn apply<F>(&self, game_id: GameId, op: F) -> Result<()>
    where
        F: FnOnce(&mut Game) -> Result<Vec<GameEvent>>,
    {
        let events = {
            let mut state = self.state.write();
            let game = state
                .games
                .get_mut(&game_id)
                .ok_or(GameError::GameNotFound(game_id))?;
            op(game)?
        };

        self.publish(events);
        Ok(())
    }

    fn read<T, F>(&self, game_id: GameId, query: F) -> Result<T>
    where
        F: FnOnce(&Game) -> T,
    {
        let state = self.state.read();
        state
            .games
            .get(&game_id)
            .map(query)
            .ok_or(GameError::GameNotFound(game_id))
    }

    /// Create a game. Managed games need the manager's public key; a
    /// missing `config` falls back to the registry defaults.
    pub fn create_game(
        &self,
        variant: Variant,
        manager: Identity,
        manager_public_key: Option<Vec<u8>>,
        config: Option<GameConfig>,
        message: impl Into<String>,
    ) -> Result<GameId> {
        let config = config.unwrap_or_else(|| self.config.defaults.clone());
        let game_id = Uuid::new_v4();

        let (game, events) = match (variant, manager_public_key) {
            (Variant::Decentralized, None) => {
                Game::decentralized(game_id, manager, config, message)?
            }
            (Variant::Managed, Some(public_key)) => {
                if public_key.is_empty() {
                    return Err(GameError::config("Manager public key is empty"));
                }
                Game::managed(game_id, manager, public_key, config, message)?
            }
            (Variant::Decentralized, Some(_)) => {
                return Err(GameError::config(
                    "Decentralized games take no manager public key",
                ));
            }
            (Variant::Managed, None) => {
                return Err(GameError::config("Managed games need a manager public key"));
            }
        };

        self.state.write().insert(game);
        self.publish(events);

        tracing::info!("Registered {} game {}", variant, game_id);
        Ok(game_id)
    }

    pub fn list_games(&self, variant: Variant) -> Vec<GameId> {
        self.state
            .read()
            .index
            .get(&variant)
            .cloned()
            .unwrap_or_default()
    }

    /// Most recently created game of a variant
    pub fn last_game(&self, variant: Variant) -> Option<GameId> {
        self.state
            .read()
            .index
            .get(&variant)
            .and_then(|ids| ids.last().copied())
    }

    pub fn commit(
        &self,
        game_id: GameId,
        participant: Identity,
        commitment: Commitment,
        stake: Amount,
    ) -> Result<()> {
        self.apply(game_id, |game| game.commit(participant, commitment, stake))
    }

    pub fn begin_verification(
        &self,
        game_id: GameId,
        caller: &Identity,
        message: impl Into<String>,
    ) -> Result<()> {
        self.apply(game_id, |game| game.begin_verification(caller, message))
    }

    pub fn reveal(
        &self,
        game_id: GameId,
        participant: &Identity,
        number: u16,
        secret: &str,
    ) -> Result<()> {
        self.apply(game_id, |game| game.reveal(participant, number, secret))
    }

    pub fn disclose_key(
        &self,
        game_id: GameId,
        caller: &Identity,
        private_key: Vec<u8>,
        message: impl Into<String>,
    ) -> Result<()> {
        self.apply(game_id, |game| game.disclose_key(caller, private_key, message))
    }

    pub fn end_game(
        &self,
        game_id: GameId,
        caller: &Identity,
        input: Option<&SettlementInput>,
    ) -> Result<()> {
        self.apply(game_id, |game| game.end_game(caller, input))
    }

    pub fn phase(&self, game_id: GameId) -> Result<Phase> {
        self.read(game_id, |g| g.phase())
    }

    pub fn bids(&self, game_id: GameId) -> Result<Vec<Bid>> {
        self.read(game_id, |g| g.bids().to_vec())
    }

    pub fn winner(&self, game_id: GameId) -> Result<Option<Identity>> {
        self.read(game_id, |g| g.winner().cloned())
    }

    pub fn winner_prize(&self, game_id: GameId) -> Result<Option<Amount>> {
        self.read(game_id, |g| g.winner_prize())
    }

    pub fn manager_fee(&self, game_id: GameId) -> Result<Option<Amount>> {
        self.read(game_id, |g| g.manager_fee())
    }

    pub fn possible_winners(&self, game_id: GameId) -> Result<Vec<Identity>> {
        self.read(game_id, |g| g.possible_winners().to_vec())
    }

    pub fn manager(&self, game_id: GameId) -> Result<Identity> {
        self.read(game_id, |g| g.manager().clone())
    }

    pub fn manager_public_key(&self, game_id: GameId) -> Result<Option<Vec<u8>>> {
        self.read(game_id, |g| g.manager_public_key().map(<[u8]>::to_vec))
    }

    pub fn disclosure(&self, game_id: GameId) -> Result<Option<Disclosure>> {
        self.read(game_id, |g| g.disclosure().cloned())
    }

    pub fn balance(&self, game_id: GameId) -> Result<Amount> {
        self.read(game_id, |g| g.balance())
    }

    pub fn game_info(&self, game_id: GameId) -> Result<GameInfo> {
        self.read(game_id, |g| g.info())
    }

    /// Copy of a game's full state, for persistence
    pub fn snapshot(&self, game_id: GameId) -> Result<Game> {
        self.read(game_id, Game::clone)
    }

    pub fn snapshots(&self) -> Vec<Game> {
        let state = self.state.read();
        [Variant::Decentralized, Variant::Managed]
            .iter()
            .filter_map(|v| state.index.get(v))
            .flatten()
            .filter_map(|id| state.games.get(id).cloned())
            .collect()
    }
}
