pub mod bid;
pub mod game;

pub use bid::{handle_bid_command, BidCommands};
pub use game::{handle_game_command, GameCommands};

use anyhow::Context;
use sealbid_core::{GameId, GameRegistry, GameStore, MemorySink, Storage};
use std::sync::Arc;

use crate::config::CliConfig;

/// Registry restored from disk for one invocation
pub struct Session {
    storage: Storage,
    registry: GameRegistry,
    sink: Arc<MemorySink>,
}

impl Session {
    pub async fn open(config: &CliConfig) -> anyhow::Result<Self> {
        let storage = Storage::new(&config.db_path()).await?;
        let games = GameStore::new(&storage).load_all().await?;
        let registry = GameRegistry::from_games(config.registry.clone(), games)?;

        let sink = Arc::new(MemorySink::new());
        registry.add_sink(sink.clone());

        tracing::debug!(
            "Opened {} with {} games",
            config.db_path().display(),
            registry.len()
        );

        Ok(Self {
            storage,
            registry,
            sink,
        })
    }

    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    pub fn store(&self) -> GameStore<'_> {
        GameStore::new(&self.storage)
    }

    /// Write back a game after a successful call, with the events it produced
    pub async fn persist(&self, game_id: GameId) -> anyhow::Result<()> {
        let store = self.store();
        let game = self.registry.snapshot(game_id)?;
        store
            .save_game(&game)
            .await
            .with_context(|| format!("Failed to save game {}", game_id))?;

        let records: Vec<_> = self
            .sink
            .records()
            .into_iter()
            .filter(|r| r.event.game_id() == game_id)
            .collect();
        store.append_events(&records).await?;
        Ok(())
    }
}

pub fn parse_game_id(game_id: &str) -> anyhow::Result<GameId> {
    game_id
        .parse()
        .with_context(|| format!("Invalid game ID: {}", game_id))
}
