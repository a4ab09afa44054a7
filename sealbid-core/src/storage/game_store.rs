use crate::error::{GameError, Result};
use crate::events::{EventRecord, GameEvent};
use crate::game::Game;
use crate::storage::Storage;
use crate::types::{GameId, Identity, Variant};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// Listing row, without the snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub variant: Variant,
    pub manager: Identity,
    pub phase: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct GameStore<'a> {
    storage: &'a Storage,
}

impl<'a> GameStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Insert or update; the original row keeps its position so listing
    /// order stays creation order
    pub async fn save_game(&self, game: &Game) -> Result<()> {
        let conn = self.storage.get_connection().await;
        let snapshot = serde_json::to_string(game)?;

        conn.execute(
            "INSERT INTO games (id, variant, manager, phase, created_at, updated_at, snapshot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                phase = excluded.phase,
                updated_at = excluded.updated_at,
                snapshot = excluded.snapshot",
            params![
                game.id().to_string(),
                game.variant().as_str(),
                game.manager().as_str(),
                game.phase().as_str(),
                game.created_at().timestamp(),
                Utc::now().timestamp(),
                snapshot,
            ],
        )?;

        tracing::debug!("Saved game {} in phase {}", game.id(), game.phase());
        Ok(())
    }

    pub async fn load_game(&self, game_id: GameId) -> Result<Game> {
        let conn = self.storage.get_connection().await;

        let snapshot: Option<String> = conn
            .query_row(
                "SELECT snapshot FROM games WHERE id = ?1",
                params![game_id.to_string()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;

        let snapshot = snapshot.ok_or(GameError::GameNotFound(game_id))?;
        Ok(serde_json::from_str(&snapshot)?)
    }

    /// Every stored game, oldest first
    pub async fn load_all(&self) -> Result<Vec<Game>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare("SELECT snapshot FROM games ORDER BY rowid ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut games = Vec::new();
        for snapshot in rows {
            games.push(serde_json::from_str(&snapshot?)?);
        }

        Ok(games)
    }

    pub async fn list_games(&self, variant: Option<Variant>) -> Result<Vec<GameRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT id, variant, manager, phase, created_at, updated_at
             FROM games WHERE ?1 IS NULL OR variant = ?1 ORDER BY rowid ASC",
        )?;

        let rows = stmt.query_map(params![variant.map(|v| v.as_str())], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, variant, manager, phase, created_at, updated_at) = row?;
            records.push(GameRecord {
                id: id
                    .parse()
                    .map_err(|e| GameError::internal(format!("Bad game id {}: {}", id, e)))?,
                variant: variant.parse()?,
                manager: Identity::new(manager),
                phase,
                created_at: timestamp(created_at),
                updated_at: timestamp(updated_at),
            });
        }

        Ok(records)
    }

    pub async fn game_exists(&self, game_id: GameId) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM games WHERE id = ?1",
            params![game_id.to_string()],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    pub async fn append_events(&self, records: &[EventRecord]) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        for record in records {
            tx.execute(
                "INSERT INTO events (game_id, published_at, payload) VALUES (?1, ?2, ?3)",
                params![
                    record.event.game_id().to_string(),
                    record.published_at.timestamp(),
                    serde_json::to_string(&record.event)?,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub async fn events_for(&self, game_id: GameId) -> Result<Vec<EventRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT published_at, payload FROM events WHERE game_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![game_id.to_string()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (published_at, payload) = row?;
            let event: GameEvent = serde_json::from_str(&payload)?;
            records.push(EventRecord {
                event,
                published_at: timestamp(published_at),
            });
        }

        Ok(records)
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::HashCommitment;
    use crate::config::GameConfig;
    use crate::types::Phase;
    use bitcoin::Amount;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn new_game(stake: u64) -> Game {
        let (game, _) = Game::decentralized(
            Uuid::new_v4(),
            Identity::new("manager"),
            GameConfig::new(Amount::from_sat(stake)),
            "stored",
        )
        .unwrap();
        game
    }

    #[tokio::test]
    async fn test_save_and_load_game() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("sealbid.db"))
            .await
            .unwrap();
        let store = GameStore::new(&storage);

        let mut game = new_game(1_000);
        let alice = Identity::new("alice");
        game.commit(
            alice.clone(),
            HashCommitment::new(3, "pw", &alice).into(),
            Amount::from_sat(1_000),
        )
        .unwrap();
        store.save_game(&game).await.unwrap();

        let loaded = store.load_game(game.id()).await.unwrap();
        assert_eq!(loaded.phase(), Phase::Betting);
        assert_eq!(loaded.bids(), game.bids());
        assert_eq!(loaded.balance(), Amount::from_sat(1_000));
        assert!(store.game_exists(game.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_game() {
        let storage = Storage::in_memory().await.unwrap();
        let store = GameStore::new(&storage);

        let missing = Uuid::new_v4();
        assert!(matches!(
            store.load_game(missing).await,
            Err(GameError::GameNotFound(_))
        ));
        assert!(!store.game_exists(missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_keeps_creation_order() {
        let storage = Storage::in_memory().await.unwrap();
        let store = GameStore::new(&storage);

        let mut first = new_game(10);
        let second = new_game(20);
        store.save_game(&first).await.unwrap();
        store.save_game(&second).await.unwrap();

        let alice = Identity::new("alice");
        first
            .commit(
                alice.clone(),
                HashCommitment::new(1, "pw", &alice).into(),
                Amount::from_sat(10),
            )
            .unwrap();
        store.save_game(&first).await.unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id(), first.id());
        assert_eq!(all[0].bids().len(), 1);

        let listed = store
            .list_games(Some(Variant::Decentralized))
            .await
            .unwrap();
        assert_eq!(listed[1].id, second.id());
        assert_eq!(listed[0].phase, "betting");
        assert!(store
            .list_games(Some(Variant::Managed))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_event_log() {
        let storage = Storage::in_memory().await.unwrap();
        let store = GameStore::new(&storage);

        let (game, events) = Game::decentralized(
            Uuid::new_v4(),
            Identity::new("manager"),
            GameConfig::default(),
            "logged",
        )
        .unwrap();
        store.save_game(&game).await.unwrap();

        let records: Vec<EventRecord> = events
            .into_iter()
            .map(|event| EventRecord {
                event,
                published_at: Utc::now(),
            })
            .collect();
        store.append_events(&records).await.unwrap();

        let loaded = store.events_for(game.id()).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].event, records[0].event);
        assert!(store.events_for(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
