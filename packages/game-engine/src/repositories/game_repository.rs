use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::models::live_game::LiveGame;

/// Shared reference to one live game. Each game carries its own lock so
/// commands for different games never wait on each other.
#[derive(Clone)]
pub struct GameHandle {
    pub id: String,
    pub game: Arc<Mutex<LiveGame>>,
}

impl GameHandle {
    pub fn new(game: LiveGame) -> Self {
        GameHandle {
            id: game.id().to_string(),
            game: Arc::new(Mutex::new(game)),
        }
    }
}

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn find_one(&self, id: &str) -> Option<GameHandle>;
    async fn find_all(&self) -> Vec<GameHandle>;
    async fn find_many(&self, ids: &[String]) -> Vec<GameHandle>;
    /// Inserts or replaces the game stored under `handle.id`.
    async fn save(&self, handle: GameHandle);
    /// Returns whether a game was removed.
    async fn delete(&self, id: &str) -> bool;
}

#[derive(Default)]
pub struct InMemoryGameRepository {
    games: RwLock<HashMap<String, GameHandle>>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn find_one(&self, id: &str) -> Option<GameHandle> {
        self.games.read().await.get(id).cloned()
    }

    async fn find_all(&self) -> Vec<GameHandle> {
        self.games.read().await.values().cloned().collect()
    }

    async fn find_many(&self, ids: &[String]) -> Vec<GameHandle> {
        let games = self.games.read().await;
        ids.iter().filter_map(|id| games.get(id).cloned()).collect()
    }

    async fn save(&self, handle: GameHandle) {
        debug!("Saving live game {}", handle.id);
        self.games.write().await.insert(handle.id.clone(), handle);
    }

    async fn delete(&self, id: &str) -> bool {
        debug!("Deleting live game {}", id);
        self.games.write().await.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game_session::GameType;

    fn handle(id: &str) -> GameHandle {
        GameHandle::new(LiveGame::new(
            GameType::Chess,
            id,
            [("p1", "Alice"), ("p2", "Bob")],
            60,
        ))
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repository = InMemoryGameRepository::new();
        repository.save(handle("lobby-1")).await;
        repository.save(handle("lobby-2")).await;

        assert!(repository.find_one("lobby-1").await.is_some());
        assert!(repository.find_one("lobby-3").await.is_none());
        assert_eq!(repository.find_all().await.len(), 2);

        let many = repository
            .find_many(&["lobby-2".to_string(), "lobby-3".to_string()])
            .await;
        assert_eq!(many.len(), 1);
        assert_eq!(many[0].id, "lobby-2");
    }

    #[tokio::test]
    async fn test_save_replaces_existing_entry() {
        let repository = InMemoryGameRepository::new();
        let first = handle("lobby-1");
        repository.save(first.clone()).await;

        repository.save(handle("lobby-1")).await;

        let stored = repository.find_one("lobby-1").await.unwrap();
        assert!(!Arc::ptr_eq(&stored.game, &first.game));
        assert_eq!(repository.find_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let repository = InMemoryGameRepository::new();
        repository.save(handle("lobby-1")).await;

        assert!(repository.delete("lobby-1").await);
        assert!(!repository.delete("lobby-1").await);
        assert!(repository.find_one("lobby-1").await.is_none());
    }

    #[tokio::test]
    async fn test_handles_share_the_same_game() {
        let repository = InMemoryGameRepository::new();
        let original = handle("lobby-1");
        repository.save(original.clone()).await;

        original.game.lock().await.mark_ready("p1").unwrap();

        let found = repository.find_one("lobby-1").await.unwrap();
        assert_eq!(
            found.game.lock().await.mark_ready("p1").unwrap(),
            crate::models::game_session::ReadyOutcome::AlreadyReady
        );
    }
}
