use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::GameConfig,
    models::{
        commands::{GameCommand, MovePieceRequest},
        game_session::{GameOver, GameStatus, ReadyOutcome, PLAYER_COUNT},
        live_game::LiveGame,
        responses::{
            GenericResponseError, InterruptingMessage, ReturnToLobbyResponse,
            GAME_STATE_UPDATE_EVENT, GENERIC_ERROR_EVENT, RETURN_TO_LOBBY_EVENT,
        },
    },
    repositories::{
        game_repository::{GameHandle, GameRepository},
        lobby_repository::LobbyRepository,
        snapshot_repository::GameSnapshotRepository,
    },
    services::{
        deletion_scheduler::{DeletionReason, DeletionScheduler},
        errors::{
            game_session_service_errors::GameSessionServiceError, snapshot_errors::SnapshotError,
        },
        websocket_service::PlayerNotifier,
    },
};

/// Routes player commands to live games and owns their lifecycle: creation,
/// rebuild from snapshots, persistence, pushes and deferred deletion.
#[derive(Clone)]
pub struct GameSessionService {
    game_repository: Arc<dyn GameRepository + Send + Sync>,
    snapshot_repository: Arc<dyn GameSnapshotRepository + Send + Sync>,
    lobby_repository: Arc<dyn LobbyRepository + Send + Sync>,
    notifier: Arc<dyn PlayerNotifier + Send + Sync>,
    scheduler: DeletionScheduler,
    config: GameConfig,
    creation_lock: Arc<Mutex<()>>,
}

impl GameSessionService {
    pub fn new(
        game_repository: Arc<dyn GameRepository + Send + Sync>,
        snapshot_repository: Arc<dyn GameSnapshotRepository + Send + Sync>,
        lobby_repository: Arc<dyn LobbyRepository + Send + Sync>,
        notifier: Arc<dyn PlayerNotifier + Send + Sync>,
        config: GameConfig,
    ) -> Self {
        GameSessionService {
            game_repository,
            snapshot_repository,
            lobby_repository,
            notifier,
            scheduler: DeletionScheduler::new(),
            config,
            creation_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn scheduler(&self) -> &DeletionScheduler {
        &self.scheduler
    }

    /// Entry point for inbound commands. Failures are reported to the
    /// sending player only.
    pub async fn handle_command(&self, player_id: &str, lobby_id: &str, command: GameCommand) {
        let name = command.name();
        info!(
            "Player {} sent {} for lobby {}",
            player_id, name, lobby_id
        );

        let result = match command {
            GameCommand::ReadyToPlay => self.ready_to_play(player_id, lobby_id).await,
            GameCommand::MovePiece(request) => {
                self.move_piece(player_id, lobby_id, &request).await
            }
            GameCommand::LeaveGame => self.leave_game(player_id, lobby_id).await,
            GameCommand::RequestGameStateUpdate => {
                self.request_game_state_update(player_id, lobby_id).await
            }
            GameCommand::ResetGame => self.reset_game(player_id, lobby_id).await,
        };

        if let Err(err) = result {
            warn!(
                "{} from player {} in lobby {} failed: {}",
                name, player_id, lobby_id, err
            );
            self.notify_error(player_id, &err).await;
        }
        self.release(lobby_id).await;
    }

    pub async fn ready_to_play(
        &self,
        player_id: &str,
        lobby_id: &str,
    ) -> Result<(), GameSessionServiceError> {
        let handle = self.resolve_or_create(lobby_id, player_id).await?;

        let (outcome, snapshot, updates) = {
            let mut game = handle.game.lock().await;
            let outcome = game.mark_ready(player_id)?;
            if outcome == ReadyOutcome::AlreadyReady {
                debug!("Player {} is already ready in {}", player_id, lobby_id);
                return Ok(());
            }
            (outcome, game.snapshot_bytes(), game.state_updates(None))
        };

        self.persist(lobby_id, snapshot).await;
        if outcome == ReadyOutcome::Started {
            info!("Game {} started", lobby_id);
            if let Err(e) = self.lobby_repository.set_game_started(lobby_id, true).await {
                error!("Failed to flag lobby {} as started: {}", lobby_id, e);
            }
        }
        self.push_updates(updates).await;
        Ok(())
    }

    pub async fn move_piece(
        &self,
        player_id: &str,
        lobby_id: &str,
        request: &MovePieceRequest,
    ) -> Result<(), GameSessionServiceError> {
        let handle = self
            .resolve_game(lobby_id)
            .await
            .ok_or(GameSessionServiceError::GameNotFound)?;

        let (game_over, message, snapshot, updates) = {
            let mut game = handle.game.lock().await;
            let outcome = game.move_piece(player_id, request)?;
            let message = outcome
                .game_over
                .as_ref()
                .map(|game_over| game_over_message(&game, game_over));
            (
                outcome.game_over,
                message.clone(),
                game.snapshot_bytes(),
                game.state_updates(message.as_ref()),
            )
        };

        self.persist(lobby_id, snapshot).await;
        if let Some(game_over) = game_over {
            info!(
                "Game {} is over, winner: {:?}",
                lobby_id, game_over.winner_index
            );
            self.schedule_deletion(
                lobby_id,
                DeletionReason::GameOver,
                Duration::from_secs(game_over.return_delay_seconds),
                message,
            );
        }
        self.push_updates(updates).await;
        Ok(())
    }

    pub async fn leave_game(
        &self,
        player_id: &str,
        lobby_id: &str,
    ) -> Result<(), GameSessionServiceError> {
        let handle = self
            .resolve_game(lobby_id)
            .await
            .ok_or(GameSessionServiceError::GameNotFound)?;

        let (deletion, snapshot, updates) = {
            let mut game = handle.game.lock().await;
            game.mark_left(player_id)?;
            let name = game.player_name(player_id).unwrap_or_default();

            let deletion = if game.all_players_left() {
                let delay = self.config.players_left_timeout;
                Some((
                    DeletionReason::PlayersLeft,
                    delay,
                    InterruptingMessage::new("Game closing", "All players left the game")
                        .with_countdown(delay.as_secs()),
                ))
            } else if game.game_over().is_none() {
                let delay = self.config.disconnect_timeout;
                Some((
                    DeletionReason::Disconnect,
                    delay,
                    InterruptingMessage::new("Player left", &format!("{} left the game", name))
                        .with_countdown(delay.as_secs()),
                ))
            } else {
                None
            };

            let message = match &deletion {
                Some((_, _, message)) => Some(message.clone()),
                None => self.scheduler.pending_message(lobby_id),
            };
            (
                deletion,
                game.snapshot_bytes(),
                game.state_updates(message.as_ref()),
            )
        };

        self.persist(lobby_id, snapshot).await;
        if let Some((reason, delay, message)) = deletion {
            self.schedule_deletion(lobby_id, reason, delay, Some(message));
        }
        self.push_updates(updates).await;
        Ok(())
    }

    pub async fn request_game_state_update(
        &self,
        player_id: &str,
        lobby_id: &str,
    ) -> Result<(), GameSessionServiceError> {
        let handle = self
            .resolve_game(lobby_id)
            .await
            .ok_or(GameSessionServiceError::GameNotFound)?;
        let message = self.scheduler.pending_message(lobby_id);

        let payload = {
            let game = handle.game.lock().await;
            game.state_update_for(player_id, message.as_ref())
        }
        .ok_or(GameSessionServiceError::PlayerNotFound)?;

        self.notifier
            .emit_to_player(player_id, GAME_STATE_UPDATE_EVENT, payload)
            .await;
        Ok(())
    }

    pub async fn reset_game(
        &self,
        player_id: &str,
        lobby_id: &str,
    ) -> Result<(), GameSessionServiceError> {
        if !self.config.enable_debug_commands {
            return Err(GameSessionServiceError::DebugCommandsDisabled);
        }
        let handle = self
            .resolve_game(lobby_id)
            .await
            .ok_or(GameSessionServiceError::GameNotFound)?;

        let (snapshot, updates) = {
            let mut game = handle.game.lock().await;
            if !game.is_participant(player_id) {
                return Err(GameSessionServiceError::PlayerNotFound);
            }
            game.reset()?;
            (game.snapshot_bytes(), game.state_updates(None))
        };

        warn!("Game {} reset by player {}", lobby_id, player_id);
        self.scheduler.cancel(lobby_id);
        self.persist(lobby_id, snapshot).await;
        self.push_updates(updates).await;
        Ok(())
    }

    /// Marks the player as disconnected in every live game they take part
    /// in and starts the disconnect timeout for games still in play.
    pub async fn handle_player_disconnected(&self, player_id: &str) {
        let handles = self.games_of(player_id).await;
        for handle in &handles {
            let (deletion, snapshot, updates) = {
                let mut game = handle.game.lock().await;
                if !game.mark_connected(player_id, false) {
                    continue;
                }
                let name = game.player_name(player_id).unwrap_or_default();

                let deletion = if game.game_over().is_none() {
                    let delay = self.config.disconnect_timeout;
                    Some((
                        delay,
                        InterruptingMessage::new(
                            "Player disconnected",
                            &format!("{} disconnected", name),
                        )
                        .with_countdown(delay.as_secs()),
                    ))
                } else {
                    None
                };

                let message = match &deletion {
                    Some((_, message)) => Some(message.clone()),
                    None => self.scheduler.pending_message(&handle.id),
                };
                (
                    deletion,
                    game.snapshot_bytes(),
                    game.state_updates(message.as_ref()),
                )
            };

            info!("Player {} disconnected from game {}", player_id, handle.id);
            self.persist(&handle.id, snapshot).await;
            if let Some((delay, message)) = deletion {
                self.schedule_deletion(
                    &handle.id,
                    DeletionReason::Disconnect,
                    delay,
                    Some(message),
                );
            }
            self.push_updates(updates).await;
        }
        self.release_all(&handles).await;
    }

    /// Marks the player as connected again and cancels a pending disconnect
    /// timeout once everyone is back.
    pub async fn handle_player_connected(&self, player_id: &str) {
        let handles = self.games_of(player_id).await;
        for handle in &handles {
            let (all_connected, snapshot) = {
                let mut game = handle.game.lock().await;
                if !game.mark_connected(player_id, true) {
                    continue;
                }
                (game.all_connected(), game.snapshot_bytes())
            };

            info!("Player {} reconnected to game {}", player_id, handle.id);
            if all_connected
                && self
                    .scheduler
                    .cancel_if(&handle.id, DeletionReason::Disconnect)
            {
                info!("Everyone is back in game {}", handle.id);
            }

            let message = self.scheduler.pending_message(&handle.id);
            let updates = handle.game.lock().await.state_updates(message.as_ref());
            self.persist(&handle.id, snapshot).await;
            self.push_updates(updates).await;
        }
        self.release_all(&handles).await;
    }

    /// Games the player may take part in. Without a cache these are the
    /// started lobbies the player belongs to, rebuilt from their snapshots.
    async fn games_of(&self, player_id: &str) -> Vec<GameHandle> {
        if self.config.cache_games {
            return self.game_repository.find_all().await;
        }

        let lobby_ids = match self.lobby_repository.find_started_lobby_ids(player_id).await {
            Ok(lobby_ids) => lobby_ids,
            Err(e) => {
                error!("Failed to look up lobbies of player {}: {}", player_id, e);
                return Vec::new();
            }
        };
        let mut handles = Vec::new();
        for lobby_id in lobby_ids {
            if let Some(handle) = self.resolve_game(&lobby_id).await {
                handles.push(handle);
            }
        }
        handles
    }

    /// Drops the cached game once a command is done with it, unless games
    /// are kept in memory.
    async fn release(&self, lobby_id: &str) {
        if !self.config.cache_games && self.game_repository.delete(lobby_id).await {
            debug!("Released game {} from memory", lobby_id);
        }
    }

    async fn release_all(&self, handles: &[GameHandle]) {
        for handle in handles {
            self.release(&handle.id).await;
        }
    }

    /// Creates a fresh game for a lobby. Fails if one is already live.
    pub async fn create_game(&self, lobby_id: &str) -> Result<GameHandle, GameSessionServiceError> {
        let _guard = self.creation_lock.lock().await;
        self.insert_new_game(lobby_id, None).await
    }

    /// Live game for the lobby, rebuilt from its snapshot when the lobby
    /// says a game was running. Rebuild failures are logged and yield `None`.
    pub async fn resolve_game(&self, lobby_id: &str) -> Option<GameHandle> {
        if let Some(handle) = self.game_repository.find_one(lobby_id).await {
            return Some(handle);
        }
        let _guard = self.creation_lock.lock().await;
        self.restore_locked(lobby_id).await
    }

    async fn resolve_or_create(
        &self,
        lobby_id: &str,
        player_id: &str,
    ) -> Result<GameHandle, GameSessionServiceError> {
        if let Some(handle) = self.game_repository.find_one(lobby_id).await {
            return Ok(handle);
        }
        let _guard = self.creation_lock.lock().await;
        if let Some(handle) = self.restore_locked(lobby_id).await {
            return Ok(handle);
        }
        self.insert_new_game(lobby_id, Some(player_id)).await
    }

    // callers hold `creation_lock`
    async fn insert_new_game(
        &self,
        lobby_id: &str,
        requested_by: Option<&str>,
    ) -> Result<GameHandle, GameSessionServiceError> {
        if self.game_repository.find_one(lobby_id).await.is_some() {
            return Err(GameSessionServiceError::GameAlreadyExists);
        }

        let lobby = self
            .lobby_repository
            .get_lobby(lobby_id)
            .await?
            .ok_or(GameSessionServiceError::GameNotFound)?;
        if requested_by.is_some_and(|player_id| !lobby.is_member(player_id)) {
            return Err(GameSessionServiceError::PlayerNotFound);
        }
        if lobby.members.len() != PLAYER_COUNT {
            return Err(GameSessionServiceError::ValidationError(format!(
                "a game needs exactly {} players, lobby has {}",
                PLAYER_COUNT,
                lobby.members.len()
            )));
        }

        let game = LiveGame::new(
            lobby.game_type,
            lobby_id,
            [
                (
                    lobby.members[0].player_id.as_str(),
                    lobby.members[0].name.as_str(),
                ),
                (
                    lobby.members[1].player_id.as_str(),
                    lobby.members[1].name.as_str(),
                ),
            ],
            self.config.return_to_lobby_delay.as_secs(),
        );
        let handle = GameHandle::new(game);
        self.game_repository.save(handle.clone()).await;

        info!("Created {} game for lobby {}", lobby.game_type, lobby_id);
        Ok(handle)
    }

    // callers hold `creation_lock`
    async fn restore_locked(&self, lobby_id: &str) -> Option<GameHandle> {
        if let Some(handle) = self.game_repository.find_one(lobby_id).await {
            return Some(handle);
        }

        let lobby = match self.lobby_repository.get_lobby(lobby_id).await {
            Ok(Some(lobby)) => lobby,
            Ok(None) => return None,
            Err(e) => {
                error!("Failed to load lobby {}: {}", lobby_id, e);
                return None;
            }
        };
        // readiness of a game not yet started only survives in the snapshot
        // when games are not cached
        if !lobby.game_started && self.config.cache_games {
            return None;
        }

        let game = match self.rebuild_game(lobby_id).await {
            Ok(game) => game,
            Err(GameSessionServiceError::Rebuild(SnapshotError::Missing)) if !lobby.game_started => {
                return None;
            }
            Err(e) => {
                error!("Discarding game {}: {}", lobby_id, e);
                return None;
            }
        };
        if !lobby.game_started && game.status() != GameStatus::WaitingForReady {
            debug!("Ignoring snapshot of a finished game in lobby {}", lobby_id);
            return None;
        }

        let pending_game_over = game
            .game_over()
            .map(|game_over| (game_over.clone(), game_over_message(&game, game_over)));
        let handle = GameHandle::new(game);
        self.game_repository.save(handle.clone()).await;
        info!("Rebuilt game {} from snapshot", lobby_id);

        if let Some((game_over, message)) = pending_game_over {
            self.schedule_deletion(
                lobby_id,
                DeletionReason::GameOver,
                Duration::from_secs(game_over.return_delay_seconds),
                Some(message),
            );
        }
        Some(handle)
    }

    async fn rebuild_game(&self, lobby_id: &str) -> Result<LiveGame, GameSessionServiceError> {
        let bytes = self
            .snapshot_repository
            .get(lobby_id)
            .await
            .map_err(|e| GameSessionServiceError::RepositoryError(e.to_string()))?
            .ok_or(SnapshotError::Missing)?;

        let mut game = LiveGame::from_snapshot_bytes(&bytes)?;
        if game.id() != lobby_id {
            return Err(SnapshotError::SchemaMismatch(format!(
                "snapshot belongs to game {}",
                game.id()
            ))
            .into());
        }
        game.set_return_delay(self.config.return_to_lobby_delay.as_secs());
        Ok(game)
    }

    fn schedule_deletion(
        &self,
        game_id: &str,
        reason: DeletionReason,
        delay: Duration,
        message: Option<InterruptingMessage>,
    ) {
        let service = self.clone();
        let id = game_id.to_string();
        self.scheduler
            .schedule(game_id, reason, delay, message, move |token| async move {
                service.fire_deletion(&id, token).await;
            });
    }

    /// Body of a scheduled deletion. Does nothing unless `token` still owns
    /// the game's deletion slot.
    pub async fn fire_deletion(&self, game_id: &str, token: Uuid) {
        let Some(reason) = self.scheduler.complete(game_id, token) else {
            debug!("Skipping stale deletion of game {}", game_id);
            return;
        };

        let participants = match self.game_repository.find_one(game_id).await {
            Some(handle) => handle.game.lock().await.present_player_ids(),
            None if !self.config.cache_games => match self.rebuild_game(game_id).await {
                Ok(game) => game.present_player_ids(),
                Err(e) => {
                    warn!("Cannot tell who was in game {}: {}", game_id, e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        if !self.game_repository.delete(game_id).await {
            debug!("Game {} was already gone", game_id);
        }
        if let Err(e) = self.lobby_repository.set_game_started(game_id, false).await {
            error!("Failed to clear started flag of lobby {}: {}", game_id, e);
        }
        info!("Deleted game {} after {}", game_id, reason);

        match serde_json::to_value(ReturnToLobbyResponse {
            lobby_id: game_id.to_string(),
            reason: reason.to_string(),
        }) {
            Ok(payload) => {
                self.notifier
                    .emit_to_players(&participants, RETURN_TO_LOBBY_EVENT, payload)
                    .await
            }
            Err(e) => error!("Failed to serialize return to lobby response: {}", e),
        }
    }

    async fn persist(&self, lobby_id: &str, snapshot: Result<Vec<u8>, serde_json::Error>) {
        let bytes = match snapshot {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to serialize snapshot of game {}: {}", lobby_id, e);
                return;
            }
        };
        if let Err(e) = self.snapshot_repository.put(lobby_id, &bytes).await {
            error!("Failed to persist snapshot of game {}: {}", lobby_id, e);
        }
    }

    async fn push_updates(&self, updates: Vec<(String, Value)>) {
        for (player_id, payload) in updates {
            self.notifier
                .emit_to_player(&player_id, GAME_STATE_UPDATE_EVENT, payload)
                .await;
        }
    }

    async fn notify_error(&self, player_id: &str, err: &GameSessionServiceError) {
        match serde_json::to_value(GenericResponseError {
            error: err.to_string(),
        }) {
            Ok(payload) => {
                self.notifier
                    .emit_to_player(player_id, GENERIC_ERROR_EVENT, payload)
                    .await
            }
            Err(e) => error!("Failed to serialize error response: {}", e),
        }
    }
}

fn game_over_message(game: &LiveGame, game_over: &GameOver) -> InterruptingMessage {
    let text = match game_over
        .winner_index
        .and_then(|winner| game.player_name_at(winner))
    {
        Some(name) => format!("{} won the game", name),
        None => "The game ended in a draw".to_string(),
    };
    InterruptingMessage::new("Game over", &text).with_countdown(game_over.return_delay_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            board::Position,
            checkers::CheckersPiece,
            game_session::{Game, GameType, Ready},
            lobby::Lobby,
        },
        repositories::{
            errors::snapshot_repository_errors::GameSnapshotRepositoryError,
            game_repository::InMemoryGameRepository,
            lobby_repository::MockLobbyRepository,
            snapshot_repository::MockGameSnapshotRepository,
        },
        services::{checkers_service::CheckersService, errors::move_errors::MoveError},
    };
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingNotifier {
        events: std::sync::Mutex<Vec<(String, String, Value)>>,
    }

    impl RecordingNotifier {
        fn events_for(&self, player_id: &str) -> Vec<(String, Value)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(recipient, _, _)| recipient == player_id)
                .map(|(_, event, payload)| (event.clone(), payload.clone()))
                .collect()
        }

        fn count(&self, event: &str) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, name, _)| name == event)
                .count()
        }
    }

    #[async_trait]
    impl PlayerNotifier for RecordingNotifier {
        async fn emit_to_player(&self, player_id: &str, event: &str, payload: Value) {
            self.events
                .lock()
                .unwrap()
                .push((player_id.to_string(), event.to_string(), payload));
        }
    }

    struct Harness {
        service: GameSessionService,
        games: Arc<InMemoryGameRepository>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness(
        lobbies: MockLobbyRepository,
        snapshots: MockGameSnapshotRepository,
        config: GameConfig,
    ) -> Harness {
        let games = Arc::new(InMemoryGameRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = GameSessionService::new(
            games.clone(),
            Arc::new(snapshots),
            Arc::new(lobbies),
            notifier.clone(),
            config,
        );
        Harness {
            service,
            games,
            notifier,
        }
    }

    fn lobby(game_type: GameType, game_started: bool) -> Lobby {
        let mut lobby = Lobby::new("lobby-1", game_type, &[("p1", "Alice"), ("p2", "Bob")]);
        lobby.game_started = game_started;
        lobby
    }

    fn lobbies_returning(lobby: Lobby) -> MockLobbyRepository {
        let mut lobbies = MockLobbyRepository::new();
        lobbies
            .expect_get_lobby()
            .returning(move |_| Ok(Some(lobby.clone())));
        lobbies
    }

    fn accepting_snapshots() -> MockGameSnapshotRepository {
        let mut snapshots = MockGameSnapshotRepository::new();
        snapshots.expect_put().returning(|_, _| Ok(()));
        snapshots
    }

    /// Checkers game one capture away from ending.
    fn nearly_won_checkers() -> LiveGame {
        let mut game: Game<CheckersService> =
            Game::new("lobby-1", [("p1", "Alice"), ("p2", "Bob")]);
        game.mark_ready("p1").unwrap();
        game.mark_ready("p2").unwrap();
        game.board.clear();
        game.board.place(CheckersPiece::new(0), Position::new(5, 2));
        game.board.place(CheckersPiece::new(1), Position::new(4, 1));
        LiveGame::Checkers(game)
    }

    fn winning_capture() -> MovePieceRequest {
        MovePieceRequest::new(Position::new(5, 2), Position::new(3, 0))
    }

    #[tokio::test]
    async fn test_two_ready_players_start_game_once() {
        let mut lobbies = lobbies_returning(lobby(GameType::Chess, false));
        lobbies
            .expect_set_game_started()
            .withf(|lobby_id, started| lobby_id == "lobby-1" && *started)
            .times(1)
            .returning(|_, _| Ok(()));
        let h = harness(lobbies, accepting_snapshots(), GameConfig::default());

        h.service.ready_to_play("p1", "lobby-1").await.unwrap();
        h.service.ready_to_play("p2", "lobby-1").await.unwrap();
        let pushed = h.notifier.count(GAME_STATE_UPDATE_EVENT);

        h.service.ready_to_play("p2", "lobby-1").await.unwrap();

        assert_eq!(h.notifier.count(GAME_STATE_UPDATE_EVENT), pushed);
        let handle = h.games.find_one("lobby-1").await.unwrap();
        assert_eq!(
            handle.game.lock().await.status(),
            crate::models::game_session::GameStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_stranger_cannot_create_game() {
        let h = harness(
            lobbies_returning(lobby(GameType::Chess, false)),
            accepting_snapshots(),
            GameConfig::default(),
        );

        let result = h.service.ready_to_play("stranger", "lobby-1").await;

        assert!(matches!(result, Err(GameSessionServiceError::PlayerNotFound)));
        assert!(h.games.find_one("lobby-1").await.is_none());
    }

    #[tokio::test]
    async fn test_create_game_twice_fails() {
        let h = harness(
            lobbies_returning(lobby(GameType::Checkers, false)),
            accepting_snapshots(),
            GameConfig::default(),
        );

        h.service.create_game("lobby-1").await.unwrap();
        let result = h.service.create_game("lobby-1").await;

        assert!(matches!(
            result,
            Err(GameSessionServiceError::GameAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_invalid_move_is_reported_to_sender_only() {
        let mut lobbies = lobbies_returning(lobby(GameType::Chess, false));
        lobbies.expect_set_game_started().returning(|_, _| Ok(()));
        let h = harness(lobbies, accepting_snapshots(), GameConfig::default());
        h.service.ready_to_play("p1", "lobby-1").await.unwrap();
        h.service.ready_to_play("p2", "lobby-1").await.unwrap();
        let p1_events = h.notifier.events_for("p1").len();

        h.service
            .handle_command(
                "p2",
                "lobby-1",
                GameCommand::MovePiece(MovePieceRequest::new(
                    Position::new(1, 4),
                    Position::new(3, 4),
                )),
            )
            .await;

        let p2_events = h.notifier.events_for("p2");
        let (event, payload) = p2_events.last().unwrap();
        assert_eq!(event, GENERIC_ERROR_EVENT);
        assert_eq!(payload["error"], MoveError::NotYourTurn.to_string());
        assert_eq!(h.notifier.events_for("p1").len(), p1_events);
    }

    #[tokio::test]
    async fn test_move_without_game_reports_error() {
        let h = harness(
            lobbies_returning(lobby(GameType::Chess, false)),
            MockGameSnapshotRepository::new(),
            GameConfig::default(),
        );

        h.service
            .handle_command(
                "p1",
                "lobby-1",
                GameCommand::MovePiece(winning_capture()),
            )
            .await;

        let events = h.notifier.events_for("p1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, GENERIC_ERROR_EVENT);
        assert_eq!(
            events[0].1["error"],
            GameSessionServiceError::GameNotFound.to_string()
        );
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_move() {
        let lobbies = lobbies_returning(lobby(GameType::Checkers, true));
        let mut snapshots = MockGameSnapshotRepository::new();
        snapshots
            .expect_put()
            .returning(|_, _| Err(GameSnapshotRepositoryError::DynamoDb("down".to_string())));
        let h = harness(lobbies, snapshots, GameConfig::default());
        let mut live = nearly_won_checkers();
        if let LiveGame::Checkers(game) = &mut live {
            game.board.place(CheckersPiece::new(1), Position::new(0, 7));
        }
        h.games.save(GameHandle::new(live)).await;

        h.service
            .move_piece("p1", "lobby-1", &winning_capture())
            .await
            .unwrap();

        let handle = h.games.find_one("lobby-1").await.unwrap();
        let game = handle.game.lock().await;
        assert!(game.state_update_for("p1", None).unwrap()["board"][3][0]["piece"].is_object());
        assert_eq!(h.notifier.count(GAME_STATE_UPDATE_EVENT), 2);
    }

    #[tokio::test]
    async fn test_rebuilds_started_game_from_snapshot() {
        let mut stored = LiveGame::new(GameType::Chess, "lobby-1", [("p1", "Alice"), ("p2", "Bob")], 60);
        stored.mark_ready("p1").unwrap();
        stored.mark_ready("p2").unwrap();
        stored
            .move_piece(
                "p1",
                &MovePieceRequest::new(Position::new(6, 4), Position::new(4, 4)),
            )
            .unwrap();
        let bytes = stored.snapshot_bytes().unwrap();

        let lobbies = lobbies_returning(lobby(GameType::Chess, true));
        let mut snapshots = MockGameSnapshotRepository::new();
        snapshots
            .expect_get()
            .withf(|lobby_id| lobby_id == "lobby-1")
            .times(1)
            .returning(move |_| Ok(Some(bytes.clone())));
        let h = harness(lobbies, snapshots, GameConfig::default());

        h.service
            .request_game_state_update("p2", "lobby-1")
            .await
            .unwrap();
        h.service
            .request_game_state_update("p1", "lobby-1")
            .await
            .unwrap();

        let events = h.notifier.events_for("p2");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, GAME_STATE_UPDATE_EVENT);
        assert_eq!(events[0].1["isYourTurn"], true);
        assert_eq!(events[0].1["currentPlayerIndex"], 1);
        let rebuilt = h.games.find_one("lobby-1").await.unwrap();
        assert_eq!(*rebuilt.game.lock().await, stored);
    }

    #[tokio::test]
    async fn test_corrupted_snapshot_is_discarded() {
        let lobbies = lobbies_returning(lobby(GameType::Chess, true));
        let mut snapshots = MockGameSnapshotRepository::new();
        snapshots
            .expect_get()
            .returning(|_| Ok(Some(b"{\"gameType\":\"chess\",\"id\":".to_vec())));
        let h = harness(lobbies, snapshots, GameConfig::default());

        let result = h.service.request_game_state_update("p1", "lobby-1").await;

        assert!(matches!(result, Err(GameSessionServiceError::GameNotFound)));
        assert!(h.games.find_one("lobby-1").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_not_resumed() {
        let lobbies = lobbies_returning(lobby(GameType::Checkers, true));
        let mut snapshots = MockGameSnapshotRepository::new();
        snapshots.expect_get().returning(|_| Ok(None));
        let h = harness(lobbies, snapshots, GameConfig::default());

        assert!(h.service.resolve_game("lobby-1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_over_deletes_game_after_delay() {
        let mut lobbies = lobbies_returning(lobby(GameType::Checkers, true));
        lobbies
            .expect_set_game_started()
            .withf(|lobby_id, started| lobby_id == "lobby-1" && !*started)
            .times(1)
            .returning(|_, _| Ok(()));
        let h = harness(lobbies, accepting_snapshots(), GameConfig::default());
        h.games.save(GameHandle::new(nearly_won_checkers())).await;

        h.service
            .move_piece("p1", "lobby-1", &winning_capture())
            .await
            .unwrap();

        let (_, update) = h.notifier.events_for("p2").pop().unwrap();
        assert_eq!(update["gameOver"]["winnerIndex"], 0);
        assert_eq!(update["interruptingMessage"]["title"], "Game over");
        assert_eq!(
            h.service.scheduler().pending_reason("lobby-1"),
            Some(DeletionReason::GameOver)
        );

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(h.games.find_one("lobby-1").await.is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(h.games.find_one("lobby-1").await.is_none());
        assert_eq!(h.notifier.count(RETURN_TO_LOBBY_EVENT), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_players_leaving_deletes_game() {
        let mut lobbies = lobbies_returning(lobby(GameType::Checkers, true));
        lobbies.expect_set_game_started().returning(|_, _| Ok(()));
        let h = harness(lobbies, accepting_snapshots(), GameConfig::default());
        h.games.save(GameHandle::new(nearly_won_checkers())).await;

        h.service.leave_game("p1", "lobby-1").await.unwrap();
        assert_eq!(
            h.service.scheduler().pending_reason("lobby-1"),
            Some(DeletionReason::Disconnect)
        );
        let (_, update) = h.notifier.events_for("p2").pop().unwrap();
        assert_eq!(update["interruptingMessage"]["message"], "Alice left the game");

        h.service.leave_game("p2", "lobby-1").await.unwrap();
        assert_eq!(
            h.service.scheduler().pending_reason("lobby-1"),
            Some(DeletionReason::PlayersLeft)
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(h.games.find_one("lobby-1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_cancels_disconnect_timeout() {
        let lobbies = lobbies_returning(lobby(GameType::Checkers, true));
        let h = harness(lobbies, accepting_snapshots(), GameConfig::default());
        h.games.save(GameHandle::new(nearly_won_checkers())).await;

        h.service.handle_player_disconnected("p2").await;
        assert_eq!(
            h.service.scheduler().pending_reason("lobby-1"),
            Some(DeletionReason::Disconnect)
        );
        let (_, update) = h.notifier.events_for("p1").pop().unwrap();
        assert_eq!(update["interruptingMessage"]["title"], "Player disconnected");
        assert!(update["interruptingMessage"]["countdownSeconds"].as_u64().unwrap() <= 30);

        h.service.handle_player_connected("p2").await;
        assert_eq!(h.service.scheduler().pending_reason("lobby-1"), None);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(h.games.find_one("lobby-1").await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_player_connection_changes_nothing() {
        let h = harness(
            MockLobbyRepository::new(),
            MockGameSnapshotRepository::new(),
            GameConfig::default(),
        );
        h.games.save(GameHandle::new(nearly_won_checkers())).await;

        h.service.handle_player_disconnected("stranger").await;

        assert_eq!(h.service.scheduler().pending_reason("lobby-1"), None);
        assert_eq!(h.notifier.count(GAME_STATE_UPDATE_EVENT), 0);
    }

    #[tokio::test]
    async fn test_reset_requires_debug_commands() {
        let h = harness(
            MockLobbyRepository::new(),
            MockGameSnapshotRepository::new(),
            GameConfig::default(),
        );

        h.service
            .handle_command("p1", "lobby-1", GameCommand::ResetGame)
            .await;

        let events = h.notifier.events_for("p1");
        assert_eq!(events[0].0, GENERIC_ERROR_EVENT);
        assert_eq!(
            events[0].1["error"],
            GameSessionServiceError::DebugCommandsDisabled.to_string()
        );
    }

    #[tokio::test]
    async fn test_reset_restores_opening_position() {
        let config = GameConfig {
            enable_debug_commands: true,
            ..GameConfig::default()
        };
        let h = harness(
            lobbies_returning(lobby(GameType::Checkers, true)),
            accepting_snapshots(),
            config,
        );
        h.games.save(GameHandle::new(nearly_won_checkers())).await;

        h.service.reset_game("p2", "lobby-1").await.unwrap();

        let (_, update) = h.notifier.events_for("p1").pop().unwrap();
        assert_eq!(update["currentPlayerIndex"], 0);
        let handle = h.games.find_one("lobby-1").await.unwrap();
        let pieces = match &*handle.game.lock().await {
            LiveGame::Checkers(game) => game.board.piece_count(),
            LiveGame::Chess(_) => 0,
        };
        assert_eq!(pieces, 24);
    }
}
