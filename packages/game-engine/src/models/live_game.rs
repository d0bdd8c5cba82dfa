use chrono::Utc;
use serde_json::Value;
use tracing::error;

use crate::{
    models::{
        commands::MovePieceRequest,
        game_session::{
            Game, GameOver, GameRules, GameStatus, GameType, MoveOutcome, Ready, ReadyOutcome,
            Snapshotable, PLAYER_COUNT,
        },
        player::{direction_of, Direction},
        responses::{GameStateUpdateResponse, InterruptingMessage},
        snapshot::StoredSnapshot,
    },
    services::{
        checkers_service::CheckersService,
        chess_service::ChessService,
        errors::{move_errors::MoveError, snapshot_errors::SnapshotError},
    },
};

/// A running game of any supported type.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveGame {
    Chess(Game<ChessService>),
    Checkers(Game<CheckersService>),
}

macro_rules! with_game {
    ($live:expr, $game:ident => $body:expr) => {
        match $live {
            LiveGame::Chess($game) => $body,
            LiveGame::Checkers($game) => $body,
        }
    };
}

fn state_update<R: GameRules>(
    game: &Game<R>,
    viewer_index: usize,
    message: Option<&InterruptingMessage>,
) -> Result<Value, serde_json::Error> {
    let mirrored = direction_of(&game.players, viewer_index) == Direction::Down;
    let viewer_board = if mirrored {
        game.board.mirror().rows()
    } else {
        game.board.rows()
    };

    serde_json::to_value(GameStateUpdateResponse {
        lobby_id: game.id.clone(),
        game_type: R::GAME_TYPE,
        status: game.status(),
        players: game.players.clone(),
        viewer_index,
        current_player_index: game.current_player_index,
        is_your_turn: game.game_started
            && game.game_over.is_none()
            && game.current_player_index == viewer_index,
        board: game.board.rows(),
        viewer_board,
        mirrored,
        game_over: game.game_over.clone(),
        interrupting_message: message.map(|message| message.remaining_at(Utc::now())),
    })
}

impl LiveGame {
    pub fn new(
        game_type: GameType,
        id: &str,
        players: [(&str, &str); PLAYER_COUNT],
        return_delay_seconds: u64,
    ) -> Self {
        let mut live = match game_type {
            GameType::Chess => LiveGame::Chess(Game::new(id, players)),
            GameType::Checkers => LiveGame::Checkers(Game::new(id, players)),
        };
        live.set_return_delay(return_delay_seconds);
        live
    }

    pub fn id(&self) -> &str {
        with_game!(self, game => game.id.as_str())
    }

    pub fn game_type(&self) -> GameType {
        match self {
            LiveGame::Chess(_) => GameType::Chess,
            LiveGame::Checkers(_) => GameType::Checkers,
        }
    }

    pub fn status(&self) -> GameStatus {
        with_game!(self, game => game.status())
    }

    pub fn game_over(&self) -> Option<&GameOver> {
        with_game!(self, game => game.game_over.as_ref())
    }

    pub fn set_return_delay(&mut self, seconds: u64) {
        with_game!(self, game => game.return_delay_seconds = seconds)
    }

    /// Players that have not left the game.
    pub fn present_player_ids(&self) -> Vec<String> {
        with_game!(self, game => game
            .players
            .iter()
            .filter(|player| !player.left)
            .map(|player| player.id.clone())
            .collect())
    }

    pub fn player_name(&self, player_id: &str) -> Option<String> {
        with_game!(self, game => game
            .players
            .iter()
            .find(|player| player.id == player_id)
            .map(|player| player.name.clone()))
    }

    pub fn player_name_at(&self, player_index: usize) -> Option<String> {
        with_game!(self, game => game.players.get(player_index).map(|player| player.name.clone()))
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        with_game!(self, game => game.player_index(player_id).is_some())
    }

    pub fn mark_ready(&mut self, player_id: &str) -> Result<ReadyOutcome, MoveError> {
        with_game!(self, game => game.mark_ready(player_id))
    }

    pub fn move_piece(
        &mut self,
        player_id: &str,
        request: &MovePieceRequest,
    ) -> Result<MoveOutcome, MoveError> {
        with_game!(self, game => game.move_piece(player_id, request))
    }

    pub fn mark_connected(&mut self, player_id: &str, connected: bool) -> bool {
        with_game!(self, game => game.mark_connected(player_id, connected))
    }

    pub fn all_connected(&self) -> bool {
        with_game!(self, game => game.all_connected())
    }

    pub fn mark_left(&mut self, player_id: &str) -> Result<(), MoveError> {
        with_game!(self, game => game.mark_left(player_id))
    }

    pub fn all_players_left(&self) -> bool {
        with_game!(self, game => game.all_players_left())
    }

    pub fn reset(&mut self) -> Result<(), MoveError> {
        with_game!(self, game => game.reset())
    }

    pub fn snapshot(&self) -> StoredSnapshot {
        match self {
            LiveGame::Chess(game) => StoredSnapshot::Chess(game.snapshot()),
            LiveGame::Checkers(game) => StoredSnapshot::Checkers(game.snapshot()),
        }
    }

    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.snapshot())
    }

    pub fn from_snapshot(stored: StoredSnapshot) -> Result<Self, SnapshotError> {
        match stored {
            StoredSnapshot::Chess(snapshot) => {
                Game::<ChessService>::rebuild(snapshot).map(LiveGame::Chess)
            }
            StoredSnapshot::Checkers(snapshot) => {
                Game::<CheckersService>::rebuild(snapshot).map(LiveGame::Checkers)
            }
        }
    }

    /// Parses and validates stored snapshot bytes. Nothing is built unless
    /// the whole snapshot is valid.
    pub fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let stored: StoredSnapshot = serde_json::from_slice(bytes)?;
        Self::from_snapshot(stored)
    }

    /// `GameStateUpdateResponse` payload for one participant.
    pub fn state_update_for(
        &self,
        player_id: &str,
        message: Option<&InterruptingMessage>,
    ) -> Option<Value> {
        with_game!(self, game => {
            let viewer_index = game.player_index(player_id)?;
            match state_update(game, viewer_index, message) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    error!("Failed to serialize state update for {}: {}", player_id, e);
                    None
                }
            }
        })
    }

    /// One state update per player still in the game.
    pub fn state_updates(&self, message: Option<&InterruptingMessage>) -> Vec<(String, Value)> {
        self.present_player_ids()
            .into_iter()
            .filter_map(|player_id| {
                self.state_update_for(&player_id, message)
                    .map(|payload| (player_id, payload))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::board::Position;

    fn started(game_type: GameType) -> LiveGame {
        let mut live = LiveGame::new(game_type, "lobby-1", [("p1", "Alice"), ("p2", "Bob")], 60);
        live.mark_ready("p1").unwrap();
        live.mark_ready("p2").unwrap();
        live
    }

    #[test]
    fn test_snapshot_bytes_round_trip() {
        for game_type in [GameType::Chess, GameType::Checkers] {
            let mut live = started(game_type);
            let request = match game_type {
                GameType::Chess => MovePieceRequest::new(Position::new(6, 4), Position::new(4, 4)),
                GameType::Checkers => {
                    MovePieceRequest::new(Position::new(5, 2), Position::new(4, 3))
                }
            };
            live.move_piece("p1", &request).unwrap();

            let bytes = live.snapshot_bytes().unwrap();
            let rebuilt = LiveGame::from_snapshot_bytes(&bytes).unwrap();

            assert_eq!(rebuilt, live);
            assert_eq!(rebuilt.game_type(), game_type);
        }
    }

    #[test]
    fn test_snapshot_is_tagged_with_game_type() {
        let live = started(GameType::Checkers);

        let value: Value = serde_json::from_slice(&live.snapshot_bytes().unwrap()).unwrap();

        assert_eq!(value["gameType"], "checkers");
        assert_eq!(value["id"], "lobby-1");
        assert_eq!(value["currentPlayerIndex"], 0);
        assert_eq!(value["gameStarted"], true);
        assert_eq!(value["cells"].as_array().unwrap().len(), 8);
        assert!(value["players"][0]["strikeLock"].is_null());
    }

    #[test]
    fn test_malformed_snapshot_is_rejected() {
        let result = LiveGame::from_snapshot_bytes(b"{\"id\": ");

        assert!(matches!(result, Err(SnapshotError::MalformedJson(_))));
    }

    #[test]
    fn test_snapshot_with_wrong_shape_is_rejected() {
        let result = LiveGame::from_snapshot_bytes(br#"{"gameType":"chess","id":"lobby-1"}"#);

        assert!(matches!(result, Err(SnapshotError::SchemaMismatch(_))));
    }

    #[test]
    fn test_snapshot_with_short_board_is_rejected() {
        let live = started(GameType::Chess);
        let mut value: Value = serde_json::from_slice(&live.snapshot_bytes().unwrap()).unwrap();
        value["cells"].as_array_mut().unwrap().pop();

        let result = LiveGame::from_snapshot_bytes(&serde_json::to_vec(&value).unwrap());

        assert!(matches!(result, Err(SnapshotError::SchemaMismatch(_))));
    }

    #[test]
    fn test_snapshot_with_out_of_turn_strike_lock_is_rejected() {
        let live = started(GameType::Checkers);
        let mut value: Value = serde_json::from_slice(&live.snapshot_bytes().unwrap()).unwrap();
        value["players"][1]["strikeLock"] = serde_json::json!({"row": 5, "column": 0});

        let result = LiveGame::from_snapshot_bytes(&serde_json::to_vec(&value).unwrap());

        assert!(matches!(result, Err(SnapshotError::SchemaMismatch(_))));
    }

    #[test]
    fn test_state_update_mirrors_board_for_top_player() {
        let live = started(GameType::Chess);

        let bottom = live.state_update_for("p1", None).unwrap();
        let top = live.state_update_for("p2", None).unwrap();

        assert_eq!(bottom["mirrored"], false);
        assert_eq!(bottom["isYourTurn"], true);
        assert_eq!(bottom["viewerBoard"], bottom["board"]);
        assert_eq!(top["mirrored"], true);
        assert_eq!(top["isYourTurn"], false);
        // the top player sees their own king on the bottom row
        assert_eq!(top["viewerBoard"][7][3]["piece"]["kind"], "king");
        assert_eq!(top["viewerBoard"][7][3]["piece"]["playerIndex"], 1);
        assert_eq!(top["board"][0][4]["piece"]["kind"], "king");
    }

    #[test]
    fn test_state_update_for_stranger_is_none() {
        let live = started(GameType::Chess);

        assert!(live.state_update_for("stranger", None).is_none());
    }

    #[test]
    fn test_state_updates_skip_players_who_left() {
        let mut live = started(GameType::Checkers);
        live.mark_left("p2").unwrap();

        let updates = live.state_updates(None);

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "p1");
    }
}
