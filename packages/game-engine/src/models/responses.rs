use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    board::Cell,
    game_session::{GameOver, GameStatus, GameType},
    player::Player,
};

pub const GAME_STATE_UPDATE_EVENT: &str = "GameStateUpdateResponse";
pub const GENERIC_ERROR_EVENT: &str = "GenericResponseError";
pub const RETURN_TO_LOBBY_EVENT: &str = "ReturnToLobbyResponse";

/// Overlay shown on top of the board, optionally with a live countdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptingMessage {
    pub title: String,
    pub message: String,
    pub countdown_seconds: Option<u64>,
    pub deadline: Option<DateTime<Utc>>,
}

impl InterruptingMessage {
    pub fn new(title: &str, message: &str) -> Self {
        InterruptingMessage {
            title: title.to_string(),
            message: message.to_string(),
            countdown_seconds: None,
            deadline: None,
        }
    }

    pub fn with_countdown(mut self, seconds: u64) -> Self {
        self.countdown_seconds = Some(seconds);
        self.deadline = Some(Utc::now() + Duration::seconds(seconds as i64));
        self
    }

    /// Copy of the message with the countdown recomputed against `now`.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Self {
        let mut message = self.clone();
        if let Some(deadline) = self.deadline {
            message.countdown_seconds = Some((deadline - now).num_seconds().max(0) as u64);
        }
        message
    }
}

/// Full game state as seen by one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateUpdateResponse<P, S> {
    pub lobby_id: String,
    pub game_type: GameType,
    pub status: GameStatus,
    pub players: Vec<Player<S>>,
    pub viewer_index: usize,
    pub current_player_index: usize,
    pub is_your_turn: bool,
    pub board: Vec<Vec<Cell<P>>>,
    pub viewer_board: Vec<Vec<Cell<P>>>,
    pub mirrored: bool,
    pub game_over: Option<GameOver>,
    pub interrupting_message: Option<InterruptingMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericResponseError {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnToLobbyResponse {
    pub lobby_id: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_counts_down_to_zero() {
        let message = InterruptingMessage::new("Player left", "Bob left the game").with_countdown(30);
        let deadline = message.deadline.unwrap();

        let halfway = message.remaining_at(deadline - Duration::seconds(12));
        let late = message.remaining_at(deadline + Duration::seconds(5));

        assert_eq!(halfway.countdown_seconds, Some(12));
        assert_eq!(late.countdown_seconds, Some(0));
    }

    #[test]
    fn test_message_without_countdown_is_unchanged() {
        let message = InterruptingMessage::new("Check", "Your king is attacked");

        assert_eq!(message.remaining_at(Utc::now()), message);
    }

    #[test]
    fn test_error_serialization() {
        let response = GenericResponseError {
            error: "It is not your turn".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"error": "It is not your turn"})
        );
    }
}
