use serde::{Deserialize, Serialize};

use crate::models::{
    board::Cell,
    checkers::{CheckersPiece, CheckersPlayerState},
    chess::{ChessPiece, ChessPlayerState},
    game_session::GameOver,
    player::Player,
};

/// Everything needed to resume a game. Timers and connections are not part
/// of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot<P, S> {
    pub id: String,
    pub players: Vec<Player<S>>,
    pub cells: Vec<Vec<Cell<P>>>,
    pub current_player_index: usize,
    pub game_over: Option<GameOver>,
    pub game_started: bool,
}

/// Stored form of a snapshot, tagged with the game it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gameType", rename_all = "lowercase")]
pub enum StoredSnapshot {
    Chess(GameSnapshot<ChessPiece, ChessPlayerState>),
    Checkers(GameSnapshot<CheckersPiece, CheckersPlayerState>),
}

impl StoredSnapshot {
    pub fn id(&self) -> &str {
        match self {
            StoredSnapshot::Chess(snapshot) => &snapshot.id,
            StoredSnapshot::Checkers(snapshot) => &snapshot.id,
        }
    }
}
