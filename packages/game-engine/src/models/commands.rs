use serde::{Deserialize, Serialize};

use crate::{models::board::Position, services::errors::move_errors::MoveError};

/// Coordinates as sent by clients. Signed so that off-board values can be
/// reported instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCoordinates {
    pub row: i64,
    pub column: i64,
}

impl BoardCoordinates {
    pub fn to_position(self) -> Result<Position, MoveError> {
        Position::from_signed(self.row, self.column).ok_or(MoveError::OutOfBoard)
    }
}

impl From<Position> for BoardCoordinates {
    fn from(position: Position) -> Self {
        BoardCoordinates {
            row: position.row as i64,
            column: position.column as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePieceRequest {
    pub origin: BoardCoordinates,
    pub target: BoardCoordinates,
}

impl MovePieceRequest {
    pub fn new(origin: Position, target: Position) -> Self {
        MovePieceRequest {
            origin: origin.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload")]
pub enum GameCommand {
    ReadyToPlay,
    MovePiece(MovePieceRequest),
    LeaveGame,
    RequestGameStateUpdate,
    ResetGame,
}

impl GameCommand {
    pub fn name(&self) -> &'static str {
        match self {
            GameCommand::ReadyToPlay => "ReadyToPlay",
            GameCommand::MovePiece(_) => "MovePiece",
            GameCommand::LeaveGame => "LeaveGame",
            GameCommand::RequestGameStateUpdate => "RequestGameStateUpdate",
            GameCommand::ResetGame => "ResetGame",
        }
    }
}

/// Body of a websocket frame addressed to a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundCommand {
    pub lobby_id: String,
    #[serde(flatten)]
    pub command: GameCommand,
}
