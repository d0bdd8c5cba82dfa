use serde::{Deserialize, Serialize};

use crate::models::board::{Board, BoardPiece, Position};
use crate::models::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChessPieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChessPiece {
    pub kind: ChessPieceKind,
    pub player_index: usize,
    pub row: usize,
    pub column: usize,
    #[serde(default)]
    pub has_moved: bool,
    #[serde(default)]
    pub has_reached_end_of_board: bool,
}

impl ChessPiece {
    pub fn new(kind: ChessPieceKind, player_index: usize, position: Position) -> Self {
        ChessPiece {
            kind,
            player_index,
            row: position.row,
            column: position.column,
            has_moved: false,
            has_reached_end_of_board: false,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.row, self.column)
    }
}

impl BoardPiece for ChessPiece {
    fn player_index(&self) -> usize {
        self.player_index
    }

    fn relocate(&mut self, position: Position) {
        self.row = position.row;
        self.column = position.column;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChessPlayerStatus {
    #[default]
    Regular,
    Check,
    CheckMate,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChessPlayerState {
    pub state: ChessPlayerStatus,
}

pub type ChessBoard = Board<ChessPiece>;
pub type ChessPlayer = Player<ChessPlayerState>;

/// Back rank from column 0 to column 7.
pub const BACK_RANK: [ChessPieceKind; 8] = [
    ChessPieceKind::Rook,
    ChessPieceKind::Knight,
    ChessPieceKind::Bishop,
    ChessPieceKind::Queen,
    ChessPieceKind::King,
    ChessPieceKind::Bishop,
    ChessPieceKind::Knight,
    ChessPieceKind::Rook,
];
