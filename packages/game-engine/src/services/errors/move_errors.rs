use std::fmt;

use crate::models::board::Position;

/// Reasons a command was refused by a live game. These never change game
/// state and are reported only to the player who sent the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    PlayerNotFound,
    GameNotStarted,
    GameOver,
    NotYourTurn,
    OutOfBoard,
    SameCell,
    NoPieceAtOrigin(Position),
    NotYourPiece(Position),
    OwnPieceAtTarget(Position),
    IllegalDestination { origin: Position, target: Position },
    SelfCheck,
    CastlingNotAllowed(String),
    StrikeLocked(Position),
    CaptureRequired,
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MoveError::PlayerNotFound => write!(f, "You are not a player in this game"),
            MoveError::GameNotStarted => write!(f, "The game has not started yet"),
            MoveError::GameOver => write!(f, "The game is already over"),
            MoveError::NotYourTurn => write!(f, "It is not your turn"),
            MoveError::OutOfBoard => write!(f, "Move is outside of the board"),
            MoveError::SameCell => write!(f, "Origin and target are the same cell"),
            MoveError::NoPieceAtOrigin(position) => write!(f, "There is no piece at {}", position),
            MoveError::NotYourPiece(position) => {
                write!(f, "The piece at {} does not belong to you", position)
            }
            MoveError::OwnPieceAtTarget(position) => {
                write!(f, "You already have a piece at {}", position)
            }
            MoveError::IllegalDestination { origin, target } => {
                write!(f, "The piece at {} cannot move to {}", origin, target)
            }
            MoveError::SelfCheck => write!(f, "You may not move into check"),
            MoveError::CastlingNotAllowed(reason) => write!(f, "Castling not allowed: {}", reason),
            MoveError::StrikeLocked(position) => {
                write!(f, "You must continue striking with the piece at {}", position)
            }
            MoveError::CaptureRequired => write!(f, "You must continue striking"),
        }
    }
}

impl std::error::Error for MoveError {}
