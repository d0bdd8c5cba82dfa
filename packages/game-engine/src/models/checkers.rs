use serde::{Deserialize, Serialize};

use crate::models::board::{Board, BoardPiece, Position};
use crate::models::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MoveMode {
    Regular,
    King,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckersPiece {
    pub player_index: usize,
    pub move_mode: MoveMode,
}

impl CheckersPiece {
    pub fn new(player_index: usize) -> Self {
        CheckersPiece {
            player_index,
            move_mode: MoveMode::Regular,
        }
    }

    pub fn king(player_index: usize) -> Self {
        CheckersPiece {
            player_index,
            move_mode: MoveMode::King,
        }
    }
}

impl BoardPiece for CheckersPiece {
    fn player_index(&self) -> usize {
        self.player_index
    }
}

/// While a capture chain is in progress the player may only continue with
/// the piece standing on this position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckersPlayerState {
    #[serde(rename = "strikeLock")]
    pub piece_that_has_striked_position: Option<Position>,
}

pub type CheckersBoard = Board<CheckersPiece>;
pub type CheckersPlayer = Player<CheckersPlayerState>;

/// Checkers pieces only ever stand on these cells.
pub fn is_playable(position: Position) -> bool {
    (position.row + position.column) % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playable_cells() {
        assert!(is_playable(Position::new(5, 2)));
        assert!(is_playable(Position::new(0, 1)));
        assert!(!is_playable(Position::new(0, 0)));
    }

    #[test]
    fn test_strike_lock_serialization() {
        let state = CheckersPlayerState {
            piece_that_has_striked_position: Some(Position::new(3, 0)),
        };

        let serialized = serde_json::to_string(&state).unwrap();
        assert_eq!(serialized, "{\"strikeLock\":{\"row\":3,\"column\":0}}");
    }
}
