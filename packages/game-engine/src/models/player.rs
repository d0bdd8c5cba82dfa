use serde::{Deserialize, Serialize};

/// Which way "forward" points for a player's pawns or regular pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Seat 0 starts on the bottom edge and moves up; seat 1 mirrors it.
    pub fn for_seat(player_index: usize) -> Self {
        if player_index == 0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn forward(self) -> isize {
        match self {
            Direction::Up => -1,
            Direction::Down => 1,
        }
    }

    /// The row a piece moving in this direction is trying to reach.
    pub fn far_row(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => crate::models::board::ROWS - 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player<S> {
    pub id: String,
    pub name: String,
    pub ready: bool,
    pub connected: bool,
    #[serde(default)]
    pub left: bool,
    pub direction: Option<Direction>,
    #[serde(flatten)]
    pub state: S,
}

impl<S: Default> Player<S> {
    pub fn new(id: &str, name: &str) -> Self {
        Player {
            id: id.to_string(),
            name: name.to_string(),
            ready: false,
            connected: true,
            left: false,
            direction: None,
            state: S::default(),
        }
    }
}

/// Direction of a seat, falling back to the seat default before the game has
/// assigned one.
pub fn direction_of<S>(players: &[Player<S>], player_index: usize) -> Direction {
    players
        .get(player_index)
        .and_then(|player| player.direction)
        .unwrap_or_else(|| Direction::for_seat(player_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_directions() {
        assert_eq!(Direction::for_seat(0), Direction::Up);
        assert_eq!(Direction::for_seat(1), Direction::Down);
        assert_eq!(Direction::Up.forward(), -1);
        assert_eq!(Direction::Down.far_row(), 7);
    }

    #[test]
    fn test_new_player_defaults() {
        let player: Player<()> = Player::new("player1", "Alice");

        assert_eq!(player.id, "player1");
        assert!(!player.ready);
        assert!(player.connected);
        assert!(!player.left);
        assert!(player.direction.is_none());
    }

    #[test]
    fn test_direction_of_prefers_assigned_direction() {
        let mut players: Vec<Player<()>> = vec![Player::new("a", "A"), Player::new("b", "B")];
        assert_eq!(direction_of(&players, 1), Direction::Down);

        players[1].direction = Some(Direction::Up);
        assert_eq!(direction_of(&players, 1), Direction::Up);
    }
}
