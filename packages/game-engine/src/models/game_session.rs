use std::fmt::Debug;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::DEFAULT_RETURN_TO_LOBBY_DELAY_SECONDS,
    models::{
        board::{Board, BoardPiece, Position},
        commands::MovePieceRequest,
        player::{Direction, Player},
        snapshot::GameSnapshot,
    },
    services::errors::{move_errors::MoveError, snapshot_errors::SnapshotError},
};

pub const PLAYER_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Chess,
    Checkers,
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::Chess => write!(f, "chess"),
            GameType::Checkers => write!(f, "checkers"),
        }
    }
}

/// Terminal result of a game. A missing winner is a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOver {
    pub winner_index: Option<usize>,
    pub return_delay_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    WaitingForReady,
    InProgress,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    AlreadyReady,
    Waiting,
    Started,
}

/// What a committed move did to the game.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoveOutcome {
    pub removed_pieces: Vec<Position>,
    pub turn_passed: bool,
    pub game_over: Option<GameOver>,
}

/// Per-game rules plugged into the generic [`Game`].
pub trait GameRules: Sized + Send + Sync + 'static {
    type Piece: BoardPiece + Serialize + DeserializeOwned + 'static;
    type PlayerState: Default
        + Clone
        + Debug
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    const GAME_TYPE: GameType;

    /// Places the starting pieces. Directions are already assigned.
    fn setup(board: &mut Board<Self::Piece>, players: &mut [Player<Self::PlayerState>]);

    /// Validates and commits a move for the current player. The game is left
    /// untouched when an error is returned.
    fn apply_move(
        game: &mut Game<Self>,
        origin: Position,
        target: Position,
    ) -> Result<MoveOutcome, MoveError>;

    /// Extra per-piece checks applied when rebuilding from a snapshot.
    fn validate_piece(_piece: &Self::Piece, _position: Position) -> Result<(), String> {
        Ok(())
    }

    /// Whole-game checks applied when rebuilding from a snapshot, once every
    /// piece passed [`GameRules::validate_piece`].
    fn validate_game(_game: &Game<Self>) -> Result<(), String> {
        Ok(())
    }
}

pub trait Ready {
    fn mark_ready(&mut self, player_id: &str) -> Result<ReadyOutcome, MoveError>;
    fn all_ready(&self) -> bool;
}

pub trait Snapshotable: Sized {
    type Snapshot: Serialize + DeserializeOwned;

    fn snapshot(&self) -> Self::Snapshot;
    fn rebuild(snapshot: Self::Snapshot) -> Result<Self, SnapshotError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Game<R: GameRules> {
    pub id: String,
    pub players: Vec<Player<R::PlayerState>>,
    pub board: Board<R::Piece>,
    pub current_player_index: usize,
    pub game_started: bool,
    pub game_over: Option<GameOver>,
    pub return_delay_seconds: u64,
}

impl<R: GameRules> Game<R> {
    pub fn new(id: &str, players: [(&str, &str); PLAYER_COUNT]) -> Self {
        Game {
            id: id.to_string(),
            players: players
                .iter()
                .map(|(player_id, name)| Player::new(player_id, name))
                .collect(),
            board: Board::new(),
            current_player_index: 0,
            game_started: false,
            game_over: None,
            return_delay_seconds: DEFAULT_RETURN_TO_LOBBY_DELAY_SECONDS,
        }
    }

    pub fn status(&self) -> GameStatus {
        if self.game_over.is_some() {
            GameStatus::Over
        } else if self.game_started {
            GameStatus::InProgress
        } else {
            GameStatus::WaitingForReady
        }
    }

    pub fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|player| player.id == player_id)
    }

    /// Rejects the request unless `player_id` may move right now and
    /// returns their seat.
    pub fn ensure_can_move(&self, player_id: &str) -> Result<usize, MoveError> {
        let player_index = self
            .player_index(player_id)
            .ok_or(MoveError::PlayerNotFound)?;
        if !self.game_started {
            return Err(MoveError::GameNotStarted);
        }
        if self.game_over.is_some() {
            return Err(MoveError::GameOver);
        }
        if player_index != self.current_player_index {
            return Err(MoveError::NotYourTurn);
        }
        Ok(player_index)
    }

    pub fn move_piece(
        &mut self,
        player_id: &str,
        request: &MovePieceRequest,
    ) -> Result<MoveOutcome, MoveError> {
        self.ensure_can_move(player_id)?;
        let origin = request.origin.to_position()?;
        let target = request.target.to_position()?;
        if origin == target {
            return Err(MoveError::SameCell);
        }
        R::apply_move(self, origin, target)
    }

    /// Sets the terminal result. Later calls are ignored.
    pub fn finish(&mut self, winner_index: Option<usize>) -> Option<GameOver> {
        if self.game_over.is_none() {
            self.game_over = Some(GameOver {
                winner_index,
                return_delay_seconds: self.return_delay_seconds,
            });
        }
        self.game_over.clone()
    }

    /// Returns false when the player is not part of this game.
    pub fn mark_connected(&mut self, player_id: &str, connected: bool) -> bool {
        match self.players.iter_mut().find(|player| player.id == player_id) {
            Some(player) => {
                player.connected = connected;
                true
            }
            None => false,
        }
    }

    pub fn all_connected(&self) -> bool {
        self.players.iter().all(|player| player.connected && !player.left)
    }

    pub fn mark_left(&mut self, player_id: &str) -> Result<(), MoveError> {
        let player = self
            .players
            .iter_mut()
            .find(|player| player.id == player_id)
            .ok_or(MoveError::PlayerNotFound)?;
        player.left = true;
        player.connected = false;
        Ok(())
    }

    pub fn all_players_left(&self) -> bool {
        self.players.iter().all(|player| player.left)
    }

    /// Puts a started game back to its opening position.
    pub fn reset(&mut self) -> Result<(), MoveError> {
        if !self.game_started {
            return Err(MoveError::GameNotStarted);
        }
        self.board.clear();
        for player in &mut self.players {
            player.state = R::PlayerState::default();
        }
        R::setup(&mut self.board, &mut self.players);
        self.current_player_index = 0;
        self.game_over = None;
        Ok(())
    }

    fn start(&mut self) {
        for (index, player) in self.players.iter_mut().enumerate() {
            player.direction = Some(Direction::for_seat(index));
            player.state = R::PlayerState::default();
        }
        self.board.clear();
        R::setup(&mut self.board, &mut self.players);
        self.current_player_index = 0;
        self.game_started = true;
    }

    /// Advances the turn to the next seat and returns it.
    pub fn pass_turn(&mut self) -> usize {
        self.current_player_index = (self.current_player_index + 1) % self.players.len();
        self.current_player_index
    }
}

impl<R: GameRules> Ready for Game<R> {
    fn mark_ready(&mut self, player_id: &str) -> Result<ReadyOutcome, MoveError> {
        let player_index = self
            .player_index(player_id)
            .ok_or(MoveError::PlayerNotFound)?;
        if self.players[player_index].ready {
            return Ok(ReadyOutcome::AlreadyReady);
        }
        self.players[player_index].ready = true;

        if self.all_ready() && !self.game_started {
            self.start();
            Ok(ReadyOutcome::Started)
        } else {
            Ok(ReadyOutcome::Waiting)
        }
    }

    fn all_ready(&self) -> bool {
        self.players.iter().all(|player| player.ready)
    }
}

impl<R: GameRules> Snapshotable for Game<R> {
    type Snapshot = GameSnapshot<R::Piece, R::PlayerState>;

    fn snapshot(&self) -> Self::Snapshot {
        GameSnapshot {
            id: self.id.clone(),
            players: self.players.clone(),
            cells: self.board.rows(),
            current_player_index: self.current_player_index,
            game_over: self.game_over.clone(),
            game_started: self.game_started,
        }
    }

    fn rebuild(snapshot: Self::Snapshot) -> Result<Self, SnapshotError> {
        let mismatch = SnapshotError::SchemaMismatch;

        if snapshot.id.is_empty() {
            return Err(mismatch("game id is empty".to_string()));
        }
        if snapshot.players.len() != PLAYER_COUNT {
            return Err(mismatch(format!(
                "expected {} players, found {}",
                PLAYER_COUNT,
                snapshot.players.len()
            )));
        }
        if snapshot.players[0].id == snapshot.players[1].id {
            return Err(mismatch("player ids are not unique".to_string()));
        }
        if snapshot.current_player_index >= PLAYER_COUNT {
            return Err(mismatch(format!(
                "current player index {} is out of range",
                snapshot.current_player_index
            )));
        }
        if let Some(game_over) = &snapshot.game_over {
            if game_over.winner_index.is_some_and(|winner| winner >= PLAYER_COUNT) {
                return Err(mismatch("winner index is out of range".to_string()));
            }
            if !snapshot.game_started {
                return Err(mismatch("game is over but was never started".to_string()));
            }
        }
        if snapshot.game_started
            && snapshot.players.iter().any(|player| player.direction.is_none())
        {
            return Err(mismatch("started game has a player without direction".to_string()));
        }
        if snapshot.players[0].direction.is_some()
            && snapshot.players[0].direction == snapshot.players[1].direction
        {
            return Err(mismatch("both players share one direction".to_string()));
        }

        let board = Board::<R::Piece>::from_rows(snapshot.cells).map_err(mismatch)?;
        for cell in board.cells() {
            if let Some(piece) = &cell.piece {
                if piece.player_index() >= PLAYER_COUNT {
                    return Err(mismatch(format!(
                        "piece at {} belongs to unknown player {}",
                        cell.position(),
                        piece.player_index()
                    )));
                }
                R::validate_piece(piece, cell.position()).map_err(mismatch)?;
            }
        }

        let return_delay_seconds = snapshot
            .game_over
            .as_ref()
            .map(|game_over| game_over.return_delay_seconds)
            .unwrap_or(DEFAULT_RETURN_TO_LOBBY_DELAY_SECONDS);

        let game = Game {
            id: snapshot.id,
            players: snapshot.players,
            board,
            current_player_index: snapshot.current_player_index,
            game_started: snapshot.game_started,
            game_over: snapshot.game_over,
            return_delay_seconds,
        };
        R::validate_game(&game).map_err(mismatch)?;
        Ok(game)
    }
}
