use tracing::debug;

use crate::{
    models::{
        board::{Position, ROWS},
        checkers::{
            is_playable, CheckersBoard, CheckersPiece, CheckersPlayer, CheckersPlayerState,
            MoveMode,
        },
        game_session::{Game, GameRules, GameType, MoveOutcome},
        player::{direction_of, Direction},
    },
    services::errors::move_errors::MoveError,
};

const ALL_DIAGONALS: [(isize, isize); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckersMoveKind {
    Step,
    Capture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckersMove {
    pub origin: Position,
    pub target: Position,
    pub kind: CheckersMoveKind,
    pub remove_pieces: Vec<Position>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckersService;

fn move_directions(piece: &CheckersPiece, direction: Direction) -> Vec<(isize, isize)> {
    match piece.move_mode {
        MoveMode::King => ALL_DIAGONALS.to_vec(),
        MoveMode::Regular => vec![(direction.forward(), -1), (direction.forward(), 1)],
    }
}

/// Steps and single captures available to the piece at `origin`, ignoring
/// any strike lock.
pub fn candidate_moves(
    board: &CheckersBoard,
    players: &[CheckersPlayer],
    origin: Position,
) -> Vec<CheckersMove> {
    let Some(piece) = board.piece_at(origin) else {
        return Vec::new();
    };
    let direction = direction_of(players, piece.player_index);

    let mut moves = Vec::new();
    for (d_row, d_column) in move_directions(piece, direction) {
        let Some(next) = origin.offset(d_row, d_column) else {
            continue;
        };
        match board.piece_at(next) {
            None => moves.push(CheckersMove {
                origin,
                target: next,
                kind: CheckersMoveKind::Step,
                remove_pieces: Vec::new(),
            }),
            Some(other) if other.player_index != piece.player_index => {
                if let Some(landing) = next.offset(d_row, d_column) {
                    if board.is_empty(landing) {
                        moves.push(CheckersMove {
                            origin,
                            target: landing,
                            kind: CheckersMoveKind::Capture,
                            remove_pieces: vec![next],
                        });
                    }
                }
            }
            Some(_) => {}
        }
    }
    moves
}

pub fn capture_moves(
    board: &CheckersBoard,
    players: &[CheckersPlayer],
    origin: Position,
) -> Vec<CheckersMove> {
    candidate_moves(board, players, origin)
        .into_iter()
        .filter(|candidate| candidate.kind == CheckersMoveKind::Capture)
        .collect()
}

pub fn validate_move(
    board: &CheckersBoard,
    players: &[CheckersPlayer],
    current: usize,
    origin: Position,
    target: Position,
) -> Result<CheckersMove, MoveError> {
    let piece = board
        .piece_at(origin)
        .ok_or(MoveError::NoPieceAtOrigin(origin))?;
    if piece.player_index != current {
        return Err(MoveError::NotYourPiece(origin));
    }
    if origin == target {
        return Err(MoveError::SameCell);
    }
    if let Some(other) = board.piece_at(target) {
        if other.player_index == current {
            return Err(MoveError::OwnPieceAtTarget(target));
        }
        return Err(MoveError::IllegalDestination { origin, target });
    }

    let lock = players
        .get(current)
        .and_then(|player| player.state.piece_that_has_striked_position);
    if let Some(locked) = lock {
        if locked != origin {
            return Err(MoveError::StrikeLocked(locked));
        }
    }

    let chosen = candidate_moves(board, players, origin)
        .into_iter()
        .find(|candidate| candidate.target == target)
        .ok_or(MoveError::IllegalDestination { origin, target })?;

    if lock.is_some() && chosen.kind != CheckersMoveKind::Capture {
        return Err(MoveError::CaptureRequired);
    }

    Ok(chosen)
}

/// Every (origin, target) pair `player_index` may play right now.
pub fn legal_moves(
    board: &CheckersBoard,
    players: &[CheckersPlayer],
    player_index: usize,
) -> Vec<(Position, Position)> {
    board
        .positions_of(player_index)
        .into_iter()
        .flat_map(|origin| candidate_moves(board, players, origin))
        .filter(|candidate| {
            validate_move(board, players, player_index, candidate.origin, candidate.target).is_ok()
        })
        .map(|candidate| (candidate.origin, candidate.target))
        .collect()
}

/// True when `player_index` has no pieces left or none of them can move.
pub fn determine_game_over(
    board: &CheckersBoard,
    players: &[CheckersPlayer],
    player_index: usize,
) -> bool {
    let positions = board.positions_of(player_index);
    if positions.is_empty() {
        return true;
    }
    positions
        .into_iter()
        .all(|origin| candidate_moves(board, players, origin).is_empty())
}

impl CheckersService {
    pub fn new() -> Self {
        CheckersService
    }
}

impl GameRules for CheckersService {
    type Piece = CheckersPiece;
    type PlayerState = CheckersPlayerState;

    const GAME_TYPE: GameType = GameType::Checkers;

    fn setup(board: &mut CheckersBoard, players: &mut [CheckersPlayer]) {
        for player_index in 0..players.len() {
            let rows = match direction_of(players, player_index) {
                Direction::Up => ROWS - 3..ROWS,
                Direction::Down => 0..3,
            };
            for row in rows {
                for column in 0..crate::models::board::COLUMNS {
                    let position = Position::new(row, column);
                    if is_playable(position) {
                        board.place(CheckersPiece::new(player_index), position);
                    }
                }
            }
        }
    }

    fn apply_move(
        game: &mut Game<Self>,
        origin: Position,
        target: Position,
    ) -> Result<MoveOutcome, MoveError> {
        let current = game.current_player_index;
        let checkers_move = validate_move(&game.board, &game.players, current, origin, target)?;

        let mut piece = game
            .board
            .remove(origin)
            .ok_or(MoveError::NoPieceAtOrigin(origin))?;
        for captured in &checkers_move.remove_pieces {
            game.board.remove(*captured);
        }

        let promoted = piece.move_mode == MoveMode::Regular
            && target.row == direction_of(&game.players, current).far_row();
        if promoted {
            piece.move_mode = MoveMode::King;
        }
        game.board.place(piece, target);

        let chain_continues = checkers_move.kind == CheckersMoveKind::Capture
            && !promoted
            && !capture_moves(&game.board, &game.players, target).is_empty();

        if chain_continues {
            debug!(
                "Player {} keeps striking from {} in game {}",
                current, target, game.id
            );
            game.players[current].state.piece_that_has_striked_position = Some(target);
            return Ok(MoveOutcome {
                removed_pieces: checkers_move.remove_pieces,
                turn_passed: false,
                game_over: None,
            });
        }

        game.players[current].state.piece_that_has_striked_position = None;
        let next = game.pass_turn();
        let game_over = if determine_game_over(&game.board, &game.players, next) {
            debug!("Player {} cannot move in game {}", next, game.id);
            game.finish(Some(current))
        } else {
            None
        };

        Ok(MoveOutcome {
            removed_pieces: checkers_move.remove_pieces,
            turn_passed: true,
            game_over,
        })
    }

    fn validate_game(game: &Game<Self>) -> Result<(), String> {
        for (player_index, player) in game.players.iter().enumerate() {
            let Some(lock) = player.state.piece_that_has_striked_position else {
                continue;
            };
            if !game.game_started || game.game_over.is_some() {
                return Err(format!("player {} holds a strike lock outside play", player_index));
            }
            if player_index != game.current_player_index {
                return Err(format!(
                    "player {} holds a strike lock out of turn",
                    player_index
                ));
            }
            let lock = Position::from_signed(lock.row as i64, lock.column as i64)
                .ok_or_else(|| format!("strike lock {} is off the board", lock))?;
            match game.board.piece_at(lock) {
                Some(piece) if piece.player_index == player_index => {}
                _ => {
                    return Err(format!(
                        "strike lock {} does not hold a piece of player {}",
                        lock, player_index
                    ))
                }
            }
            if capture_moves(&game.board, &game.players, lock).is_empty() {
                return Err(format!("locked piece at {} has no capture", lock));
            }
        }
        Ok(())
    }

    fn validate_piece(_piece: &CheckersPiece, position: Position) -> Result<(), String> {
        if !is_playable(position) {
            return Err(format!("checkers piece on unplayable cell {}", position));
        }
        Ok(())
    }
}
