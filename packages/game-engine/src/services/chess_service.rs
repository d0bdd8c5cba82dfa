use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::{
    models::{
        board::{Position, COLUMNS},
        chess::{
            ChessBoard, ChessPiece, ChessPieceKind, ChessPlayer, ChessPlayerState,
            ChessPlayerStatus, BACK_RANK,
        },
        game_session::{Game, GameOver, GameRules, GameType, MoveOutcome},
        player::{direction_of, Direction},
    },
    services::errors::move_errors::MoveError,
};

const ORTHOGONAL: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIAGONAL: [(isize, isize); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const KNIGHT_OFFSETS: [(isize, isize); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChessMoveKind {
    Regular,
    Castle {
        rook_origin: Position,
        rook_target: Position,
    },
}

/// A validated move, ready to be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChessMove {
    pub origin: Position,
    pub target: Position,
    pub kind: ChessMoveKind,
    pub reaches_end_of_board: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChessService;

fn opponent_of(player_index: usize) -> usize {
    1 - player_index
}

/// Walks each direction until the edge, the first occupied cell, or `reach`
/// steps. An occupied cell is included only when it holds an opponent piece.
fn slide(
    board: &ChessBoard,
    origin: Position,
    player_index: usize,
    directions: &[(isize, isize)],
    reach: usize,
) -> BTreeSet<Position> {
    let mut positions = BTreeSet::new();
    for &(d_row, d_column) in directions {
        let mut current = origin;
        for _ in 0..reach {
            let Some(next) = current.offset(d_row, d_column) else {
                break;
            };
            match board.piece_at(next) {
                None => {
                    positions.insert(next);
                    current = next;
                }
                Some(other) => {
                    if other.player_index != player_index {
                        positions.insert(next);
                    }
                    break;
                }
            }
        }
    }
    positions
}

fn pawn_attacks(origin: Position, direction: Direction) -> BTreeSet<Position> {
    [-1, 1]
        .into_iter()
        .filter_map(|d_column| origin.offset(direction.forward(), d_column))
        .collect()
}

/// Squares `piece` can reach on `board`, castle targets included.
pub fn valid_positions(
    piece: &ChessPiece,
    board: &ChessBoard,
    players: &[ChessPlayer],
) -> BTreeSet<Position> {
    let origin = piece.position();
    let owner = piece.player_index;

    match piece.kind {
        ChessPieceKind::Rook => slide(board, origin, owner, &ORTHOGONAL, COLUMNS),
        ChessPieceKind::Bishop => slide(board, origin, owner, &DIAGONAL, COLUMNS),
        ChessPieceKind::Queen => {
            let mut positions = slide(board, origin, owner, &ORTHOGONAL, COLUMNS);
            positions.extend(slide(board, origin, owner, &DIAGONAL, COLUMNS));
            positions
        }
        ChessPieceKind::King => {
            let mut positions = slide(board, origin, owner, &ORTHOGONAL, 1);
            positions.extend(slide(board, origin, owner, &DIAGONAL, 1));
            positions.extend(
                [-2, 2]
                    .into_iter()
                    .filter_map(|d_column| origin.offset(0, d_column))
                    .filter(|target| board.is_empty(*target)),
            );
            positions
        }
        ChessPieceKind::Knight => KNIGHT_OFFSETS
            .iter()
            .filter_map(|&(d_row, d_column)| origin.offset(d_row, d_column))
            .filter(|target| {
                board
                    .piece_at(*target)
                    .map_or(true, |other| other.player_index != owner)
            })
            .collect(),
        ChessPieceKind::Pawn => {
            let direction = direction_of(players, owner);
            let mut positions = BTreeSet::new();

            if let Some(one) = origin.offset(direction.forward(), 0) {
                if board.is_empty(one) {
                    positions.insert(one);
                    if !piece.has_moved {
                        if let Some(two) = one.offset(direction.forward(), 0) {
                            if board.is_empty(two) {
                                positions.insert(two);
                            }
                        }
                    }
                }
            }

            positions.extend(pawn_attacks(origin, direction).into_iter().filter(|target| {
                board
                    .piece_at(*target)
                    .is_some_and(|other| other.player_index != owner)
            }));
            positions
        }
    }
}

/// Reachable squares for every piece of `player_index`, keyed by origin.
pub fn valid_position_map(
    board: &ChessBoard,
    players: &[ChessPlayer],
    player_index: usize,
) -> BTreeMap<Position, BTreeSet<Position>> {
    board
        .positions_of(player_index)
        .into_iter()
        .filter_map(|position| {
            board
                .piece_at(position)
                .map(|piece| (position, valid_positions(piece, board, players)))
        })
        .collect()
}

/// Squares threatened by `player_index`. Pawns threaten both forward
/// diagonals, occupied or not. Castling never threatens anything.
pub fn attacked_positions(
    board: &ChessBoard,
    players: &[ChessPlayer],
    player_index: usize,
) -> BTreeSet<Position> {
    let mut attacked = BTreeSet::new();
    for position in board.positions_of(player_index) {
        let Some(piece) = board.piece_at(position) else {
            continue;
        };
        match piece.kind {
            ChessPieceKind::Pawn => {
                attacked.extend(pawn_attacks(position, direction_of(players, player_index)))
            }
            ChessPieceKind::King => {
                attacked.extend(slide(board, position, player_index, &ORTHOGONAL, 1));
                attacked.extend(slide(board, position, player_index, &DIAGONAL, 1));
            }
            _ => attacked.extend(valid_positions(piece, board, players)),
        }
    }
    attacked
}

pub fn king_position(board: &ChessBoard, player_index: usize) -> Option<Position> {
    board.positions_of(player_index).into_iter().find(|position| {
        board
            .piece_at(*position)
            .is_some_and(|piece| piece.kind == ChessPieceKind::King)
    })
}

pub fn is_in_check(board: &ChessBoard, players: &[ChessPlayer], player_index: usize) -> bool {
    match king_position(board, player_index) {
        Some(king) => attacked_positions(board, players, opponent_of(player_index)).contains(&king),
        None => false,
    }
}

fn validate_castle(
    board: &ChessBoard,
    players: &[ChessPlayer],
    king: &ChessPiece,
    origin: Position,
    target: Position,
) -> Result<ChessMoveKind, MoveError> {
    let refuse = |reason: &str| MoveError::CastlingNotAllowed(reason.to_string());

    if king.has_moved {
        return Err(refuse("the king has already moved"));
    }

    let (rook_column, step) = if target.column > origin.column {
        (COLUMNS - 1, 1)
    } else {
        (0, -1)
    };
    let rook_origin = Position::new(origin.row, rook_column);
    let rook = board
        .piece_at(rook_origin)
        .filter(|piece| piece.kind == ChessPieceKind::Rook && piece.player_index == king.player_index)
        .ok_or_else(|| refuse("there is no rook on that side"))?;
    if rook.has_moved {
        return Err(refuse("the rook has already moved"));
    }

    let attacked = attacked_positions(board, players, opponent_of(king.player_index));
    if attacked.contains(&origin) {
        return Err(refuse("the king is in check"));
    }

    let (low, high) = if rook_column > origin.column {
        (origin.column + 1, rook_column)
    } else {
        (rook_column + 1, origin.column)
    };
    for column in low..high {
        let between = Position::new(origin.row, column);
        if !board.is_empty(between) {
            return Err(refuse("the path between king and rook is blocked"));
        }
        if attacked.contains(&between) {
            return Err(refuse("the path between king and rook is attacked"));
        }
    }
    if attacked.contains(&target) {
        return Err(refuse("the destination is attacked"));
    }

    let rook_target = origin
        .offset(0, step)
        .ok_or_else(|| refuse("there is no room to castle"))?;

    Ok(ChessMoveKind::Castle {
        rook_origin,
        rook_target,
    })
}

/// Checks a move for `mover` against the current board without changing it.
pub fn validate_move(
    board: &ChessBoard,
    players: &[ChessPlayer],
    mover: usize,
    origin: Position,
    target: Position,
) -> Result<ChessMove, MoveError> {
    let piece = board
        .piece_at(origin)
        .ok_or(MoveError::NoPieceAtOrigin(origin))?;
    if piece.player_index != mover {
        return Err(MoveError::NotYourPiece(origin));
    }
    if origin == target {
        return Err(MoveError::SameCell);
    }
    if board
        .piece_at(target)
        .is_some_and(|other| other.player_index == mover)
    {
        return Err(MoveError::OwnPieceAtTarget(target));
    }

    let reachable = valid_position_map(board, players, mover);
    if !reachable
        .get(&origin)
        .is_some_and(|targets| targets.contains(&target))
    {
        return Err(MoveError::IllegalDestination { origin, target });
    }

    let mut chess_move = ChessMove {
        origin,
        target,
        kind: ChessMoveKind::Regular,
        reaches_end_of_board: false,
    };

    match piece.kind {
        ChessPieceKind::King => {
            if origin.row == target.row && origin.column.abs_diff(target.column) == 2 {
                chess_move.kind = validate_castle(board, players, piece, origin, target)?;
            } else if attacked_positions(board, players, opponent_of(mover)).contains(&target) {
                return Err(MoveError::SelfCheck);
            }
        }
        ChessPieceKind::Rook => {
            if !slide(board, origin, mover, &ORTHOGONAL, COLUMNS).contains(&target) {
                return Err(MoveError::IllegalDestination { origin, target });
            }
        }
        ChessPieceKind::Pawn => {
            chess_move.reaches_end_of_board = target.row == direction_of(players, mover).far_row();
        }
        ChessPieceKind::Queen | ChessPieceKind::Bishop | ChessPieceKind::Knight => {}
    }

    let mut projected = board.clone();
    commit_move(&mut projected, &chess_move);
    if is_in_check(&projected, players, mover) {
        return Err(MoveError::SelfCheck);
    }

    Ok(chess_move)
}

/// Applies a validated move and returns the captured piece, if any.
pub fn commit_move(board: &mut ChessBoard, chess_move: &ChessMove) -> Option<ChessPiece> {
    let captured = board.remove(chess_move.target);
    if let Some(mut piece) = board.remove(chess_move.origin) {
        piece.has_moved = true;
        if chess_move.reaches_end_of_board {
            piece.has_reached_end_of_board = true;
        }
        board.place(piece, chess_move.target);
    }

    if let ChessMoveKind::Castle {
        rook_origin,
        rook_target,
    } = chess_move.kind
    {
        if let Some(mut rook) = board.remove(rook_origin) {
            rook.has_moved = true;
            board.place(rook, rook_target);
        }
    }

    captured
}

/// Turns every pawn flagged on the previous move into a queen.
pub fn promote_pending_pawns(board: &mut ChessBoard) -> Vec<Position> {
    let pending: Vec<Position> = board
        .cells()
        .iter()
        .filter(|cell| {
            cell.piece.as_ref().is_some_and(|piece| {
                piece.kind == ChessPieceKind::Pawn && piece.has_reached_end_of_board
            })
        })
        .map(|cell| cell.position())
        .collect();

    for position in &pending {
        if let Some(mut piece) = board.remove(*position) {
            piece.kind = ChessPieceKind::Queen;
            piece.has_reached_end_of_board = false;
            board.place(piece, *position);
        }
    }
    pending
}

/// The board the next move is validated against: a copy with pending
/// promotions applied.
pub fn board_for_next_move(board: &ChessBoard) -> ChessBoard {
    let mut next = board.clone();
    promote_pending_pawns(&mut next);
    next
}

/// Every (origin, target) pair `player_index` may legally play as their
/// next move, pending promotions included.
pub fn legal_moves(
    board: &ChessBoard,
    players: &[ChessPlayer],
    player_index: usize,
) -> Vec<(Position, Position)> {
    let board = &board_for_next_move(board);
    valid_position_map(board, players, player_index)
        .into_iter()
        .flat_map(|(origin, targets)| targets.into_iter().map(move |target| (origin, target)))
        .filter(|(origin, target)| {
            validate_move(board, players, player_index, *origin, *target).is_ok()
        })
        .collect()
}

pub fn has_legal_move(board: &ChessBoard, players: &[ChessPlayer], player_index: usize) -> bool {
    valid_position_map(board, players, player_index)
        .into_iter()
        .any(|(origin, targets)| {
            targets.into_iter().any(|target| {
                validate_move(board, players, player_index, origin, target).is_ok()
            })
        })
}

pub fn is_checkmate(board: &ChessBoard, players: &[ChessPlayer], player_index: usize) -> bool {
    is_in_check(board, players, player_index) && !has_legal_move(board, players, player_index)
}

pub fn determine_player_state(
    board: &ChessBoard,
    players: &[ChessPlayer],
    player_index: usize,
) -> ChessPlayerStatus {
    if !is_in_check(board, players, player_index) {
        ChessPlayerStatus::Regular
    } else if has_legal_move(board, players, player_index) {
        ChessPlayerStatus::Check
    } else {
        ChessPlayerStatus::CheckMate
    }
}

impl ChessService {
    pub fn new() -> Self {
        ChessService
    }

    /// Passes the turn and evaluates the new current player. Checkmate ends
    /// the game for the previous player, no legal move without check is a
    /// draw.
    fn resolve_turn(game: &mut Game<Self>, previous: usize) -> Option<GameOver> {
        game.players[previous].state.state = ChessPlayerStatus::Regular;
        let next = game.pass_turn();
        // judged on the board `next` will actually move on
        let board = board_for_next_move(&game.board);
        let status = determine_player_state(&board, &game.players, next);
        game.players[next].state.state = status;

        match status {
            ChessPlayerStatus::CheckMate => {
                debug!("Player {} is checkmated in game {}", next, game.id);
                game.finish(Some(previous))
            }
            ChessPlayerStatus::Regular if !has_legal_move(&board, &game.players, next) => {
                debug!("Stalemate in game {}", game.id);
                game.finish(None)
            }
            _ => None,
        }
    }
}

impl GameRules for ChessService {
    type Piece = ChessPiece;
    type PlayerState = ChessPlayerState;

    const GAME_TYPE: GameType = GameType::Chess;

    fn setup(board: &mut ChessBoard, players: &mut [ChessPlayer]) {
        for player_index in 0..players.len() {
            let (back_row, pawn_row) = match direction_of(players, player_index) {
                Direction::Up => (7, 6),
                Direction::Down => (0, 1),
            };
            for (column, kind) in BACK_RANK.iter().enumerate() {
                let position = Position::new(back_row, column);
                board.place(ChessPiece::new(*kind, player_index, position), position);
            }
            for column in 0..COLUMNS {
                let position = Position::new(pawn_row, column);
                board.place(
                    ChessPiece::new(ChessPieceKind::Pawn, player_index, position),
                    position,
                );
            }
        }
    }

    fn apply_move(
        game: &mut Game<Self>,
        origin: Position,
        target: Position,
    ) -> Result<MoveOutcome, MoveError> {
        let mover = game.current_player_index;

        let mut board = game.board.clone();
        let promoted = promote_pending_pawns(&mut board);
        if !promoted.is_empty() {
            debug!("Promoting pawns at {:?} in game {}", promoted, game.id);
        }

        let chess_move = validate_move(&board, &game.players, mover, origin, target)?;
        let captured = commit_move(&mut board, &chess_move);
        game.board = board;
        debug!(
            "Player {} moved {} -> {} in game {}",
            mover, origin, target, game.id
        );

        let game_over = Self::resolve_turn(game, mover);
        Ok(MoveOutcome {
            removed_pieces: captured.map(|_| target).into_iter().collect(),
            turn_passed: true,
            game_over,
        })
    }

    fn validate_game(game: &Game<Self>) -> Result<(), String> {
        if !game.game_started {
            return Ok(());
        }
        for player_index in 0..game.players.len() {
            let kings = game
                .board
                .positions_of(player_index)
                .into_iter()
                .filter(|position| {
                    game.board
                        .piece_at(*position)
                        .is_some_and(|piece| piece.kind == ChessPieceKind::King)
                })
                .count();
            if kings != 1 {
                return Err(format!(
                    "player {} has {} kings on the board",
                    player_index, kings
                ));
            }
        }
        Ok(())
    }

    fn validate_piece(piece: &ChessPiece, position: Position) -> Result<(), String> {
        if piece.position() != position {
            return Err(format!(
                "piece claims {} but is stored at {}",
                piece.position(),
                position
            ));
        }
        Ok(())
    }
}
