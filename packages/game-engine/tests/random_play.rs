use proptest::prelude::*;

use game_engine::models::board::BoardPiece;
use game_engine::models::checkers::is_playable;
use game_engine::models::commands::MovePieceRequest;
use game_engine::models::game_session::{Game, GameRules, Ready, Snapshotable};
use game_engine::services::checkers_service::{self, CheckersService};
use game_engine::services::chess_service::{self, ChessService};

const PLAYERS: [(&str, &str); 2] = [("alice", "Alice"), ("bob", "Bob")];

fn started<R: GameRules>() -> Game<R> {
    let mut game = Game::new("lobby-1", PLAYERS);
    game.mark_ready("alice").unwrap();
    game.mark_ready("bob").unwrap();
    game
}

fn assert_board_consistent<R: GameRules>(game: &Game<R>) {
    for cell in game.board.cells() {
        if let Some(piece) = &cell.piece {
            assert!(piece.player_index() < PLAYERS.len());
            assert!(R::validate_piece(piece, cell.position()).is_ok());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_chess_games_stay_legal(choices in prop::collection::vec(any::<usize>(), 1..60)) {
        let mut game = started::<ChessService>();

        for choice in choices {
            if game.game_over.is_some() {
                break;
            }
            let mover = game.current_player_index;
            let moves = chess_service::legal_moves(&game.board, &game.players, mover);
            prop_assert!(!moves.is_empty());
            let (origin, target) = moves[choice % moves.len()];
            let pieces_before = game.board.piece_count();

            let outcome = game
                .move_piece(PLAYERS[mover].0, &MovePieceRequest::new(origin, target))
                .unwrap();

            prop_assert!(outcome.turn_passed);
            prop_assert!(game.board.piece_count() <= pieces_before);
            prop_assert!(!chess_service::is_in_check(&game.board, &game.players, mover));
            prop_assert!(chess_service::king_position(&game.board, 0).is_some());
            prop_assert!(chess_service::king_position(&game.board, 1).is_some());
            assert_board_consistent(&game);
        }

        let rebuilt = Game::<ChessService>::rebuild(game.snapshot()).unwrap();
        prop_assert_eq!(rebuilt, game);
    }

    #[test]
    fn random_checkers_games_stay_legal(choices in prop::collection::vec(any::<usize>(), 1..80)) {
        let mut game = started::<CheckersService>();

        for choice in choices {
            if game.game_over.is_some() {
                break;
            }
            let mover = game.current_player_index;
            let moves = checkers_service::legal_moves(&game.board, &game.players, mover);
            prop_assert!(!moves.is_empty());
            let (origin, target) = moves[choice % moves.len()];
            let pieces_before = game.board.piece_count();

            let outcome = game
                .move_piece(PLAYERS[mover].0, &MovePieceRequest::new(origin, target))
                .unwrap();

            prop_assert_eq!(
                game.board.piece_count(),
                pieces_before - outcome.removed_pieces.len()
            );
            if !outcome.turn_passed {
                prop_assert_eq!(game.current_player_index, mover);
                prop_assert_eq!(
                    game.players[mover].state.piece_that_has_striked_position,
                    Some(target)
                );
            }
            for cell in game.board.cells() {
                if cell.piece.is_some() {
                    prop_assert!(is_playable(cell.position()));
                }
            }
            assert_board_consistent(&game);
        }

        let rebuilt = Game::<CheckersService>::rebuild(game.snapshot()).unwrap();
        prop_assert_eq!(rebuilt, game);
    }
}
