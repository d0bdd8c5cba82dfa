pub mod board;
pub mod checkers;
pub mod chess;
pub mod commands;
pub mod game_session;
pub mod live_game;
pub mod lobby;
pub mod player;
pub mod responses;
pub mod snapshot;
