pub mod checkers_service;
pub mod chess_service;
pub mod deletion_scheduler;
pub mod errors;
pub mod game_session_service;
pub mod websocket_service;
