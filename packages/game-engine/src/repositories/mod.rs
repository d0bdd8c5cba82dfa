pub mod errors;
pub mod game_repository;
pub mod lobby_repository;
pub mod snapshot_repository;
pub mod websocket_repository;
