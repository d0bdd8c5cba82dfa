pub mod game_session_service_errors;
pub mod move_errors;
pub mod snapshot_errors;
