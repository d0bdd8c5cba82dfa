pub mod lobby_repository_errors;
pub mod snapshot_repository_errors;
