use crate::{
    repositories::errors::lobby_repository_errors::LobbyRepositoryError,
    services::errors::{move_errors::MoveError, snapshot_errors::SnapshotError},
};

#[derive(Debug)]
pub enum GameSessionServiceError {
    GameNotFound,
    GameAlreadyExists,
    PlayerNotFound,
    ValidationError(String),
    Move(MoveError),
    Rebuild(SnapshotError),
    RepositoryError(String),
    DebugCommandsDisabled,
}

impl std::fmt::Display for GameSessionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSessionServiceError::GameNotFound => write!(f, "No game found for this lobby"),
            GameSessionServiceError::GameAlreadyExists => {
                write!(f, "A game already exists for this lobby")
            }
            GameSessionServiceError::PlayerNotFound => {
                write!(f, "You are not a player in this game")
            }
            GameSessionServiceError::ValidationError(msg) => {
                write!(f, "Validation error: {}", msg)
            }
            GameSessionServiceError::Move(err) => write!(f, "{}", err),
            GameSessionServiceError::Rebuild(err) => write!(f, "Could not resume game: {}", err),
            GameSessionServiceError::RepositoryError(msg) => {
                write!(f, "Repository error: {}", msg)
            }
            GameSessionServiceError::DebugCommandsDisabled => {
                write!(f, "Debug commands are disabled")
            }
        }
    }
}

impl std::error::Error for GameSessionServiceError {}

impl From<MoveError> for GameSessionServiceError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::PlayerNotFound => GameSessionServiceError::PlayerNotFound,
            other => GameSessionServiceError::Move(other),
        }
    }
}

impl From<SnapshotError> for GameSessionServiceError {
    fn from(err: SnapshotError) -> Self {
        GameSessionServiceError::Rebuild(err)
    }
}

impl From<LobbyRepositoryError> for GameSessionServiceError {
    fn from(err: LobbyRepositoryError) -> Self {
        match err {
            LobbyRepositoryError::NotFound => GameSessionServiceError::GameNotFound,
            other => GameSessionServiceError::RepositoryError(other.to_string()),
        }
    }
}
