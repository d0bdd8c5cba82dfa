#[derive(Debug)]
pub enum LobbyRepositoryError {
    NotFound,
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for LobbyRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LobbyRepositoryError::NotFound => write!(f, "Lobby not found"),
            LobbyRepositoryError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            LobbyRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for LobbyRepositoryError {}
