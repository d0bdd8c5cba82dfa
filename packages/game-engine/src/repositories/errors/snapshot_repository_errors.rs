#[derive(Debug)]
pub enum GameSnapshotRepositoryError {
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for GameSnapshotRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSnapshotRepositoryError::Serialization(msg) => {
                write!(f, "Snapshot serialization error: {}", msg)
            }
            GameSnapshotRepositoryError::DynamoDb(msg) => {
                write!(f, "Snapshot store DynamoDB error: {}", msg)
            }
        }
    }
}

impl std::error::Error for GameSnapshotRepositoryError {}
