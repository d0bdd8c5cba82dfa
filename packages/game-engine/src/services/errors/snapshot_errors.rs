use std::fmt;

/// Why a stored snapshot could not be turned back into a live game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    Missing,
    MalformedJson(String),
    SchemaMismatch(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SnapshotError::Missing => write!(f, "No snapshot stored for this game"),
            SnapshotError::MalformedJson(msg) => write!(f, "Malformed snapshot JSON: {}", msg),
            SnapshotError::SchemaMismatch(msg) => write!(f, "Snapshot schema mismatch: {}", msg),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Data => SnapshotError::SchemaMismatch(err.to_string()),
            _ => SnapshotError::MalformedJson(err.to_string()),
        }
    }
}
