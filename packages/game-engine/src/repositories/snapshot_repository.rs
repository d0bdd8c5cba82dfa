use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_dynamo::{from_item, to_attribute_value, to_item};
use tokio::sync::RwLock;

use crate::repositories::errors::snapshot_repository_errors::GameSnapshotRepositoryError;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub lobby_id: String,
    pub snapshot: String,
    pub updated_at: DateTime<Utc>,
}

/// Durable storage for game snapshots, keyed by lobby id.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameSnapshotRepository: Send + Sync {
    async fn get(&self, lobby_id: &str) -> Result<Option<Vec<u8>>, GameSnapshotRepositoryError>;
    async fn put(&self, lobby_id: &str, bytes: &[u8]) -> Result<(), GameSnapshotRepositoryError>;
}

pub struct DynamoDbGameSnapshotRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbGameSnapshotRepository {
    pub fn new(client: Client) -> Self {
        let table_name = std::env::var("GAME_SNAPSHOTS_TABLE")
            .expect("GAME_SNAPSHOTS_TABLE environment variable must be set");
        Self { client, table_name }
    }
}

#[async_trait]
impl GameSnapshotRepository for DynamoDbGameSnapshotRepository {
    async fn get(&self, lobby_id: &str) -> Result<Option<Vec<u8>>, GameSnapshotRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "lobby_id",
                to_attribute_value(lobby_id)
                    .map_err(|e| GameSnapshotRepositoryError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| GameSnapshotRepositoryError::DynamoDb(e.to_string()))?;

        match result.item {
            Some(item) => {
                let record: SnapshotRecord = from_item(item)
                    .map_err(|e| GameSnapshotRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(record.snapshot.into_bytes()))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, lobby_id: &str, bytes: &[u8]) -> Result<(), GameSnapshotRepositoryError> {
        let snapshot = String::from_utf8(bytes.to_vec())
            .map_err(|e| GameSnapshotRepositoryError::Serialization(e.to_string()))?;
        let record = SnapshotRecord {
            lobby_id: lobby_id.to_string(),
            snapshot,
            updated_at: Utc::now(),
        };
        let item = to_item(record)
            .map_err(|e| GameSnapshotRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| GameSnapshotRepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryGameSnapshotRepository {
    snapshots: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryGameSnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameSnapshotRepository for InMemoryGameSnapshotRepository {
    async fn get(&self, lobby_id: &str) -> Result<Option<Vec<u8>>, GameSnapshotRepositoryError> {
        Ok(self.snapshots.read().await.get(lobby_id).cloned())
    }

    async fn put(&self, lobby_id: &str, bytes: &[u8]) -> Result<(), GameSnapshotRepositoryError> {
        self.snapshots
            .write()
            .await
            .insert(lobby_id.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_put_and_get() {
        let repository = InMemoryGameSnapshotRepository::new();

        assert!(repository.get("lobby-1").await.unwrap().is_none());

        repository.put("lobby-1", b"{\"id\":\"lobby-1\"}").await.unwrap();
        repository.put("lobby-1", b"{\"id\":\"lobby-1\",\"v\":2}").await.unwrap();

        assert_eq!(
            repository.get("lobby-1").await.unwrap().unwrap(),
            b"{\"id\":\"lobby-1\",\"v\":2}".to_vec()
        );
    }

    #[test]
    fn test_snapshot_record_item_layout() {
        let record = SnapshotRecord {
            lobby_id: "lobby-1".to_string(),
            snapshot: "{}".to_string(),
            updated_at: Utc::now(),
        };

        let item: HashMap<String, aws_sdk_dynamodb::types::AttributeValue> =
            to_item(record).unwrap();

        assert!(item.contains_key("lobby_id"));
        assert!(item.contains_key("snapshot"));
        assert!(item.contains_key("updated_at"));
    }
}
