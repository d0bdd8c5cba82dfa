use std::env;

use async_trait::async_trait;
use aws_sdk_apigatewaymanagement::{primitives::Blob, Client as ApiGatewayClient};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_dynamo::{from_item, to_attribute_value, to_item};
use tracing::info;

#[cfg(test)]
use mockall::automock;

pub type RepositoryResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConnection {
    pub player_id: String,
    pub connection_id: String,
    pub connected_at: DateTime<Utc>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebSocketRepository: Send + Sync {
    async fn store_connection(&self, player_id: &str, connection_id: &str) -> RepositoryResult<()>;

    /// Removes the connection and returns the player it belonged to.
    async fn remove_connection_by_id(&self, connection_id: &str)
        -> RepositoryResult<Option<String>>;

    async fn get_connection_id(&self, player_id: &str) -> RepositoryResult<Option<String>>;

    async fn get_player_id(&self, connection_id: &str) -> RepositoryResult<Option<String>>;

    async fn send_message(&self, connection_id: &str, message: &str) -> RepositoryResult<()>;
}

pub struct DynamoDbWebSocketRepository {
    dynamodb_client: DynamoDbClient,
    api_gateway_client: ApiGatewayClient,
    table_name: String,
}

impl DynamoDbWebSocketRepository {
    pub fn new(dynamodb_client: DynamoDbClient, api_gateway_client: ApiGatewayClient) -> Self {
        let table_name = env::var("PLAYER_CONNECTIONS_TABLE")
            .expect("PLAYER_CONNECTIONS_TABLE environment variable must be set");

        Self {
            dynamodb_client,
            api_gateway_client,
            table_name,
        }
    }

    async fn find_by_connection_id(
        &self,
        connection_id: &str,
    ) -> RepositoryResult<Option<PlayerConnection>> {
        let scan_result = self
            .dynamodb_client
            .scan()
            .table_name(&self.table_name)
            .filter_expression("connection_id = :connection_id")
            .expression_attribute_values(":connection_id", to_attribute_value(connection_id)?)
            .send()
            .await?;

        match scan_result.items.unwrap_or_default().into_iter().next() {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }
}

/// Endpoint of the API Gateway management API for the deployed stage.
pub fn api_gateway_endpoint() -> String {
    if let Ok(endpoint) = env::var("WEBSOCKET_API_ENDPOINT") {
        return endpoint;
    }
    let region = env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string());
    let api_id = env::var("WEBSOCKET_API_ID").unwrap_or_default();
    let stage = env::var("STAGE").unwrap_or_else(|_| "dev".to_string());

    format!(
        "https://{}.execute-api.{}.amazonaws.com/{}",
        api_id, region, stage
    )
}

#[async_trait]
impl WebSocketRepository for DynamoDbWebSocketRepository {
    async fn store_connection(&self, player_id: &str, connection_id: &str) -> RepositoryResult<()> {
        let connection = PlayerConnection {
            player_id: player_id.to_string(),
            connection_id: connection_id.to_string(),
            connected_at: Utc::now(),
        };

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(connection)?))
            .send()
            .await?;

        info!("Stored WebSocket connection for player: {}", player_id);
        Ok(())
    }

    async fn remove_connection_by_id(
        &self,
        connection_id: &str,
    ) -> RepositoryResult<Option<String>> {
        let Some(connection) = self.find_by_connection_id(connection_id).await? else {
            info!("No player found for connection: {}", connection_id);
            return Ok(None);
        };

        self.dynamodb_client
            .delete_item()
            .table_name(&self.table_name)
            .key("player_id", to_attribute_value(&connection.player_id)?)
            .condition_expression("connection_id = :connection_id")
            .expression_attribute_values(":connection_id", to_attribute_value(connection_id)?)
            .send()
            .await?;

        info!(
            "Removed WebSocket connection {} for player: {}",
            connection_id, connection.player_id
        );
        Ok(Some(connection.player_id))
    }

    async fn get_connection_id(&self, player_id: &str) -> RepositoryResult<Option<String>> {
        let result = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key("player_id", to_attribute_value(player_id)?)
            .send()
            .await?;

        match result.item {
            Some(item) => {
                let connection: PlayerConnection = from_item(item)?;
                Ok(Some(connection.connection_id))
            }
            None => Ok(None),
        }
    }

    async fn get_player_id(&self, connection_id: &str) -> RepositoryResult<Option<String>> {
        Ok(self
            .find_by_connection_id(connection_id)
            .await?
            .map(|connection| connection.player_id))
    }

    async fn send_message(&self, connection_id: &str, message: &str) -> RepositoryResult<()> {
        self.api_gateway_client
            .post_to_connection()
            .connection_id(connection_id)
            .data(Blob::new(message.as_bytes()))
            .send()
            .await?;

        info!("Sent message to connection: {}", connection_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_item_layout() {
        let connection = PlayerConnection {
            player_id: "player1".to_string(),
            connection_id: "abc=".to_string(),
            connected_at: Utc::now(),
        };

        let item: std::collections::HashMap<String, aws_sdk_dynamodb::types::AttributeValue> =
            to_item(connection.clone()).unwrap();
        let parsed: PlayerConnection = from_item(item).unwrap();

        assert_eq!(parsed, connection);
    }
}
