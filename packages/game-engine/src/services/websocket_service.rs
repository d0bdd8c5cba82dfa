use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::repositories::websocket_repository::WebSocketRepository;

/// Outbound push channel to players. Delivery is best effort.
#[async_trait]
pub trait PlayerNotifier: Send + Sync {
    async fn emit_to_player(&self, player_id: &str, event: &str, payload: Value);

    async fn emit_to_players(&self, player_ids: &[String], event: &str, payload: Value) {
        for player_id in player_ids {
            self.emit_to_player(player_id, event, payload.clone()).await;
        }
    }
}

pub fn envelope(event: &str, payload: Value) -> Value {
    json!({ "event": event, "payload": payload })
}

#[derive(Clone)]
pub struct WebSocketService {
    repository: Arc<dyn WebSocketRepository>,
}

impl WebSocketService {
    pub fn new(repository: Arc<dyn WebSocketRepository>) -> Self {
        Self { repository }
    }

    pub async fn store_connection(
        &self,
        player_id: &str,
        connection_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Storing WebSocket connection for player: {}", player_id);
        self.repository
            .store_connection(player_id, connection_id)
            .await
    }

    /// Returns the player the connection belonged to, if any.
    pub async fn remove_connection_by_id(
        &self,
        connection_id: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        info!("Removing WebSocket connection by ID: {}", connection_id);
        self.repository.remove_connection_by_id(connection_id).await
    }

    pub async fn get_connection_id(
        &self,
        player_id: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        self.repository.get_connection_id(player_id).await
    }

    pub async fn get_player_id(
        &self,
        connection_id: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        self.repository.get_player_id(connection_id).await
    }

    pub async fn send_notification(
        &self,
        player_id: &str,
        message: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(connection_id) = self.get_connection_id(player_id).await? {
            self.repository
                .send_message(&connection_id, message)
                .await?;
        } else {
            info!(
                "Player {} is not connected, skipping notification",
                player_id
            );
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerNotifier for WebSocketService {
    async fn emit_to_player(&self, player_id: &str, event: &str, payload: Value) {
        let message = envelope(event, payload).to_string();
        if let Err(e) = self.send_notification(player_id, &message).await {
            error!("Failed to send {} to player {}: {}", event, player_id, e);
        }
    }
}
