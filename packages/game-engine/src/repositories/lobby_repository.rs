use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, from_items, to_attribute_value};
use tokio::sync::RwLock;
use tracing::info;

use crate::{
    models::lobby::Lobby, repositories::errors::lobby_repository_errors::LobbyRepositoryError,
};

#[cfg(test)]
use mockall::automock;

/// Read access to lobby records plus the `game_started` flag used to decide
/// whether a game can be resumed from its snapshot.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LobbyRepository: Send + Sync {
    async fn get_lobby(&self, lobby_id: &str) -> Result<Option<Lobby>, LobbyRepositoryError>;
    async fn set_game_started(
        &self,
        lobby_id: &str,
        game_started: bool,
    ) -> Result<(), LobbyRepositoryError>;
    /// Ids of lobbies with a running game that `player_id` is a member of.
    async fn find_started_lobby_ids(
        &self,
        player_id: &str,
    ) -> Result<Vec<String>, LobbyRepositoryError>;
}

pub struct DynamoDbLobbyRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbLobbyRepository {
    pub fn new(client: Client) -> Self {
        let table_name =
            std::env::var("LOBBIES_TABLE").expect("LOBBIES_TABLE environment variable must be set");
        Self { client, table_name }
    }
}

#[async_trait]
impl LobbyRepository for DynamoDbLobbyRepository {
    async fn get_lobby(&self, lobby_id: &str) -> Result<Option<Lobby>, LobbyRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "lobby_id",
                to_attribute_value(lobby_id)
                    .map_err(|e| LobbyRepositoryError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| LobbyRepositoryError::DynamoDb(e.to_string()))?;

        match result.item {
            Some(item) => {
                let lobby: Lobby = from_item(item)
                    .map_err(|e| LobbyRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(lobby))
            }
            None => Ok(None),
        }
    }

    async fn set_game_started(
        &self,
        lobby_id: &str,
        game_started: bool,
    ) -> Result<(), LobbyRepositoryError> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key(
                "lobby_id",
                to_attribute_value(lobby_id)
                    .map_err(|e| LobbyRepositoryError::Serialization(e.to_string()))?,
            )
            .update_expression("SET game_started = :game_started")
            .expression_attribute_values(
                ":game_started",
                to_attribute_value(game_started)
                    .map_err(|e| LobbyRepositoryError::Serialization(e.to_string()))?,
            )
            .condition_expression("attribute_exists(lobby_id)")
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    LobbyRepositoryError::NotFound
                } else {
                    LobbyRepositoryError::DynamoDb(service_error.to_string())
                }
            })?;

        info!("Lobby {} game_started set to {}", lobby_id, game_started);
        Ok(())
    }

    async fn find_started_lobby_ids(
        &self,
        player_id: &str,
    ) -> Result<Vec<String>, LobbyRepositoryError> {
        let mut lobby_ids = Vec::new();
        let mut start_key = None;
        loop {
            let page = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("game_started = :game_started")
                .expression_attribute_values(
                    ":game_started",
                    to_attribute_value(true)
                        .map_err(|e| LobbyRepositoryError::Serialization(e.to_string()))?,
                )
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| LobbyRepositoryError::DynamoDb(e.to_string()))?;

            let lobbies: Vec<Lobby> = from_items(page.items.unwrap_or_default())
                .map_err(|e| LobbyRepositoryError::Serialization(e.to_string()))?;
            lobby_ids.extend(
                lobbies
                    .into_iter()
                    .filter(|lobby| lobby.is_member(player_id))
                    .map(|lobby| lobby.lobby_id),
            );

            start_key = page.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }
        Ok(lobby_ids)
    }
}

/// Lobby directory kept in process memory.
#[derive(Default)]
pub struct InMemoryLobbyRepository {
    lobbies: RwLock<HashMap<String, Lobby>>,
}

impl InMemoryLobbyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, lobby: Lobby) {
        self.lobbies
            .write()
            .await
            .insert(lobby.lobby_id.clone(), lobby);
    }
}

#[async_trait]
impl LobbyRepository for InMemoryLobbyRepository {
    async fn get_lobby(&self, lobby_id: &str) -> Result<Option<Lobby>, LobbyRepositoryError> {
        Ok(self.lobbies.read().await.get(lobby_id).cloned())
    }

    async fn set_game_started(
        &self,
        lobby_id: &str,
        game_started: bool,
    ) -> Result<(), LobbyRepositoryError> {
        let mut lobbies = self.lobbies.write().await;
        let lobby = lobbies
            .get_mut(lobby_id)
            .ok_or(LobbyRepositoryError::NotFound)?;
        lobby.game_started = game_started;
        Ok(())
    }

    async fn find_started_lobby_ids(
        &self,
        player_id: &str,
    ) -> Result<Vec<String>, LobbyRepositoryError> {
        Ok(self
            .lobbies
            .read()
            .await
            .values()
            .filter(|lobby| lobby.game_started && lobby.is_member(player_id))
            .map(|lobby| lobby.lobby_id.clone())
            .collect())
    }
}
