use aws_lambda_events::apigw::ApiGatewayWebsocketProxyRequest;
use lambda_runtime::Error;
use serde_json::Value;
use tracing::{debug, error, warn};

use game_engine::models::commands::InboundCommand;

use super::status;
use crate::state::AppState;

pub fn parse_command(body: &str) -> Result<InboundCommand, serde_json::Error> {
    serde_json::from_str(body)
}

pub async fn handle_default_message(
    event: &ApiGatewayWebsocketProxyRequest,
    state: AppState,
) -> Result<Value, Error> {
    let connection_id = event.request_context.connection_id.as_deref().unwrap_or("");
    let Some(body) = &event.body else {
        debug!("No body found for connection {}", connection_id);
        return Ok(status(400, Some("No message body")));
    };

    let inbound = match parse_command(body) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!("Invalid command from connection {}: {}", connection_id, e);
            return Ok(status(400, Some("Invalid command")));
        }
    };

    let player_id = match state.websocket_service.get_player_id(connection_id).await {
        Ok(Some(player_id)) => player_id,
        Ok(None) => {
            warn!("Connection {} is not bound to a player", connection_id);
            return Ok(status(403, Some("Unknown connection")));
        }
        Err(e) => {
            error!("Failed to look up connection {}: {}", connection_id, e);
            return Ok(status(500, Some("Failed to look up connection")));
        }
    };

    state
        .game_session_service
        .handle_command(&player_id, &inbound.lobby_id, inbound.command)
        .await;

    Ok(status(200, None))
}
