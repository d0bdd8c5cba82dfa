use aws_lambda_events::apigw::ApiGatewayWebsocketProxyRequest;
use lambda_runtime::Error;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::status;
use crate::state::AppState;

pub async fn handle_connect(
    event: &ApiGatewayWebsocketProxyRequest,
    state: AppState,
) -> Result<Value, Error> {
    let connection_id = event.request_context.connection_id.as_deref().unwrap_or("");
    info!("WebSocket connection established: {}", connection_id);

    let Some(player_id) = event.query_string_parameters.first("player_id") else {
        warn!("Rejecting connection {} without player_id", connection_id);
        return Ok(status(400, Some("player_id is required")));
    };

    if let Err(e) = state
        .websocket_service
        .store_connection(player_id, connection_id)
        .await
    {
        error!("Failed to store connection {}: {}", connection_id, e);
        debug!("Error details: {:?}", e);
        return Ok(status(500, Some("Failed to store connection")));
    }

    state
        .game_session_service
        .handle_player_connected(player_id)
        .await;

    Ok(status(200, None))
}

pub async fn handle_disconnect(connection_id: &str, state: AppState) -> Result<Value, Error> {
    info!("WebSocket connection disconnected: {}", connection_id);

    match state
        .websocket_service
        .remove_connection_by_id(connection_id)
        .await
    {
        Ok(Some(player_id)) => {
            state
                .game_session_service
                .handle_player_disconnected(&player_id)
                .await
        }
        Ok(None) => debug!("No player stored for connection {}", connection_id),
        Err(e) => {
            error!("Failed to remove connection {}: {}", connection_id, e);
            debug!("Error details: {:?}", e);
        }
    }

    Ok(status(200, None))
}
