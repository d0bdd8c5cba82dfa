use aws_lambda_events::apigw::ApiGatewayWebsocketProxyRequest;
use lambda_runtime::Error;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::state::AppState;

pub mod connection;
pub mod default;

pub async fn dispatch(
    event: &ApiGatewayWebsocketProxyRequest,
    state: AppState,
) -> Result<Value, Error> {
    let route_key = event.request_context.route_key.as_deref().unwrap_or("");
    let connection_id = event.request_context.connection_id.as_deref().unwrap_or("");
    debug!(
        "Processing route_key: {}, connection_id: {}",
        route_key, connection_id
    );

    match route_key {
        "$connect" => connection::handle_connect(event, state).await,
        "$disconnect" => connection::handle_disconnect(connection_id, state).await,
        "$default" => default::handle_default_message(event, state).await,
        _ => {
            error!("Unknown route key: {}", route_key);
            Ok(status(400, Some("Unknown route")))
        }
    }
}

pub fn status(code: u16, error: Option<&str>) -> Value {
    match error {
        Some(error) => json!({
            "statusCode": code,
            "body": json!({
                "error": error,
                "timestamp": chrono::Utc::now().to_rfc3339()
            })
            .to_string()
        }),
        None => json!({ "statusCode": code }),
    }
}
