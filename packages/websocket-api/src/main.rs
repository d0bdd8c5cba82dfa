use std::sync::Arc;

use aws_lambda_events::apigw::ApiGatewayWebsocketProxyRequest;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;

use game_engine::config::GameConfig;
use game_engine::repositories::game_repository::InMemoryGameRepository;
use game_engine::repositories::lobby_repository::DynamoDbLobbyRepository;
use game_engine::repositories::snapshot_repository::DynamoDbGameSnapshotRepository;
use game_engine::repositories::websocket_repository::{
    api_gateway_endpoint, DynamoDbWebSocketRepository,
};
use game_engine::services::game_session_service::GameSessionService;
use game_engine::services::websocket_service::WebSocketService;

mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // required to enable CloudWatch error logging by the runtime
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = aws_config::load_from_env().await;
    let dynamodb_client = aws_sdk_dynamodb::Client::new(&config);
    let api_gateway_config = aws_sdk_apigatewaymanagement::config::Builder::from(&config)
        .endpoint_url(api_gateway_endpoint())
        .build();
    let api_gateway_client = aws_sdk_apigatewaymanagement::Client::from_conf(api_gateway_config);

    let websocket_service = Arc::new(WebSocketService::new(Arc::new(
        DynamoDbWebSocketRepository::new(dynamodb_client.clone(), api_gateway_client),
    )));
    // invocations may hit any warm instance, so games live in DynamoDB only
    let game_config = GameConfig::from_env().stateless();
    info!("Starting websocket handler with {:?}", game_config);

    let game_session_service = Arc::new(GameSessionService::new(
        Arc::new(InMemoryGameRepository::new()),
        Arc::new(DynamoDbGameSnapshotRepository::new(dynamodb_client.clone())),
        Arc::new(DynamoDbLobbyRepository::new(dynamodb_client)),
        websocket_service.clone(),
        game_config,
    ));

    let app_state = AppState {
        websocket_service,
        game_session_service,
    };

    run(service_fn(
        |event: LambdaEvent<ApiGatewayWebsocketProxyRequest>| {
            websocket_handler(event, app_state.clone())
        },
    ))
    .await
}

async fn websocket_handler(
    event: LambdaEvent<ApiGatewayWebsocketProxyRequest>,
    state: AppState,
) -> Result<Value, Error> {
    routes::dispatch(&event.payload, state).await
}
