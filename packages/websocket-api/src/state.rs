use std::sync::Arc;

use game_engine::services::game_session_service::GameSessionService;
use game_engine::services::websocket_service::WebSocketService;

#[derive(Clone)]
pub struct AppState {
    pub websocket_service: Arc<WebSocketService>,
    pub game_session_service: Arc<GameSessionService>,
}
