/// WebSocket endpoint
///
/// Every upgraded connection becomes one hub subscriber; see
/// `webserver::ws::connection` for the lifecycle.
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};

use crate::{
    logger::{self, LogTag},
    webserver::{state::AppState, ws::connection::handle_connection},
};

pub fn routes(ws_path: &str) -> Router<Arc<AppState>> {
    Router::new().route(ws_path, get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    logger::debug(
        LogTag::Webserver,
        &format!(
            "WebSocket upgrade requested (active={})",
            state.hub.active_subscribers()
        ),
    );

    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_connection(socket, hub))
}
