use crate::webserver::state::AppState;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

pub mod status;
pub mod ws;

/// Build the router
///
/// - `GET {ws_path}`: WebSocket upgrade, one hub subscriber per connection
/// - `GET /`: the index document
/// - `/api/*`: JSON status
/// - anything else: files under `static_root`
pub fn create_router(state: Arc<AppState>) -> Router {
    let root = Path::new(&state.config.static_root).to_path_buf();
    let index = root.join(&state.config.index_file);

    Router::new()
        .route_service("/", ServeFile::new(index))
        .merge(ws::routes(&state.config.ws_path))
        .nest("/api", status::routes())
        .fallback_service(ServeDir::new(root))
        .with_state(state)
}
