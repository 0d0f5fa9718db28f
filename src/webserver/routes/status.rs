use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{state::AppState, ws::HubMetricsSnapshot},
};

#[derive(Debug, Clone, Serialize)]
pub struct HubStatusResponse {
    pub active_subscribers: usize,
    pub uptime_seconds: u64,
    pub metrics: HubMetricsSnapshot,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/hub", get(hub_status))
}

/// GET /api/hub
async fn hub_status(State(state): State<Arc<AppState>>) -> Json<HubStatusResponse> {
    logger::debug(LogTag::Webserver, "Hub status endpoint called");

    Json(HubStatusResponse {
        active_subscribers: state.hub.active_subscribers(),
        uptime_seconds: state.uptime_seconds(),
        metrics: state.hub.metrics().snapshot(),
    })
}
