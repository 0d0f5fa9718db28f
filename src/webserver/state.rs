/// Shared application state for the webserver
use std::sync::Arc;

use crate::{config::ServerConfig, webserver::ws::Hub};

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// Broadcast hub every upgraded socket subscribes to
    pub hub: Arc<Hub>,

    pub config: Arc<ServerConfig>,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, config: ServerConfig) -> Self {
        Self {
            hub,
            config: Arc::new(config),
            startup_time: chrono::Utc::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
