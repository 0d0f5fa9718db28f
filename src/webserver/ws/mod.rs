/// Broadcast Hub Module
///
/// Fans every log record out to all connected WebSocket subscribers.
///
/// ## Architecture
/// - Single /ws endpoint, one subscriber per connection
/// - One bounded inbound queue, one fan-out loop
/// - Mutex-guarded registry with self-healing membership
/// - Per-send deadline so a stalled peer cannot hold up the rest
///
/// ## Key Components
/// - `hub`: Registry, inbound queue and fan-out loop
/// - `subscriber`: Per-peer send path, receive loop and lifecycle state
/// - `transport`: Sink/source seams and their WebSocket implementation
/// - `connection`: WebSocket upgrade → subscriber lifecycle
/// - `metrics`: Hub counters for monitoring
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::{config::HubConfig, errors::HubError};

pub mod connection;
pub mod hub;
pub mod metrics;
pub mod subscriber;
pub mod transport;

pub use hub::{Hub, SubscriberId};
pub use metrics::HubMetricsSnapshot;
pub use subscriber::{ReceiveEnd, Subscriber, SubscriberState};

/// Process-wide hub, created once at startup
static HUB: OnceCell<Arc<Hub>> = OnceCell::new();

/// Create the process-wide hub
pub fn init_hub(config: &HubConfig) -> Result<Arc<Hub>, HubError> {
    let hub = Hub::new(config);
    HUB.set(hub.clone())
        .map_err(|_| HubError::AlreadyInitialized)?;
    Ok(hub)
}

/// Get the process-wide hub (if initialized)
pub fn get_hub() -> Option<Arc<Hub>> {
    HUB.get().cloned()
}
