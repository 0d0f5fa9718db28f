/// WebSocket connection handler
///
/// Turns one upgraded socket into one hub subscriber:
/// - Split the socket into sink and source halves
/// - Register the subscriber with the hub
/// - Run the receive loop until the peer goes away
/// - Deregister
use axum::extract::ws::WebSocket;
use std::sync::Arc;

use crate::logger::{self, LogTag};

use super::{
    hub::Hub,
    subscriber::{ReceiveEnd, Subscriber},
    transport::split_socket,
};

/// Handle a WebSocket connection for its whole lifetime
pub async fn handle_connection(socket: WebSocket, hub: Arc<Hub>) {
    let (sink, source) = split_socket(socket);
    let subscriber = Arc::new(Subscriber::new(hub.next_subscriber_id(), Box::new(sink)));
    let id = subscriber.id();

    if !hub.register(subscriber.clone()) {
        logger::debug(
            LogTag::Webserver,
            &format!("Connection {}: hub refused registration", id),
        );
        subscriber.close().await;
        return;
    }

    logger::debug(LogTag::Webserver, &format!("Connection {} started", id));

    let end = subscriber.receive_loop(source, &hub).await;

    match &end {
        ReceiveEnd::Failed(e) => logger::warning(
            LogTag::Webserver,
            &format!("Connection {}: websocket error: {}", id, e),
        ),
        other => logger::debug(
            LogTag::Webserver,
            &format!("Connection {}: receive loop ended ({:?})", id, other),
        ),
    }

    // Cleanup
    hub.deregister(id).await;

    let snapshot = hub.metrics().snapshot();
    logger::debug(
        LogTag::Webserver,
        &format!(
            "Connection {} closed (active={}, deliveries={}, failures={})",
            id, snapshot.active_subscribers, snapshot.deliveries, snapshot.delivery_failures
        ),
    );
}
