/// Subscriber transport seams
///
/// The hub never touches sockets directly. A subscriber owns one
/// `PayloadSink` (outbound, driven by the fan-out loop) and its receive loop
/// drives one `PayloadSource` (inbound, driven by the peer). The WebSocket
/// implementations split an upgraded axum socket into the two halves.
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use crate::errors::TransportError;

// ============================================================================
// TRAITS
// ============================================================================

/// Outbound half of a subscriber transport
#[async_trait]
pub trait PayloadSink: Send {
    /// Write one payload as one message
    async fn send_payload(&mut self, payload: &str) -> Result<(), TransportError>;

    /// Release the transport. Called at most once per subscriber.
    async fn close(&mut self);
}

/// Inbound half of a subscriber transport
#[async_trait]
pub trait PayloadSource: Send {
    /// Wait for the next peer payload
    ///
    /// `Ok(None)` means the peer closed the connection.
    async fn recv_payload(&mut self) -> Result<Option<String>, TransportError>;
}

// ============================================================================
// WEBSOCKET TRANSPORT
// ============================================================================

/// Outbound half of an upgraded WebSocket
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

/// Inbound half of an upgraded WebSocket
pub struct WsSource {
    inner: SplitStream<WebSocket>,
}

/// Split an upgraded socket into subscriber transport halves
pub fn split_socket(socket: WebSocket) -> (WsSink, WsSource) {
    let (inner_tx, inner_rx) = socket.split();
    (WsSink { inner: inner_tx }, WsSource { inner: inner_rx })
}

#[async_trait]
impl PayloadSink for WsSink {
    async fn send_payload(&mut self, payload: &str) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(payload.to_string()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        // Peer may already be gone
        let _ = self.inner.close().await;
    }
}

#[async_trait]
impl PayloadSource for WsSource {
    async fn recv_payload(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(msg) = self.inner.next().await {
            match msg.map_err(|e| TransportError::Receive(e.to_string()))? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Message::Close(_) => return Ok(None),
                // Pongs are answered by axum
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
        Ok(None)
    }
}

// ============================================================================
// IN-MEMORY TRANSPORT (tests)
// ============================================================================
