/// One connected peer
///
/// Lifecycle: `Connecting` until the hub registers it, `Active` while it
/// receives broadcasts, `Closed` after the first send failure, receive
/// failure, peer close or deregistration. `Closed` is terminal.
///
/// The outbound path (`send`) is driven by the hub's fan-out loop. The
/// inbound path (`receive_loop`) runs on the connection's own task; it only
/// exists to notice the peer going away and to forward anything the peer
/// sends back into the hub.
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

use crate::{
    errors::TransportError,
    logger::{self, LogTag},
};

use super::hub::{Hub, SubscriberId};
use super::transport::{PayloadSink, PayloadSource};

/// Upper bound on releasing a transport (close frame + flush)
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberState {
    Connecting,
    Active,
    Closed,
}

/// Why a receive loop returned
#[derive(Debug)]
pub enum ReceiveEnd {
    /// Peer sent a close frame or the stream ended
    PeerClosed,
    /// Subscriber was closed from the hub side
    Closed,
    /// Hub no longer accepts payloads
    HubStopped,
    /// Transport fault
    Failed(TransportError),
}

pub struct Subscriber {
    id: SubscriberId,
    /// `None` once the transport has been released
    sink: Mutex<Option<Box<dyn PayloadSink>>>,
    state: watch::Sender<SubscriberState>,
}

impl Subscriber {
    pub fn new(id: SubscriberId, sink: Box<dyn PayloadSink>) -> Self {
        let (state, _) = watch::channel(SubscriberState::Connecting);
        Self {
            id,
            sink: Mutex::new(Some(sink)),
            state,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn state(&self) -> SubscriberState {
        *self.state.borrow()
    }

    /// `Connecting -> Active`; false if the subscriber is not connecting
    pub(crate) fn activate(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SubscriberState::Connecting {
                *state = SubscriberState::Active;
                true
            } else {
                false
            }
        })
    }

    fn mark_closed(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SubscriberState::Closed {
                false
            } else {
                *state = SubscriberState::Closed;
                true
            }
        })
    }

    /// Write one payload to the peer
    ///
    /// A failed write closes the subscriber. The transport itself is
    /// released by `close`.
    pub async fn send(&self, payload: &str) -> Result<(), TransportError> {
        if self.state() == SubscriberState::Closed {
            return Err(TransportError::Closed);
        }

        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::Closed)?;

        match sink.send_payload(payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.mark_closed();
                Err(e)
            }
        }
    }

    /// Write one payload, giving up after `deadline`
    ///
    /// A timed out send closes the subscriber like any other failure.
    pub async fn send_within(
        &self,
        payload: &str,
        deadline: Duration,
    ) -> Result<(), TransportError> {
        match tokio::time::timeout(deadline, self.send(payload)).await {
            Ok(result) => result,
            Err(_) => {
                self.mark_closed();
                Err(TransportError::Timeout(deadline))
            }
        }
    }

    /// Close the subscriber and release its transport
    ///
    /// Idempotent; returns true only for the call that released the transport.
    /// Waiting for the sink and closing it are each bounded by `CLOSE_TIMEOUT`;
    /// a sink still held by an in-flight send is released when the subscriber
    /// is dropped.
    pub async fn close(&self) -> bool {
        self.mark_closed();

        let sink = match tokio::time::timeout(CLOSE_TIMEOUT, self.sink.lock()).await {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                logger::debug(
                    LogTag::Subscriber,
                    &format!("Subscriber {}: transport busy, close skipped", self.id),
                );
                return false;
            }
        };
        let Some(mut sink) = sink else {
            return false;
        };

        if tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await.is_err() {
            logger::debug(
                LogTag::Subscriber,
                &format!("Subscriber {}: transport close timed out", self.id),
            );
        }
        true
    }

    /// Run the inbound side for the subscriber's whole lifetime
    ///
    /// Sends the hub greeting (bounded by the hub's send timeout), then forwards every peer payload into the
    /// hub's inbound queue. Returns on peer close, receive error, hub stop or
    /// when the subscriber is closed from the hub side. The transport is
    /// closed before returning; deregistration is left to the caller.
    pub async fn receive_loop<S: PayloadSource>(&self, mut source: S, hub: &Hub) -> ReceiveEnd {
        if let Err(e) = self.send_within(hub.greeting(), hub.send_timeout()).await {
            self.close().await;
            return ReceiveEnd::Failed(e);
        }

        let mut state_rx = self.state.subscribe();

        let end = loop {
            tokio::select! {
                _ = wait_closed(&mut state_rx) => break ReceiveEnd::Closed,

                received = source.recv_payload() => match received {
                    Ok(Some(payload)) => {
                        logger::verbose(
                            LogTag::Subscriber,
                            &format!("Subscriber {}: received {} bytes from peer", self.id, payload.len()),
                        );
                        if hub.publish(payload).await.is_err() {
                            break ReceiveEnd::HubStopped;
                        }
                    }
                    Ok(None) => break ReceiveEnd::PeerClosed,
                    Err(e) => break ReceiveEnd::Failed(e),
                },
            }
        };

        self.close().await;
        end
    }
}

async fn wait_closed(state_rx: &mut watch::Receiver<SubscriberState>) {
    let _ = state_rx
        .wait_for(|state| *state == SubscriberState::Closed)
        .await;
}
