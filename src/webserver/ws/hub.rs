/// Broadcast Hub - subscriber registry and fan-out loop
///
/// The Hub owns:
/// - The subscriber registry (subscriber_id → subscriber)
/// - The single bounded inbound queue of serialized payloads
/// - The fan-out loop that delivers each payload to every subscriber
///
/// The registry sits behind one mutex that is never held across an await:
/// the fan-out loop copies a snapshot, sends without the lock, then removes
/// failed subscribers in one batch and releases their transports on a
/// separate task. A full inbound queue blocks the
/// publisher; nothing is dropped. Every send has its own deadline and the
/// sends for one payload run concurrently, so one stalled peer costs at most
/// one deadline per payload and never blocks the others.
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::{
    config::HubConfig,
    errors::{HubError, TransportError},
    logger::{self, LogTag},
    record::LogRecord,
};

use super::metrics::HubMetrics;
use super::subscriber::Subscriber;

// ============================================================================
// HUB TYPES
// ============================================================================

/// Subscriber ID (unique per connection, never reused)
pub type SubscriberId = u64;

// ============================================================================
// HUB
// ============================================================================

pub struct Hub {
    /// Registered subscribers
    subscribers: Mutex<HashMap<SubscriberId, Arc<Subscriber>>>,

    /// Publishing side of the inbound queue
    inbound_tx: mpsc::Sender<String>,

    /// Consuming side, taken by `run`
    inbound_rx: Mutex<Option<mpsc::Receiver<String>>>,

    /// Set once on shutdown
    stopped: watch::Sender<bool>,

    next_subscriber_id: AtomicU64,

    send_timeout: Duration,

    greeting: String,

    metrics: Arc<HubMetrics>,
}

impl Hub {
    /// Create new hub
    pub fn new(config: &HubConfig) -> Arc<Self> {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (stopped, _) = watch::channel(false);

        Arc::new(Self {
            subscribers: Mutex::new(HashMap::new()),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            stopped,
            next_subscriber_id: AtomicU64::new(1),
            send_timeout: Duration::from_millis(config.send_timeout_ms.max(1)),
            greeting: config.greeting.clone(),
            metrics: HubMetrics::new(),
        })
    }

    /// Allocate an ID for a new subscriber
    pub fn next_subscriber_id(&self) -> SubscriberId {
        self.next_subscriber_id.fetch_add(1, Ordering::SeqCst)
    }

    /// First payload every subscriber receives
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Deadline for one send to one subscriber
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Register a subscriber
    ///
    /// The subscriber receives every payload fanned out after this call.
    /// Returns false (and leaves the registry untouched) if the subscriber is
    /// no longer connecting or the hub is shutting down.
    pub fn register(&self, subscriber: Arc<Subscriber>) -> bool {
        let id = subscriber.id();

        if self.is_stopped() || !subscriber.activate() {
            logger::debug(
                LogTag::Hub,
                &format!("Subscriber {} not registered (state={:?})", id, subscriber.state()),
            );
            return false;
        }

        let active = {
            let mut subscribers = self.subscribers.lock();
            subscribers.insert(id, subscriber);
            subscribers.len()
        };
        self.metrics.subscriber_registered();

        logger::debug(
            LogTag::Hub,
            &format!("Subscriber {} registered (active={})", id, active),
        );
        true
    }

    /// Remove a subscriber and release its transport
    ///
    /// Removing an absent subscriber is a no-op; returns whether it was present.
    pub async fn deregister(&self, id: SubscriberId) -> bool {
        let removed = self.take_subscribers(&[id]);
        let present = !removed.is_empty();
        close_subscribers(removed).await;
        present
    }

    /// Remove several subscribers under one lock
    fn take_subscribers(&self, ids: &[SubscriberId]) -> Vec<Arc<Subscriber>> {
        let (removed, active) = {
            let mut subscribers = self.subscribers.lock();
            let removed: Vec<Arc<Subscriber>> =
                ids.iter().filter_map(|id| subscribers.remove(id)).collect();
            (removed, subscribers.len())
        };

        for subscriber in &removed {
            self.metrics.subscriber_removed();
            logger::debug(
                LogTag::Hub,
                &format!(
                    "Subscriber {} deregistered (active={})",
                    subscriber.id(),
                    active
                ),
            );
        }
        removed
    }

    /// Enqueue a payload for fan-out
    ///
    /// Waits while the queue is full. Does not wait for delivery.
    pub async fn publish(&self, payload: String) -> Result<(), HubError> {
        if self.is_stopped() {
            return Err(HubError::Stopped);
        }

        self.inbound_tx
            .send(payload)
            .await
            .map_err(|_| HubError::Stopped)?;
        self.metrics.payload_published();
        Ok(())
    }

    /// Serialize a record and enqueue it
    pub async fn publish_record(&self, record: &LogRecord) -> Result<(), HubError> {
        self.publish(record.to_payload()?).await
    }

    /// Fan-out loop
    ///
    /// Runs until `shutdown`; then drains payloads already queued to the
    /// current subscribers and deregisters all of them. May run only once.
    pub async fn run(self: Arc<Self>) -> Result<(), HubError> {
        let mut inbound = self
            .inbound_rx
            .lock()
            .take()
            .ok_or(HubError::AlreadyRunning)?;
        let mut stopped_rx = self.stopped.subscribe();

        logger::info(
            LogTag::Hub,
            &format!(
                "Fan-out loop started (queue_capacity={}, send_timeout={}ms)",
                self.inbound_tx.max_capacity(),
                self.send_timeout.as_millis()
            ),
        );

        loop {
            tokio::select! {
                biased;

                _ = wait_stopped(&mut stopped_rx) => break,

                payload = inbound.recv() => match payload {
                    Some(payload) => self.fan_out(&payload).await,
                    None => break,
                },
            }
        }

        // Graceful drain
        inbound.close();
        let mut drained = 0usize;
        while let Some(payload) = inbound.recv().await {
            self.fan_out(&payload).await;
            drained += 1;
        }

        let ids: Vec<SubscriberId> = self.subscribers.lock().keys().copied().collect();
        close_subscribers(self.take_subscribers(&ids)).await;

        logger::info(
            LogTag::Hub,
            &format!("Fan-out loop stopped (drained={})", drained),
        );
        Ok(())
    }

    /// Stop accepting payloads and let `run` drain and exit
    pub fn shutdown(&self) {
        if !self.stopped.send_replace(true) {
            logger::debug(LogTag::Hub, "Hub shutdown requested");
        }
    }

    /// Deliver one payload to every registered subscriber
    async fn fan_out(&self, payload: &str) {
        self.deliver(payload).await;
        self.metrics.payload_dispatched();
    }

    async fn deliver(&self, payload: &str) {
        let subscribers: Vec<Arc<Subscriber>> =
            self.subscribers.lock().values().cloned().collect();

        if subscribers.is_empty() {
            return;
        }

        let deadline = self.send_timeout;
        let outcomes = join_all(subscribers.iter().map(|subscriber| async move {
            (subscriber.id(), subscriber.send_within(payload, deadline).await)
        }))
        .await;

        let mut sent = 0usize;
        let mut failed = Vec::new();

        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    sent += 1;
                    self.metrics.delivery_succeeded();
                }
                Err(e) => {
                    self.metrics
                        .delivery_failed(matches!(e, TransportError::Timeout(_)));
                    logger::debug(
                        LogTag::Hub,
                        &format!("Subscriber {}: delivery failed: {}", id, e),
                    );
                    failed.push(id);
                }
            }
        }

        // Transports are released off the loop
        let removed = self.take_subscribers(&failed);
        if !removed.is_empty() {
            tokio::spawn(close_subscribers(removed));
        }

        logger::verbose(
            LogTag::Hub,
            &format!(
                "Fan-out {} bytes (sent={}, failed={})",
                payload.len(),
                sent,
                failed.len()
            ),
        );
    }

    /// Get hub metrics
    pub fn metrics(&self) -> Arc<HubMetrics> {
        self.metrics.clone()
    }

    /// Get registered subscriber count
    pub fn active_subscribers(&self) -> usize {
        self.subscribers.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_registered(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }
}

/// Close transports concurrently; each close is bounded by the subscriber
async fn close_subscribers(subscribers: Vec<Arc<Subscriber>>) {
    join_all(subscribers.iter().map(|subscriber| subscriber.close())).await;
}

async fn wait_stopped(stopped_rx: &mut watch::Receiver<bool>) {
    let _ = stopped_rx.wait_for(|stopped| *stopped).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webserver::ws::subscriber::{ReceiveEnd, SubscriberState};
    use crate::webserver::ws::transport::test_support::{
        ChannelSink, ChannelSource, StalledSink, UnresponsiveSink,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::UnboundedReceiver;

    const WAIT: Duration = Duration::from_secs(2);

    fn test_hub(queue_capacity: usize, send_timeout_ms: u64) -> Arc<Hub> {
        Hub::new(&HubConfig {
            queue_capacity,
            send_timeout_ms,
            ..HubConfig::default()
        })
    }

    fn attach(hub: &Hub) -> (Arc<Subscriber>, UnboundedReceiver<String>, Arc<AtomicUsize>) {
        let (sink, rx, closes) = ChannelSink::new();
        let subscriber = Arc::new(Subscriber::new(hub.next_subscriber_id(), Box::new(sink)));
        assert!(hub.register(subscriber.clone()));
        (subscriber, rx, closes)
    }

    async fn next(rx: &mut UnboundedReceiver<String>) -> String {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for payload")
            .expect("sink dropped")
    }

    async fn wait_dispatched(hub: &Hub, count: u64) {
        tokio::time::timeout(WAIT, async {
            while hub.metrics().snapshot().payloads_dispatched < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for fan-out");
    }

    #[tokio::test]
    async fn test_hub_registration() {
        let hub = test_hub(8, 100);

        let (sub1, _rx1, _) = attach(&hub);
        let (sub2, _rx2, _) = attach(&hub);

        assert_eq!(hub.active_subscribers(), 2);
        assert_ne!(sub1.id(), sub2.id());
        assert_eq!(sub1.state(), SubscriberState::Active);

        assert!(hub.deregister(sub1.id()).await);
        assert_eq!(hub.active_subscribers(), 1);
        assert!(!hub.is_registered(sub1.id()));
        assert_eq!(sub1.state(), SubscriberState::Closed);
    }

    #[tokio::test]
    async fn test_register_refuses_closed_subscriber() {
        let hub = test_hub(8, 100);
        let (sink, _rx, _) = ChannelSink::new();
        let subscriber = Arc::new(Subscriber::new(hub.next_subscriber_id(), Box::new(sink)));
        subscriber.close().await;

        assert!(!hub.register(subscriber));
        assert_eq!(hub.active_subscribers(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_subscriber_in_order() {
        let hub = test_hub(8, 500);
        tokio::spawn(hub.clone().run());

        let mut receivers: Vec<_> = (0..3).map(|_| attach(&hub).1).collect();

        for payload in ["one", "two", "three"] {
            hub.publish(payload.to_string()).await.unwrap();
        }

        for rx in receivers.iter_mut() {
            assert_eq!(next(rx).await, "one");
            assert_eq!(next(rx).await, "two");
            assert_eq!(next(rx).await, "three");
        }

        wait_dispatched(&hub, 3).await;
        assert_eq!(hub.metrics().snapshot().deliveries, 9);
    }

    #[tokio::test]
    async fn test_late_subscribers_only_see_later_records() {
        let hub = test_hub(8, 500);
        tokio::spawn(hub.clone().run());

        hub.publish("A".to_string()).await.unwrap();
        wait_dispatched(&hub, 1).await;

        let (_x, mut x_rx, _) = attach(&hub);
        hub.publish("B".to_string()).await.unwrap();
        assert_eq!(next(&mut x_rx).await, "B");

        let (_y, mut y_rx, _) = attach(&hub);
        hub.publish("C".to_string()).await.unwrap();
        assert_eq!(next(&mut x_rx).await, "C");
        assert_eq!(next(&mut y_rx).await, "C");

        wait_dispatched(&hub, 3).await;
        assert!(x_rx.try_recv().is_err());
        assert!(y_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_subscriber_removed_once() {
        let hub = test_hub(8, 500);
        tokio::spawn(hub.clone().run());

        let (broken, broken_rx, broken_closes) = attach(&hub);
        let (_healthy, mut healthy_rx, _) = attach(&hub);

        // Forcibly close the peer before the publish
        drop(broken_rx);

        hub.publish("first".to_string()).await.unwrap();
        assert_eq!(next(&mut healthy_rx).await, "first");
        wait_dispatched(&hub, 1).await;

        assert!(!hub.is_registered(broken.id()));
        assert_eq!(broken.state(), SubscriberState::Closed);
        assert_eq!(hub.active_subscribers(), 1);

        hub.publish("second".to_string()).await.unwrap();
        assert_eq!(next(&mut healthy_rx).await, "second");
        wait_dispatched(&hub, 2).await;

        let snapshot = hub.metrics().snapshot();
        assert_eq!(snapshot.delivery_failures, 1);
        assert_eq!(snapshot.active_subscribers, 1);

        tokio::time::timeout(WAIT, async {
            while broken_closes.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("broken transport never released");
        assert_eq!(broken_closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stalled_subscriber_does_not_block_others() {
        let hub = test_hub(8, 50);
        tokio::spawn(hub.clone().run());

        let stalled = Arc::new(Subscriber::new(hub.next_subscriber_id(), Box::new(StalledSink)));
        assert!(hub.register(stalled.clone()));
        let (_healthy, mut healthy_rx, _) = attach(&hub);

        hub.publish("1".to_string()).await.unwrap();
        hub.publish("2".to_string()).await.unwrap();

        assert_eq!(next(&mut healthy_rx).await, "1");
        assert_eq!(next(&mut healthy_rx).await, "2");

        assert!(!hub.is_registered(stalled.id()));
        let snapshot = hub.metrics().snapshot();
        assert_eq!(snapshot.send_timeouts, 1);
        assert_eq!(snapshot.delivery_failures, 1);
    }

    #[tokio::test]
    async fn test_stalled_greeting_does_not_stop_fan_out() {
        let hub = test_hub(8, 50);
        tokio::spawn(hub.clone().run());

        let stalled = Arc::new(Subscriber::new(hub.next_subscriber_id(), Box::new(StalledSink)));
        assert!(hub.register(stalled.clone()));
        let (source, _peer) = ChannelSource::new();
        let looping = stalled.clone();
        let loop_hub = hub.clone();
        let handle = tokio::spawn(async move { looping.receive_loop(source, &loop_hub).await });

        let (_healthy, mut healthy_rx, _) = attach(&hub);

        hub.publish("1".to_string()).await.unwrap();
        hub.publish("2".to_string()).await.unwrap();

        assert_eq!(next(&mut healthy_rx).await, "1");
        assert_eq!(next(&mut healthy_rx).await, "2");
        wait_dispatched(&hub, 2).await;

        let end = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
        assert!(matches!(end, ReceiveEnd::Failed(_)));
        assert!(!hub.is_registered(stalled.id()));
        assert_eq!(stalled.state(), SubscriberState::Closed);
    }

    #[tokio::test]
    async fn test_unresponsive_subscribers_cost_one_deadline() {
        let hub = test_hub(8, 50);
        tokio::spawn(hub.clone().run());

        for _ in 0..5 {
            let frozen = Arc::new(Subscriber::new(
                hub.next_subscriber_id(),
                Box::new(UnresponsiveSink),
            ));
            assert!(hub.register(frozen));
        }
        let (_healthy, mut healthy_rx, _) = attach(&hub);

        let started = tokio::time::Instant::now();
        hub.publish("1".to_string()).await.unwrap();
        hub.publish("2".to_string()).await.unwrap();

        assert_eq!(next(&mut healthy_rx).await, "1");
        assert_eq!(next(&mut healthy_rx).await, "2");

        // Well under one transport close timeout, regardless of peer count
        assert!(started.elapsed() < Duration::from_millis(900));
        assert_eq!(hub.active_subscribers(), 1);
        assert_eq!(hub.metrics().snapshot().send_timeouts, 5);
    }

    #[tokio::test]
    async fn test_deregister_is_idempotent() {
        let hub = test_hub(8, 100);
        let (subscriber, _rx, closes) = attach(&hub);

        assert!(hub.deregister(subscriber.id()).await);
        assert!(!hub.deregister(subscriber.id()).await);
        assert!(!hub.deregister(9999).await);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(hub.metrics().snapshot().active_subscribers, 0);
    }

    #[tokio::test]
    async fn test_publish_blocks_when_queue_full() {
        let hub = test_hub(1, 100);

        hub.publish("fits".to_string()).await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(100), hub.publish("waits".to_string()))
                .await;
        assert!(blocked.is_err(), "publish should wait for queue space");

        // Once the loop consumes, the publisher gets through
        tokio::spawn(hub.clone().run());
        tokio::time::timeout(WAIT, hub.publish("later".to_string()))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_only_once() {
        let hub = test_hub(8, 100);
        hub.shutdown();

        assert!(hub.clone().run().await.is_ok());
        assert!(matches!(
            hub.clone().run().await,
            Err(HubError::AlreadyRunning)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue_and_closes_subscribers() {
        let hub = test_hub(8, 100);
        let (subscriber, mut rx, closes) = attach(&hub);

        hub.publish("queued".to_string()).await.unwrap();
        hub.shutdown();
        assert!(matches!(
            hub.publish("rejected".to_string()).await,
            Err(HubError::Stopped)
        ));

        tokio::time::timeout(WAIT, hub.clone().run())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(next(&mut rx).await, "queued");
        assert_eq!(hub.active_subscribers(), 0);
        assert_eq!(subscriber.state(), SubscriberState::Closed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_record_sends_json() {
        let hub = test_hub(8, 500);
        tokio::spawn(hub.clone().run());
        let (_sub, mut rx, _) = attach(&hub);

        let record = LogRecord {
            time: 42,
            tag: "Tag".to_string(),
            message: "msg".to_string(),
            priority: "E".to_string(),
            pid: "1".to_string(),
            tid: "2".to_string(),
        };
        hub.publish_record(&record).await.unwrap();

        let received: LogRecord = serde_json::from_str(&next(&mut rx).await).unwrap();
        assert_eq!(received, record);
    }

    #[tokio::test]
    async fn test_receive_loop_greets_and_forwards_peer_payloads() {
        let hub = test_hub(8, 500);
        tokio::spawn(hub.clone().run());

        let (subscriber, mut rx, _) = attach(&hub);
        let (source, peer) = ChannelSource::new();

        let looping = subscriber.clone();
        let loop_hub = hub.clone();
        let handle = tokio::spawn(async move { looping.receive_loop(source, &loop_hub).await });

        assert_eq!(next(&mut rx).await, "Welcome");

        // Peer payloads are broadcast like produced records
        peer.send(Ok("from peer".to_string())).unwrap();
        assert_eq!(next(&mut rx).await, "from peer");

        drop(peer);
        let end = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
        assert!(matches!(end, ReceiveEnd::PeerClosed));
        assert_eq!(subscriber.state(), SubscriberState::Closed);

        // Deregistration is the caller's job
        assert!(hub.deregister(subscriber.id()).await);
    }

    #[tokio::test]
    async fn test_receive_loop_ends_on_receive_error() {
        let hub = test_hub(8, 500);
        let (subscriber, mut rx, _) = attach(&hub);
        let (source, peer) = ChannelSource::new();

        peer.send(Err(TransportError::Receive("reset".to_string())))
            .unwrap();

        let end = subscriber.receive_loop(source, &hub).await;
        assert!(matches!(end, ReceiveEnd::Failed(TransportError::Receive(_))));
        assert_eq!(next(&mut rx).await, "Welcome");
        assert_eq!(subscriber.state(), SubscriberState::Closed);
    }

    #[tokio::test]
    async fn test_receive_loop_ends_when_hub_deregisters() {
        let hub = test_hub(8, 500);
        let (subscriber, mut rx, _) = attach(&hub);
        let (source, _peer) = ChannelSource::new();

        let looping = subscriber.clone();
        let loop_hub = hub.clone();
        let handle = tokio::spawn(async move { looping.receive_loop(source, &loop_hub).await });

        assert_eq!(next(&mut rx).await, "Welcome");
        assert!(hub.deregister(subscriber.id()).await);

        let end = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
        assert!(matches!(end, ReceiveEnd::Closed));
    }
}
