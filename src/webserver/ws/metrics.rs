use serde::Serialize;
/// Hub metrics collection
///
/// Aggregate counters for the broadcast hub, readable from any task.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// HUB METRICS
// ============================================================================

/// Hub-level metrics (aggregate across all subscribers)
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Total subscribers registered (lifetime)
    total_subscribers: AtomicU64,

    /// Currently registered subscribers
    active_subscribers: AtomicUsize,

    /// Payloads accepted onto the inbound queue
    payloads_published: AtomicU64,

    /// Payloads taken off the queue and fanned out
    payloads_dispatched: AtomicU64,

    /// Successful deliveries (one per subscriber per payload)
    deliveries: AtomicU64,

    /// Failed deliveries, each one deregistered a subscriber
    delivery_failures: AtomicU64,

    /// Subset of failures caused by the per-send deadline
    send_timeouts: AtomicU64,
}

impl HubMetrics {
    /// Create new hub metrics
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record subscriber registration
    pub fn subscriber_registered(&self) {
        self.total_subscribers.fetch_add(1, Ordering::Relaxed);
        self.active_subscribers.fetch_add(1, Ordering::Relaxed);
    }

    /// Record subscriber removal
    pub fn subscriber_removed(&self) {
        self.active_subscribers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn payload_published(&self) {
        self.payloads_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn payload_dispatched(&self) {
        self.payloads_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_succeeded(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_failed(&self, timed_out: bool) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.send_timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get snapshot
    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_subscribers: self.total_subscribers.load(Ordering::Relaxed),
            active_subscribers: self.active_subscribers.load(Ordering::Relaxed),
            payloads_published: self.payloads_published.load(Ordering::Relaxed),
            payloads_dispatched: self.payloads_dispatched.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            send_timeouts: self.send_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Hub metrics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct HubMetricsSnapshot {
    pub total_subscribers: u64,
    pub active_subscribers: usize,
    pub payloads_published: u64,
    pub payloads_dispatched: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub send_timeouts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_metrics() {
        let metrics = HubMetrics::new();

        metrics.subscriber_registered();
        metrics.subscriber_registered();
        metrics.payload_published();
        metrics.payload_dispatched();
        metrics.delivery_succeeded();
        metrics.delivery_failed(true);
        metrics.delivery_failed(false);
        metrics.subscriber_removed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_subscribers, 2);
        assert_eq!(snapshot.active_subscribers, 1);
        assert_eq!(snapshot.payloads_published, 1);
        assert_eq!(snapshot.payloads_dispatched, 1);
        assert_eq!(snapshot.deliveries, 1);
        assert_eq!(snapshot.delivery_failures, 2);
        assert_eq!(snapshot.send_timeouts, 1);
    }
}
