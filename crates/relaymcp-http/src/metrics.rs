//! Transport metrics types.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A serializable snapshot of a transport's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportMetrics {
    /// Total number of bytes sent in POST bodies.
    pub bytes_sent: u64,

    /// Total number of bytes received in response bodies and event streams.
    pub bytes_received: u64,

    /// Total number of messages sent.
    pub messages_sent: u64,

    /// Total number of messages delivered to the handler.
    pub messages_received: u64,

    /// Total number of errors reported to the handler.
    pub errors: u64,

    /// Total number of event streams opened, inline and standalone.
    pub streams_opened: u64,

    /// The current number of event streams being consumed.
    pub active_streams: u64,
}

/// A lock-free, atomic structure for metrics updates.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    /// Total bytes sent (atomic counter).
    pub bytes_sent: AtomicU64,

    /// Total bytes received (atomic counter).
    pub bytes_received: AtomicU64,

    /// Total messages sent (atomic counter).
    pub messages_sent: AtomicU64,

    /// Total messages received (atomic counter).
    pub messages_received: AtomicU64,

    /// Total errors reported (atomic counter).
    pub errors: AtomicU64,

    /// Total event streams opened (atomic counter).
    pub streams_opened: AtomicU64,

    /// Current event streams (atomic gauge).
    pub active_streams: AtomicU64,
}

impl AtomicMetrics {
    /// Creates a new `AtomicMetrics` instance with all counters initialized to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message sent with the given encoded size.
    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Records body bytes read from the network.
    pub fn record_bytes_received(&self, bytes: usize) {
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Marks an event stream as opened and returns a guard that marks it closed on drop.
    pub fn stream_opened(&self) -> ActiveStreamGuard<'_> {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
        self.active_streams.fetch_add(1, Ordering::Relaxed);
        ActiveStreamGuard { metrics: self }
    }

    /// Creates a serializable `TransportMetrics` snapshot from the current atomic values.
    pub fn snapshot(&self) -> TransportMetrics {
        TransportMetrics {
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            active_streams: self.active_streams.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters except the active stream gauge.
    pub fn reset(&self) {
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        self.messages_sent.store(0, Ordering::Relaxed);
        self.messages_received.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.streams_opened.store(0, Ordering::Relaxed);
    }
}

/// Decrements [`AtomicMetrics::active_streams`] when dropped.
#[derive(Debug)]
pub struct ActiveStreamGuard<'a> {
    metrics: &'a AtomicMetrics,
}

impl Drop for ActiveStreamGuard<'_> {
    fn drop(&mut self) {
        self.metrics.active_streams.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_metrics_default() {
        let metrics = AtomicMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot, TransportMetrics::default());
    }

    #[test]
    fn test_atomic_metrics_update() {
        let metrics = AtomicMetrics::new();
        metrics.record_sent(100);
        metrics.record_bytes_received(40);
        metrics.messages_received.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bytes_sent, 100);
        assert_eq!(snapshot.messages_sent, 1);
        assert_eq!(snapshot.bytes_received, 40);
        assert_eq!(snapshot.messages_received, 1);
    }

    #[test]
    fn test_active_stream_guard() {
        let metrics = AtomicMetrics::new();
        {
            let _first = metrics.stream_opened();
            let _second = metrics.stream_opened();
            assert_eq!(metrics.snapshot().active_streams, 2);
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_streams, 0);
        assert_eq!(snapshot.streams_opened, 2);
    }

    #[test]
    fn test_atomic_metrics_reset() {
        let metrics = AtomicMetrics::new();
        metrics.record_sent(100);
        let _guard = metrics.stream_opened();
        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bytes_sent, 0);
        assert_eq!(snapshot.active_streams, 1);
    }
}
