//! Runtime capabilities injected into the ceremony.
//!
//! The protocol needs a wall clock, a fire-and-forget broadcast and a
//! best-effort metrics sink; each is a small trait so tests can substitute
//! controlled implementations.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Wall clock in milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// System time since the Unix epoch.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            millis: AtomicI64::new(start),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Fire-and-forget message fan-out to peers. No acknowledgement; the
/// transport may drop messages.
pub trait Broadcast: Send + Sync {
    fn send(&self, tag: &str, bytes: Vec<u8>);
}

/// Broadcast that drops everything.
#[derive(Default)]
pub struct NoopBroadcast;

impl Broadcast for NoopBroadcast {
    fn send(&self, _tag: &str, _bytes: Vec<u8>) {}
}

/// Broadcast into an unbounded channel; the receiving side stands in for
/// the peer network.
pub struct ChannelBroadcast {
    tx: UnboundedSender<(String, Vec<u8>)>,
}

impl ChannelBroadcast {
    pub fn new() -> (Self, UnboundedReceiver<(String, Vec<u8>)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Broadcast for ChannelBroadcast {
    fn send(&self, tag: &str, bytes: Vec<u8>) {
        // Receiver may be gone; broadcast is best-effort by contract.
        let _ = self.tx.send((tag.to_string(), bytes));
    }
}

/// Best-effort counter sink.
pub trait Metrics: Send + Sync {
    fn increment(&self, counter: &str);
}

/// Metrics sink that discards everything.
#[derive(Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn increment(&self, _counter: &str) {}
}

/// In-memory counters, readable by tests.
#[derive(Default)]
pub struct CountingMetrics {
    counters: Mutex<HashMap<String, u64>>,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, counter: &str) -> u64 {
        self.counters.lock().get(counter).copied().unwrap_or(0)
    }
}

impl Metrics for CountingMetrics {
    fn increment(&self, counter: &str) {
        *self.counters.lock().entry(counter.to_string()).or_insert(0) += 1;
    }
}

/// The capability bundle handed to the ceremony.
#[derive(Clone)]
pub struct CeremonyEnv {
    pub clock: Arc<dyn Clock>,
    pub broadcast: Arc<dyn Broadcast>,
    pub metrics: Arc<dyn Metrics>,
}

impl CeremonyEnv {
    pub fn new(
        clock: Arc<dyn Clock>,
        broadcast: Arc<dyn Broadcast>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            clock,
            broadcast,
            metrics,
        }
    }

    /// System clock, no broadcast, no metrics.
    pub fn system() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(NoopBroadcast),
            Arc::new(NoopMetrics),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_millis(), 100);
        clock.advance(50);
        assert_eq!(clock.now_millis(), 150);
        clock.set(7);
        assert_eq!(clock.now_millis(), 7);
    }

    #[test]
    fn test_counting_metrics() {
        let metrics = CountingMetrics::new();
        assert_eq!(metrics.get("genesis"), 0);
        metrics.increment("genesis");
        metrics.increment("genesis");
        assert_eq!(metrics.get("genesis"), 2);
    }

    #[test]
    fn test_channel_broadcast() {
        let (broadcast, mut rx) = ChannelBroadcast::new();
        broadcast.send("tag", vec![1, 2, 3]);
        let (tag, bytes) = rx.try_recv().unwrap();
        assert_eq!(tag, "tag");
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
