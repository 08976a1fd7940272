//! Engine event collector.
//!
//! Events fan out over a tokio broadcast channel and are also kept in a
//! bounded history so late subscribers and the CLI can inspect what happened.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::broadcast;

pub mod events;

pub use events::SoundEvent;

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<SoundEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of events.
pub struct TelemetryCollector {
    tx: broadcast::Sender<SoundEvent>,
    history: Mutex<VecDeque<SoundEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    /// Record and broadcast an event. Having no subscribers is not an error.
    pub fn publish(&self, event: SoundEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if self.history_capacity > 0 {
            let mut history = self
                .history
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SoundEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self
            .history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(64, 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(SoundEvent::Initialized {
            sample_rate: 48_000,
            at_ms: 1,
        });
        collector.publish(SoundEvent::Disposed { at_ms: 2 });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert!(matches!(snapshot.recent[0], SoundEvent::Initialized { .. }));
        assert!(matches!(snapshot.recent[1], SoundEvent::Disposed { .. }));
    }

    #[test]
    fn test_collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        for at_ms in 0..3 {
            collector.publish(SoundEvent::Disposed { at_ms });
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.recent[0].at_ms(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let collector = TelemetryCollector::new(8, 0);
        let mut rx = collector.subscribe();
        collector.publish(SoundEvent::Disposed { at_ms: 7 });

        let event = rx.recv().await.unwrap();
        assert_eq!(event, SoundEvent::Disposed { at_ms: 7 });
        assert!(collector.snapshot().recent.is_empty());
    }
}
