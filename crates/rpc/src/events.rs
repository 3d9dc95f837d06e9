//! Fan-out of committed provenance events.

use parking_lot::Mutex;
use proofpot_types::ProvenanceEvent;
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::trace;

/// An event together with its position in the publish order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedEvent {
    pub sequence: u64,
    #[serde(flatten)]
    pub event: ProvenanceEvent,
}

struct RecentLog {
    next_sequence: u64,
    entries: VecDeque<RecordedEvent>,
}

/// Broadcasts events to live subscribers and keeps a bounded log of the
/// most recent ones for polling clients.
///
/// Publishing never blocks: subscribers that fall behind lose the oldest
/// events (`RecvError::Lagged`), and the log drops its oldest entry once
/// full.
pub struct EventBus {
    sender: broadcast::Sender<RecordedEvent>,
    recent: Mutex<RecentLog>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            recent: Mutex::new(RecentLog {
                next_sequence: 1,
                entries: VecDeque::with_capacity(capacity),
            }),
            capacity,
        }
    }

    /// Publish events of one committed mutation, in order.
    pub fn publish(&self, events: impl IntoIterator<Item = ProvenanceEvent>) {
        let mut recent = self.recent.lock();
        for event in events {
            let recorded = RecordedEvent {
                sequence: recent.next_sequence,
                event,
            };
            recent.next_sequence += 1;

            if recent.entries.len() == self.capacity {
                recent.entries.pop_front();
            }
            recent.entries.push_back(recorded.clone());

            trace!(sequence = recorded.sequence, event = recorded.event.name(), "event published");
            // No receivers is not an error; the log still has the event.
            let _ = self.sender.send(recorded);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordedEvent> {
        self.sender.subscribe()
    }

    /// Up to `limit` of the latest events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<RecordedEvent> {
        let recent = self.recent.lock();
        let skip = recent.entries.len().saturating_sub(limit);
        recent.entries.iter().skip(skip).cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
