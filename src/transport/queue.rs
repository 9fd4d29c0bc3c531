//! Retention queue for validated inbound messages.
//!
//! Entries are appended in arrival order, so expiry only ever has to look at
//! the front of the queue.

use crate::protocol::message::Message;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A validated message and the instant it arrived
#[derive(Debug, Clone)]
pub struct QueuedEntry {
    pub message: Message,
    pub received_at: Instant,
}

#[derive(Debug)]
pub struct MessageQueue {
    entries: VecDeque<QueuedEntry>,
    retention: Duration,
}

impl MessageQueue {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            retention,
        }
    }

    pub fn push(&mut self, message: Message, received_at: Instant) {
        self.entries.push_back(QueuedEntry {
            message,
            received_at,
        });
    }

    /// Drop entries older than the retention window. Returns how many were removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(front) = self.entries.front() {
            if now.saturating_duration_since(front.received_at) <= self.retention {
                break;
            }
            self.entries.pop_front();
            removed += 1;
        }
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Swept expired queue entries");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedEntry> {
        self.entries.iter()
    }
}
