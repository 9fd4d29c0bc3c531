//! Observability and Metrics
//!
//! Per-transport counters for traffic, rejections and failures.
//!
//! Uses atomic counters so the stream driver, the health-check task and
//! callers of `send` can record concurrently.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector owned by one transport
#[derive(Debug)]
pub struct Metrics {
    /// Inbound messages that passed every gate
    pub messages_received: AtomicU64,
    /// Outbound messages written
    pub messages_sent: AtomicU64,
    /// Bytes of accepted inbound messages
    pub bytes_received: AtomicU64,
    /// Bytes written, excluding line terminators
    pub bytes_sent: AtomicU64,
    /// Inbound chunks over the size limit
    pub rejected_oversized: AtomicU64,
    /// Inbound chunks refused by the rate limiter
    pub rejected_rate_limited: AtomicU64,
    /// Inbound chunks that failed decoding or validation
    pub rejected_invalid: AtomicU64,
    /// Handler failures and panics
    pub handler_errors: AtomicU64,
    /// Health checks that found the connection stale
    pub health_check_failures: AtomicU64,
    /// Queue entries dropped by retention sweeps
    pub queue_expired: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            rejected_oversized: AtomicU64::new(0),
            rejected_rate_limited: AtomicU64::new(0),
            rejected_invalid: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
            health_check_failures: AtomicU64::new(0),
            queue_expired: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn message_received(&self, byte_count: u64) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn message_sent(&self, byte_count: u64) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn oversized(&self) {
        self.rejected_oversized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rate_limited(&self) {
        self.rejected_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invalid(&self) {
        self.rejected_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn health_check_failed(&self) {
        self.health_check_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn expired(&self, count: u64) {
        self.queue_expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            rejected_oversized: self.rejected_oversized.load(Ordering::Relaxed),
            rejected_rate_limited: self.rejected_rate_limited.load(Ordering::Relaxed),
            rejected_invalid: self.rejected_invalid.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            health_check_failures: self.health_check_failures.load(Ordering::Relaxed),
            queue_expired: self.queue_expired.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            messages_received = snapshot.messages_received,
            messages_sent = snapshot.messages_sent,
            bytes_received = snapshot.bytes_received,
            bytes_sent = snapshot.bytes_sent,
            rejected_oversized = snapshot.rejected_oversized,
            rejected_rate_limited = snapshot.rejected_rate_limited,
            rejected_invalid = snapshot.rejected_invalid,
            handler_errors = snapshot.handler_errors,
            health_check_failures = snapshot.health_check_failures,
            queue_expired = snapshot.queue_expired,
            uptime_seconds = snapshot.uptime_seconds,
            "Transport metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_sent: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub rejected_oversized: u64,
    pub rejected_rate_limited: u64,
    pub rejected_invalid: u64,
    pub handler_errors: u64,
    pub health_check_failures: u64,
    pub queue_expired: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
