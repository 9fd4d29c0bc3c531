//! Token-bucket admission control
//!
//! One [`TokenBucket`] belongs to exactly one transport. It holds a fractional
//! token count in `[0, capacity]` and the instant it was last refilled, and is
//! only mutated by [`TokenBucket::try_acquire`]. Rejections are a throttling
//! signal for the caller: nothing is queued or retried here.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// How spent tokens come back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefillPolicy {
    /// Tokens accrue continuously at `capacity / window`
    #[default]
    Continuous,
    /// The bucket snaps back to full once a whole window has elapsed
    Discrete,
}

#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    window: Duration,
    policy: RefillPolicy,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket admitting `capacity` messages per `window`, refilled continuously.
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self::with_policy(capacity, window, RefillPolicy::Continuous)
    }

    pub fn with_policy(capacity: u32, window: Duration, policy: RefillPolicy) -> Self {
        Self {
            capacity,
            window,
            policy,
            tokens: f64::from(capacity),
            last_refill: Instant::now(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Tokens currently held, as of the last admission check
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Admit one message now. Returns `false` when the bucket is empty.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Admit one message at `now`. Instants earlier than the last refill count as no elapsed time.
    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            trace!(tokens = self.tokens, "Token acquired");
            true
        } else {
            trace!(tokens = self.tokens, "Token bucket empty");
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let capacity = f64::from(self.capacity);

        match self.policy {
            RefillPolicy::Continuous => {
                let window_ms = self.window.as_secs_f64() * 1000.0;
                if window_ms > 0.0 {
                    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
                    self.tokens = (self.tokens + elapsed_ms * capacity / window_ms).min(capacity);
                } else {
                    self.tokens = capacity;
                }
                self.last_refill = now.max(self.last_refill);
            }
            RefillPolicy::Discrete => {
                if elapsed >= self.window {
                    self.tokens = capacity;
                    self.last_refill = now;
                }
            }
        }
    }
}
