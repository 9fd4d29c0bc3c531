//! Periodic liveness check for an open transport.

use super::Inner;
use std::sync::Weak;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Runs until the transport closes or is dropped. The first check happens one
/// full interval after start.
pub(super) async fn run(inner: Weak<Inner>, interval: Duration) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.is_open() {
            break;
        }
        if inner.run_health_check().await.is_err() {
            break;
        }
    }
    debug!("Health check task stopped");
}
