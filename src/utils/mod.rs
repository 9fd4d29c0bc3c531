//! # Utility Modules
//!
//! Supporting utilities for admission control, logging, and observability.
//!
//! ## Components
//! - **Rate Limiter**: Token bucket with continuous or discrete refill
//! - **Logging**: Structured logging configuration (stderr, optional JSON)
//! - **Metrics**: Thread-safe per-transport counters

pub mod logging;
pub mod metrics;
pub mod rate_limiter;

pub use logging::init_logging;
pub use metrics::{Metrics, MetricsSnapshot, Timer};
pub use rate_limiter::{RefillPolicy, TokenBucket};
