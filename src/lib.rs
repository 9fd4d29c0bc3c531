//! # rpc-relay
//!
//! A hardened transport for JSON-RPC 2.0 over a newline-delimited byte stream
//! (typically a process's stdin/stdout).
//!
//! Every inbound message is size-checked, rate-limited, decoded and validated
//! before it reaches the application's [`MessageHandler`]. Outbound messages
//! get the same validation and size limit. A periodic health check closes
//! connections that stop making progress.
//!
//! ```no_run
//! use rpc_relay::{Dispatcher, RelayConfig, Transport};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> rpc_relay::Result<()> {
//! let config = RelayConfig::from_env()?;
//! rpc_relay::init_logging(&config.logging)?;
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.register("ping", |_msg| async { Ok(json!("pong")) })?;
//!
//! let transport = Transport::stdio_with_handler(config.transport, Arc::new(dispatcher));
//! transport.start().await?;
//! transport.serve_stdio().await
//! # }
//! ```

#![warn(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::{LoggingConfig, RateLimitConfig, RelayConfig, TransportConfig};
pub use error::{Result, TransportError};
pub use protocol::{Dispatcher, ErrorCode, ErrorObject, Message, MessageKind, MethodResult, RequestId};
pub use transport::{ConnectionStatus, MessageHandler, Transport};
pub use utils::{init_logging, Metrics, MetricsSnapshot, RefillPolicy, TokenBucket};
