//! # Error Types
//!
//! Error handling for the relay transport.
//!
//! This module defines every failure the transport can report, from framing
//! and admission rejections on a single inbound chunk up to the health-check
//! failure that tears a connection down.
//!
//! ## Error Categories
//! - **Framing Errors**: oversized chunks, undecodable or schema-violating messages
//! - **Admission Errors**: rate limit rejections from the token bucket
//! - **Lifecycle Errors**: sends on a closed transport, stale connections
//! - **Ambient Errors**: I/O, JSON serialization, configuration, handler failures
//!
//! Only [`TransportError::HealthCheckFailed`] and stream I/O failures are fatal
//! to a connection. Everything else is reported to the immediate caller and
//! the transport keeps accepting chunks.
//!
//! ## Example Usage
//! ```rust
//! use rpc_relay::error::{TransportError, Result};
//!
//! fn admit(size: usize, max: usize) -> Result<()> {
//!     if size > max {
//!         return Err(TransportError::MessageTooLarge { size, max });
//!     }
//!     Ok(())
//! }
//!
//! let err = admit(10, 5).unwrap_err();
//! assert!(err.to_string().contains("Message size exceeds limit"));
//! assert!(!err.is_fatal());
//! ```

use crate::protocol::message::ErrorObject;
use std::io;
use thiserror::Error;

/// Error message constants shared by logging and error construction.
pub mod constants {
    /// Framing errors
    pub const ERR_MESSAGE_TOO_LARGE: &str = "Message size exceeds limit";
    pub const ERR_NOT_UTF8: &str = "Message is not valid UTF-8";
    pub const ERR_INVALID_JSON: &str = "Message is not valid JSON";

    /// Admission errors
    pub const ERR_RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded";

    /// Connection errors
    pub const ERR_NOT_CONNECTED: &str = "Transport is not connected";
    pub const ERR_CONNECTION_CLOSED: &str = "Transport has been closed";

    /// Handler errors
    pub const ERR_HANDLER_PANICKED: &str = "Message handler panicked";
}

/// JSON-RPC error codes used when a transport error is reported back to the peer.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub const MESSAGE_TOO_LARGE: i64 = -32001;
    pub const RATE_LIMIT_EXCEEDED: i64 = -32002;
    pub const NOT_CONNECTED: i64 = -32003;
    pub const HEALTH_CHECK_FAILED: i64 = -32004;
}

/// TransportError is the primary error type for all transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Message size exceeds limit: {size} bytes (maximum: {max} bytes)")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Health check failed: no check for {elapsed_ms} ms (timeout: {timeout_ms} ms)")]
    HealthCheckFailed { elapsed_ms: u64, timeout_ms: u64 },

    #[error("Transport has been closed")]
    ConnectionClosed,

    #[error("Message handler failed: {0}")]
    Handler(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using TransportError
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    /// Whether this error ends the connection it occurred on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::HealthCheckFailed { .. } | TransportError::Io(_)
        )
    }

    /// Whether this error came from the JSON decode step rather than schema validation.
    pub fn is_parse_error(&self) -> bool {
        match self {
            TransportError::InvalidFormat(reason) => {
                reason.starts_with(constants::ERR_INVALID_JSON)
                    || reason.starts_with(constants::ERR_NOT_UTF8)
            }
            _ => false,
        }
    }

    /// Convert to a JSON-RPC error object suitable for an error response
    pub fn to_error_object(&self) -> ErrorObject {
        match self {
            TransportError::InvalidFormat(reason) if self.is_parse_error() => {
                ErrorObject::new(codes::PARSE_ERROR, format!("Parse error: {reason}"))
            }
            TransportError::InvalidFormat(reason) => {
                ErrorObject::new(codes::INVALID_REQUEST, format!("Invalid request: {reason}"))
            }
            TransportError::MessageTooLarge { size, max } => ErrorObject::with_data(
                codes::MESSAGE_TOO_LARGE,
                self.to_string(),
                serde_json::json!({ "size": size, "max": max }),
            ),
            TransportError::RateLimitExceeded => {
                ErrorObject::new(codes::RATE_LIMIT_EXCEEDED, constants::ERR_RATE_LIMIT_EXCEEDED)
            }
            TransportError::NotConnected | TransportError::ConnectionClosed => {
                ErrorObject::new(codes::NOT_CONNECTED, self.to_string())
            }
            TransportError::HealthCheckFailed { .. } => {
                ErrorObject::new(codes::HEALTH_CHECK_FAILED, self.to_string())
            }
            TransportError::Json(e) => {
                ErrorObject::new(codes::INVALID_PARAMS, format!("Invalid params: {e}"))
            }
            TransportError::Handler(_)
            | TransportError::Io(_)
            | TransportError::ConfigError(_) => {
                ErrorObject::new(codes::INTERNAL_ERROR, format!("Internal error: {self}"))
            }
        }
    }
}
