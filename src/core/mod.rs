//! # Core Framing
//!
//! Low-level framing of the byte stream.
//!
//! ## Components
//! - **Codec**: Tokio codec splitting the stream into newline-terminated frames
//!
//! ## Wire Format
//! ```text
//! [UTF-8 JSON record] [\n]
//! ```
//!
//! ## Security
//! - Maximum line size: 5 MiB by default (prevents memory exhaustion)
//! - Oversized lines are skipped, not buffered
//! - Blank lines are ignored

pub mod codec;

pub use codec::{Frame, LineCodec};
