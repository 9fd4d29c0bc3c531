//! # Protocol Layer
//!
//! JSON-RPC 2.0 envelope types, schema validation and a method dispatcher.
//!
//! ## Components
//! - **Message**: the envelope shared by requests, notifications and responses
//! - **Validator**: decode + schema check applied to every inbound record
//! - **Dispatcher**: routes validated requests to registered async handlers
//!
//! ## Wire Format
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"search","params":{...}}\n
//! ```

pub mod dispatcher;
pub mod message;
pub mod validator;


pub use dispatcher::{Dispatcher, MethodResult};
pub use message::{ErrorCode, ErrorObject, Message, MessageKind, RequestId, JSONRPC_VERSION};
pub use validator::{decode, validate};
