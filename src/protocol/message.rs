//! JSON-RPC 2.0 message envelope
//!
//! A single [`Message`] type covers requests, notifications, success responses
//! and error responses. Decoding always goes through the validator, so a
//! `Message` obtained from `serde_json` has already passed the envelope checks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Protocol version literal carried by every message
pub const JSONRPC_VERSION: &str = "2.0";

/// Correlation identifier (string or number)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric ID
    Number(Number),
    /// String ID
    String(String),
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Number(value.into())
    }
}

impl From<i32> for RequestId {
    fn from(value: i32) -> Self {
        RequestId::Number(value.into())
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        RequestId::String(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        RequestId::String(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

/// Numeric error code, kept exactly as the peer wrote it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(Number);

impl ErrorCode {
    /// The code as an integer, when it names one; `-3.2e4` names -32000
    pub fn as_i64(&self) -> Option<i64> {
        if let Some(code) = self.0.as_i64() {
            return Some(code);
        }
        let f = self.0.as_f64()?;
        let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
        (f.fract() == 0.0 && in_range).then_some(f as i64)
    }

    pub fn as_number(&self) -> &Number {
        &self.0
    }
}

impl From<i64> for ErrorCode {
    fn from(value: i64) -> Self {
        ErrorCode(value.into())
    }
}

impl From<Number> for ErrorCode {
    fn from(value: Number) -> Self {
        ErrorCode(value)
    }
}

impl PartialEq<i64> for ErrorCode {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Error code
    pub code: ErrorCode,

    /// Error message
    pub message: String,

    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i64, message: impl Into<String>, data: Value) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// Method not found (-32601)
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            crate::error::codes::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }

    /// Invalid params (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(
            crate::error::codes::INVALID_PARAMS,
            format!("Invalid params: {}", msg.into()),
        )
    }

    /// Internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(
            crate::error::codes::INTERNAL_ERROR,
            format!("Internal error: {}", msg.into()),
        )
    }
}

/// Which of the envelope shapes a message has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Has a method and an id
    Request,
    /// Has a method and no id
    Notification,
    /// Has a result
    Response,
    /// Has an error object
    ErrorResponse,
}

/// A JSON-RPC 2.0 envelope.
///
/// `result` distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(Value::Null)`), so a `{"result": null}` response survives a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Message {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Message {
    fn empty() -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    /// Create a request expecting a response
    pub fn request(
        id: impl Into<RequestId>,
        method: impl Into<String>,
        params: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            method: Some(method.into()),
            params,
            ..Self::empty()
        }
    }

    /// Create a notification (request without ID)
    pub fn notification(method: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            method: Some(method.into()),
            params,
            ..Self::empty()
        }
    }

    /// Create a successful response
    pub fn response(id: impl Into<RequestId>, result: Value) -> Self {
        Self {
            id: Some(id.into()),
            result: Some(result),
            ..Self::empty()
        }
    }

    /// Create an error response. `id` is `None` when the request id could not be recovered.
    pub fn error_response(id: Option<RequestId>, error: ErrorObject) -> Self {
        Self {
            id,
            error: Some(error),
            ..Self::empty()
        }
    }

    /// Classify the message. Callers should only rely on this for validated messages.
    pub fn kind(&self) -> MessageKind {
        if self.method.is_some() {
            if self.id.is_some() {
                MessageKind::Request
            } else {
                MessageKind::Notification
            }
        } else if self.error.is_some() {
            MessageKind::ErrorResponse
        } else {
            MessageKind::Response
        }
    }

    pub fn is_notification(&self) -> bool {
        self.kind() == MessageKind::Notification
    }

    /// Serialize as a single line of JSON (without the trailing newline)
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl TryFrom<Value> for Message {
    type Error = crate::error::TransportError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        super::validator::validate(&value)
    }
}
