//! Envelope validation
//!
//! [`validate`] checks a decoded JSON value against the message envelope and
//! builds a [`Message`] from it. It never mutates its input and reports the
//! first violation it finds. Unknown top-level fields are ignored.

use super::message::{ErrorCode, ErrorObject, Message, RequestId, JSONRPC_VERSION};
use crate::error::{constants, Result, TransportError};
use serde_json::{Map, Value};

fn invalid(reason: impl Into<String>) -> TransportError {
    TransportError::InvalidFormat(reason.into())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode one wire record (UTF-8 JSON text) and validate it.
pub fn decode(bytes: &[u8]) -> Result<Message> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| invalid(format!("{}: {e}", constants::ERR_NOT_UTF8)))?;
    let value: Value = serde_json::from_str(text)
        .map_err(|e| invalid(format!("{}: {e}", constants::ERR_INVALID_JSON)))?;
    validate(&value)
}

/// Validate a decoded candidate against the envelope schema.
pub fn validate(raw: &Value) -> Result<Message> {
    let obj = raw
        .as_object()
        .ok_or_else(|| invalid(format!("expected a JSON object, got {}", type_name(raw))))?;

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        Some(Value::String(v)) => {
            return Err(invalid(format!(
                "jsonrpc must be \"{JSONRPC_VERSION}\", got \"{v}\""
            )))
        }
        Some(other) => {
            return Err(invalid(format!(
                "jsonrpc must be the string \"{JSONRPC_VERSION}\", got {}",
                type_name(other)
            )))
        }
        None => return Err(invalid("missing jsonrpc field")),
    }

    let id = match obj.get("id") {
        None => None,
        Some(Value::Number(n)) => Some(RequestId::Number(n.clone())),
        Some(Value::String(s)) => Some(RequestId::String(s.clone())),
        Some(other) => {
            return Err(invalid(format!(
                "id must be a number or string, got {}",
                type_name(other)
            )))
        }
    };

    let method = match obj.get("method") {
        None => None,
        Some(Value::String(m)) => Some(m.clone()),
        Some(other) => {
            return Err(invalid(format!(
                "method must be a string, got {}",
                type_name(other)
            )))
        }
    };

    let params = match obj.get("params") {
        None => None,
        Some(Value::Object(p)) => Some(p.clone()),
        Some(other) => {
            return Err(invalid(format!(
                "params must be an object, got {}",
                type_name(other)
            )))
        }
    };

    let result = obj.get("result").cloned();

    let error = match obj.get("error") {
        None => None,
        Some(Value::Object(e)) => Some(validate_error_object(e)?),
        Some(other) => {
            return Err(invalid(format!(
                "error must be an object, got {}",
                type_name(other)
            )))
        }
    };

    let message = Message {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        method,
        params,
        result,
        error,
    };
    validate_shape(&message)?;
    Ok(message)
}

fn validate_error_object(e: &Map<String, Value>) -> Result<ErrorObject> {
    let code = match e.get("code") {
        Some(Value::Number(n)) => ErrorCode::from(n.clone()),
        Some(other) => {
            return Err(invalid(format!(
                "error.code must be a number, got {}",
                type_name(other)
            )))
        }
        None => return Err(invalid("missing error.code field")),
    };
    let message = match e.get("message") {
        Some(Value::String(m)) => m.clone(),
        Some(other) => {
            return Err(invalid(format!(
                "error.message must be a string, got {}",
                type_name(other)
            )))
        }
        None => return Err(invalid("missing error.message field")),
    };
    Ok(ErrorObject {
        code,
        message,
        data: e.get("data").cloned(),
    })
}

/// Check the request / response / error-response exclusivity of a message.
///
/// Also used on outbound messages, which are built in code and never pass
/// through [`validate`].
pub fn validate_shape(message: &Message) -> Result<()> {
    if message.jsonrpc != JSONRPC_VERSION {
        return Err(invalid(format!(
            "jsonrpc must be \"{JSONRPC_VERSION}\", got \"{}\"",
            message.jsonrpc
        )));
    }
    match (&message.method, &message.result, &message.error) {
        (Some(_), None, None) => Ok(()),
        (None, Some(_), None) => Ok(()),
        (None, None, Some(_)) => Ok(()),
        (None, None, None) => Err(invalid(
            "message must contain one of method, result or error",
        )),
        (Some(_), _, _) => Err(invalid(
            "a request must not carry a result or error",
        )),
        (None, Some(_), Some(_)) => Err(invalid(
            "a response must not carry both result and error",
        )),
    }
}
