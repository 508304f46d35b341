//! Channel error types and handler-fault normalization

use crate::transport::TransportError;
use channel_types::{CallbackPath, TransactionId};
use serde_json::Value;
use thiserror::Error;
use wire::CodecError;

/// Wire error code for faults with no code of their own.
pub const RUNTIME_ERROR: &str = "runtime_error";

/// Errors that fail channel construction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Peer origin is neither `*` nor an `http(s)://host[:port]` pattern
    #[error("invalid peer origin pattern: {0}")]
    InvalidOrigin(String),

    /// Namespace scope is empty or contains the `::` separator
    #[error("invalid namespace scope: {0}")]
    InvalidScope(String),
}

/// Errors raised synchronously to local callers of the facade
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Method name is already registered
    #[error("method already bound: {0}")]
    AlreadyBound(String),

    /// A facade argument failed validation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The transaction is no longer (or was never) in the table
    #[error("unknown transaction: {0}")]
    UnknownTransaction(TransactionId),

    /// The transaction was not received as inbound on this side
    #[error("{0} was not received from the peer")]
    WrongDirection(TransactionId),

    /// The callback path was not declared by the request
    #[error("callback {path} was not declared by {id}")]
    InvalidCallback {
        id: TransactionId,
        path: CallbackPath,
    },

    /// The channel was closed
    #[error("channel is closed")]
    Closed,

    /// The transport refused the payload
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The codec could not render the outbound message
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A fault reported by a request handler.
///
/// This is the closed set of fault shapes the protocol understands; each
/// normalizes to the `(error, message)` pair carried by an error response.
#[derive(Debug, Clone)]
pub enum HandlerFault {
    /// Bare failure text; normalizes under the generic runtime error code
    Message(String),

    /// Explicit wire error code and message
    Coded { code: String, message: String },

    /// Arbitrary structured fault value, classified by shape (see
    /// [`HandlerFault::normalize`])
    Value(Value),
}

impl HandlerFault {
    /// Creates a bare-text fault
    pub fn message(message: impl Into<String>) -> Self {
        HandlerFault::Message(message.into())
    }

    /// Creates a fault with an explicit error code
    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerFault::Coded {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Normalizes the fault into the `(error, message)` response pair.
    ///
    /// Structured values are classified in precedence order:
    /// 1. a string → `runtime_error`, message = the string
    /// 2. a two-element array whose first element is a string →
    ///    `(first, second)`, the second rendered as text if not a string
    /// 3. an object with a string `error` field → code = that field,
    ///    message = its `message` field if a string, else the
    ///    serialization of the whole value
    /// 4. anything else → `runtime_error`, message = the serialization of
    ///    the value, falling back to its debug representation
    pub fn normalize(&self) -> (String, String) {
        match self {
            HandlerFault::Message(message) => (RUNTIME_ERROR.to_string(), message.clone()),
            HandlerFault::Coded { code, message } => (code.clone(), message.clone()),
            HandlerFault::Value(value) => normalize_value(value),
        }
    }
}

impl From<Value> for HandlerFault {
    fn from(value: Value) -> Self {
        HandlerFault::Value(value)
    }
}

impl From<&str> for HandlerFault {
    fn from(message: &str) -> Self {
        HandlerFault::Message(message.to_string())
    }
}

impl From<String> for HandlerFault {
    fn from(message: String) -> Self {
        HandlerFault::Message(message)
    }
}

fn normalize_value(value: &Value) -> (String, String) {
    match value {
        Value::String(message) => (RUNTIME_ERROR.to_string(), message.clone()),
        Value::Array(items) if items.len() == 2 => match &items[0] {
            Value::String(code) => {
                let message = match &items[1] {
                    Value::String(message) => message.clone(),
                    other => render(other),
                };
                (code.clone(), message)
            }
            _ => (RUNTIME_ERROR.to_string(), render(value)),
        },
        Value::Object(fields) => match fields.get("error") {
            Some(Value::String(code)) => {
                let message = match fields.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    _ => render(value),
                };
                (code.clone(), message)
            }
            _ => (RUNTIME_ERROR.to_string(), render(value)),
        },
        other => (RUNTIME_ERROR.to_string(), render(other)),
    }
}

fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}
