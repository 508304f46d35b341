//! Wire message shapes and classification

use channel_types::{CallbackPath, TransactionId};
use serde_json::{Map, Value};
use thiserror::Error;

/// Wire field names, exact and case-sensitive.
pub mod fields {
    pub const ID: &str = "id";
    pub const METHOD: &str = "method";
    pub const PARAMS: &str = "params";
    pub const CALLBACKS: &str = "callbacks";
    pub const CALLBACK: &str = "callback";
    pub const RESULT: &str = "result";
    pub const ERROR: &str = "error";
    pub const MESSAGE: &str = "message";
}

/// Terminal body of a response: exactly one of result or error.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Successful result value
    Result(Value),
    /// Error code with optional human-readable message
    Error {
        code: String,
        message: Option<String>,
    },
}

/// One classified wire message.
///
/// The `method` on requests and notifications is the wire form: if the
/// sending channel is scoped it still carries the `scope::` prefix here.
/// Scope handling belongs to the dispatcher, not the message model.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// A query awaiting a correlated response
    Request {
        id: TransactionId,
        method: String,
        params: Value,
        callbacks: Vec<CallbackPath>,
    },
    /// Terminal answer to a request
    Response { id: TransactionId, body: ResponseBody },
    /// Mid-flight invocation of a callback declared by a request
    CallbackInvocation {
        id: TransactionId,
        callback: CallbackPath,
        params: Value,
    },
    /// Fire-and-forget message, never answered
    Notification { method: String, params: Value },
}

/// Why an inbound value could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The decoded payload was not a key-value object
    #[error("payload is not a structured object")]
    NotAnObject,

    /// An `id` field was present but not a positive integer
    #[error("id field is not a positive integer")]
    InvalidId,

    /// The present fields match no message kind
    #[error("field set matches no message kind")]
    Unclassifiable,
}

impl WireMessage {
    /// Creates a request message
    pub fn request(
        id: TransactionId,
        method: impl Into<String>,
        params: Value,
        callbacks: Vec<CallbackPath>,
    ) -> Self {
        WireMessage::Request {
            id,
            method: method.into(),
            params,
            callbacks,
        }
    }

    /// Creates a successful response
    pub fn result(id: TransactionId, value: Value) -> Self {
        WireMessage::Response {
            id,
            body: ResponseBody::Result(value),
        }
    }

    /// Creates an error response
    pub fn error(id: TransactionId, code: impl Into<String>, message: Option<String>) -> Self {
        WireMessage::Response {
            id,
            body: ResponseBody::Error {
                code: code.into(),
                message,
            },
        }
    }

    /// Creates a callback invocation
    pub fn callback(id: TransactionId, path: CallbackPath, params: Value) -> Self {
        WireMessage::CallbackInvocation {
            id,
            callback: path,
            params,
        }
    }

    /// Creates a notification
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        WireMessage::Notification {
            method: method.into(),
            params,
        }
    }

    /// Returns the wire method name, if this kind carries one
    pub fn method(&self) -> Option<&str> {
        match self {
            WireMessage::Request { method, .. } | WireMessage::Notification { method, .. } => {
                Some(method)
            }
            _ => None,
        }
    }

    /// Returns the transaction id, if this kind carries one
    pub fn id(&self) -> Option<TransactionId> {
        match self {
            WireMessage::Request { id, .. }
            | WireMessage::Response { id, .. }
            | WireMessage::CallbackInvocation { id, .. } => Some(*id),
            WireMessage::Notification { .. } => None,
        }
    }

    /// Classifies a decoded payload by field presence.
    ///
    /// Precedence: `id`+`method` → Request; `id`+`callback` →
    /// CallbackInvocation; `id`+(`result`|`error`) → Response; `method`
    /// without `id` → Notification. A response carrying both `result` and
    /// `error`, or any field of the wrong type, is unclassifiable.
    pub fn classify(value: Value) -> Result<WireMessage, ClassifyError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            _ => return Err(ClassifyError::NotAnObject),
        };

        let id = match obj.get(fields::ID) {
            None => None,
            Some(Value::Number(n)) => match n.as_u64() {
                Some(v) if v > 0 => Some(TransactionId::from_value(v)),
                _ => return Err(ClassifyError::InvalidId),
            },
            Some(_) => return Err(ClassifyError::InvalidId),
        };

        let method = match obj.get(fields::METHOD) {
            None => None,
            Some(Value::String(m)) => Some(m.clone()),
            Some(_) => return Err(ClassifyError::Unclassifiable),
        };

        let params = obj.remove(fields::PARAMS).unwrap_or(Value::Null);

        if let (Some(id), Some(method)) = (id, method.clone()) {
            let callbacks = classify_callbacks(&obj)?;
            return Ok(WireMessage::Request {
                id,
                method,
                params,
                callbacks,
            });
        }

        if let Some(id) = id {
            if let Some(cb) = obj.get(fields::CALLBACK) {
                let path = match cb {
                    Value::String(path) => CallbackPath::new(path.clone()),
                    _ => return Err(ClassifyError::Unclassifiable),
                };
                return Ok(WireMessage::CallbackInvocation {
                    id,
                    callback: path,
                    params,
                });
            }

            let result = obj.remove(fields::RESULT);
            let error = obj.get(fields::ERROR);
            return match (result, error) {
                (Some(result), None) => Ok(WireMessage::result(id, result)),
                (None, Some(Value::String(code))) => {
                    let message = match obj.get(fields::MESSAGE) {
                        None | Some(Value::Null) => None,
                        Some(Value::String(m)) => Some(m.clone()),
                        Some(_) => return Err(ClassifyError::Unclassifiable),
                    };
                    Ok(WireMessage::error(id, code.clone(), message))
                }
                _ => Err(ClassifyError::Unclassifiable),
            };
        }

        match method {
            Some(method) => Ok(WireMessage::Notification { method, params }),
            None => Err(ClassifyError::Unclassifiable),
        }
    }

    /// Renders the message into its wire object form.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        match self {
            WireMessage::Request {
                id,
                method,
                params,
                callbacks,
            } => {
                obj.insert(fields::ID.into(), Value::from(id.value()));
                obj.insert(fields::METHOD.into(), Value::String(method.clone()));
                obj.insert(fields::PARAMS.into(), params.clone());
                if !callbacks.is_empty() {
                    let paths = callbacks
                        .iter()
                        .map(|p| Value::String(p.as_str().to_string()))
                        .collect();
                    obj.insert(fields::CALLBACKS.into(), Value::Array(paths));
                }
            }
            WireMessage::Response { id, body } => {
                obj.insert(fields::ID.into(), Value::from(id.value()));
                match body {
                    ResponseBody::Result(value) => {
                        obj.insert(fields::RESULT.into(), value.clone());
                    }
                    ResponseBody::Error { code, message } => {
                        obj.insert(fields::ERROR.into(), Value::String(code.clone()));
                        if let Some(message) = message {
                            obj.insert(fields::MESSAGE.into(), Value::String(message.clone()));
                        }
                    }
                }
            }
            WireMessage::CallbackInvocation {
                id,
                callback,
                params,
            } => {
                obj.insert(fields::ID.into(), Value::from(id.value()));
                obj.insert(
                    fields::CALLBACK.into(),
                    Value::String(callback.as_str().to_string()),
                );
                obj.insert(fields::PARAMS.into(), params.clone());
            }
            WireMessage::Notification { method, params } => {
                obj.insert(fields::METHOD.into(), Value::String(method.clone()));
                obj.insert(fields::PARAMS.into(), params.clone());
            }
        }
        Value::Object(obj)
    }
}

fn classify_callbacks(obj: &Map<String, Value>) -> Result<Vec<CallbackPath>, ClassifyError> {
    match obj.get(fields::CALLBACKS) {
        None => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| match entry {
                Value::String(path) => Ok(CallbackPath::new(path.clone())),
                _ => Err(ClassifyError::Unclassifiable),
            })
            .collect(),
        Some(_) => Err(ClassifyError::Unclassifiable),
    }
}
