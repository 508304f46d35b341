//! String codec boundary
//!
//! The transport carries opaque text. Turning structured values into that
//! text (and back) is an injected dependency: the dispatcher only requires
//! that decoding malformed input fails with an error instead of panicking.

use serde_json::Value;
use thiserror::Error;

/// Errors from the codec seam
#[derive(Debug, Error)]
pub enum CodecError {
    /// Inbound text could not be parsed into a structured value
    #[error("failed to parse payload: {0}")]
    Parse(String),

    /// Outbound value could not be rendered as text
    #[error("failed to encode payload: {0}")]
    Encode(String),
}

/// Serialization of structured values to and from transport text
pub trait WireCodec {
    /// Renders a structured value as a transport payload
    fn encode(&self, value: &Value) -> Result<String, CodecError>;

    /// Parses a transport payload into a structured value
    fn decode(&self, payload: &str) -> Result<Value, CodecError>;
}

/// JSON text codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Creates a new JSON codec
    pub fn new() -> Self {
        Self
    }
}

impl WireCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, payload: &str) -> Result<Value, CodecError> {
        serde_json::from_str(payload).map_err(|e| CodecError::Parse(e.to_string()))
    }
}
