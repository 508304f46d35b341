//! Transport port
//!
//! The raw transport is an injected dependency: the channel only needs a
//! way to push opaque text toward the peer, and the environment feeds
//! inbound events back through [`Channel::deliver`](crate::Channel::deliver).
//! Delivery guarantees are the transport's business; the channel validates
//! nothing beyond the declared sender origin.

use thiserror::Error;

/// Errors from the transport port
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The endpoint is no longer connected to a peer
    #[error("transport endpoint is detached")]
    Detached,

    /// The transport refused the payload
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Outbound side of the transport port
pub trait Transport {
    /// Pushes one serialized payload toward the peer
    fn send(&self, payload: &str) -> Result<(), TransportError>;
}

/// One inbound transport event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Declared origin of the sender, checked against the configured peer
    /// origin before the payload is trusted
    pub origin: String,
    /// Opaque serialized payload
    pub payload: String,
}

impl InboundEvent {
    /// Creates an inbound event
    pub fn new(origin: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            payload: payload.into(),
        }
    }
}
