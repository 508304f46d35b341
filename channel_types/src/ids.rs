//! Unique identifiers for protocol entities

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a channel instance
///
/// A channel is one configured, bidirectional protocol instance over a
/// transport. The id never travels on the wire; it exists so that log
/// lines from several channels sharing one transport can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(Uuid);

impl ChannelId {
    /// Creates a new random channel ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a channel ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel({})", self.0)
    }
}

/// Identifier correlating one request with its eventual response
///
/// Ids are positive integers, unique per channel instance. The originating
/// side is encoded by parity (one side allocates even ids, the other odd),
/// so both peers allocate independently without collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Creates a transaction ID from its integer value
    pub fn from_value(value: u64) -> Self {
        Self(value)
    }

    /// Returns the integer value carried on the wire
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns true if the id was allocated by the even-parity side
    pub fn is_even(&self) -> bool {
        self.0 % 2 == 0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

/// Direction of a transaction relative to this side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// We received the request and owe the response
    Inbound,
    /// We sent the request and await the response
    Outbound,
}

impl Direction {
    /// Checks if this is an inbound transaction
    pub fn is_inbound(&self) -> bool {
        matches!(self, Direction::Inbound)
    }

    /// Checks if this is an outbound transaction
    pub fn is_outbound(&self) -> bool {
        matches!(self, Direction::Outbound)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}
