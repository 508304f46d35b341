//! # Channel Types
//!
//! Shared identifier types for the frame channel protocol.
//!
//! ## Philosophy
//!
//! - **Typed, not stringly-typed**: transaction ids, channel ids and
//!   callback paths are distinct types that cannot be confused
//! - **Self-allocating**: both peers allocate transaction ids without
//!   coordination, partitioned by parity

pub mod ids;
pub mod path;

pub use ids::{ChannelId, Direction, TransactionId};
pub use path::CallbackPath;
