//! # Frame Channel
//!
//! This crate implements the transaction/dispatch engine of the frame
//! channel protocol: correlated request/response pairs ("queries"),
//! fire-and-forget notifications, mid-flight progress callbacks, deferred
//! responses, structured error reporting, method namespacing and the
//! readiness handshake.
//!
//! ## Philosophy
//!
//! - **Messages, not shared memory**: the two sides exchange only
//!   serialized text through an injected transport port
//! - **Explicit state, no globals**: every table lives inside the channel
//!   instance that owns it
//! - **Single-threaded, event-driven**: all state is touched inside one
//!   synchronous facade call or one inbound event; handlers may re-enter
//!   the facade freely
//! - **Faults are values**: a request handler reports failure through its
//!   `Result`, and the fault is normalized onto the wire instead of
//!   unwinding through the dispatcher
//!
//! ## Usage
//!
//! ```ignore
//! let config = ChannelConfig::new("https://app.example.com", ChannelRole::Host)?;
//! let chan = Channel::new(config, transport);
//!
//! chan.bind("echo", |_req, params: Params| Ok(params.into_json()))?;
//!
//! chan.query(
//!     Query::new("peer.method")
//!         .with_params(Params::map().with_entry("x", 1))
//!         .on_success(|result| println!("{result}")),
//! )?;
//! ```

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod marshal;
pub mod params;
pub mod registry;
pub mod transaction;
pub mod transport;

#[cfg(test)]
mod test_util;

pub use channel::{Channel, Query};
pub use config::{ChannelConfig, ChannelRole, NamespaceScope, PeerOrigin};
pub use dispatch::{DispatchOutcome, DropReason};
pub use error::{ChannelError, ConfigError, HandlerFault};
pub use params::{Callback, Params};
pub use registry::MethodHandler;
pub use transaction::RequestHandle;
pub use transport::{InboundEvent, Transport, TransportError};
