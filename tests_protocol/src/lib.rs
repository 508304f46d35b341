//! Protocol Test Utilities
//!
//! This crate provides shared utilities for end-to-end protocol tests.
//!
//! ## Test Philosophy
//!
//! - **Two real channels**: every scenario runs over a linked pair, not
//!   against internals
//! - **Deterministic delivery**: the test pumps the simulated transport,
//!   so every interleaving is explicit
//! - **Observable outcomes only**: assertions look at continuations,
//!   handlers and wire traffic, never at private state

use channel::{Channel, ChannelConfig, ChannelRole};
use serde_json::Value;
use sim_transport::FramePair;
use std::cell::RefCell;
use std::rc::Rc;

/// Origin of the host-side frame in every test
pub const HOST_ORIGIN: &str = "https://host.example";

/// Origin of the guest-side frame in every test
pub const GUEST_ORIGIN: &str = "https://guest.example";

/// Creates a linked host/guest pair with the handshake still outstanding
pub fn linked_channels() -> (FramePair, Channel, Channel) {
    let pair = FramePair::new(HOST_ORIGIN, GUEST_ORIGIN);
    let host = Channel::new(
        ChannelConfig::new(GUEST_ORIGIN, ChannelRole::Host).unwrap(),
        pair.end_a(),
    );
    let guest = Channel::new(
        ChannelConfig::new(HOST_ORIGIN, ChannelRole::Guest).unwrap(),
        pair.end_b(),
    );
    (pair, host, guest)
}

/// Creates a linked pair and completes the handshake
pub fn ready_channels() -> (FramePair, Channel, Channel) {
    let (pair, host, guest) = linked_channels();
    pair.pump(&host, &guest).unwrap();
    assert!(host.is_ready() && guest.is_ready());
    (pair, host, guest)
}

/// Collects values handed to continuations and callbacks
#[derive(Clone, Default)]
pub struct ValueSink {
    values: Rc<RefCell<Vec<Value>>>,
}

impl ValueSink {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a function that records into this sink
    pub fn recorder(&self) -> impl FnMut(Value) + 'static {
        let values = self.values.clone();
        move |value| values.borrow_mut().push(value)
    }

    /// Everything recorded so far
    pub fn values(&self) -> Vec<Value> {
        self.values.borrow().clone()
    }

    /// Number of recorded values
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    /// True if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}
