//! Shared helpers for the crate's unit tests

use crate::channel::Channel;
use crate::config::{ChannelConfig, ChannelRole};
use crate::dispatch::DispatchOutcome;
use crate::error::HandlerFault;
use crate::transport::{InboundEvent, Transport, TransportError};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Origin the test peer claims to send from.
pub const PEER_ORIGIN: &str = "https://peer.example";

/// Transport that records every payload it is asked to send.
#[derive(Default)]
pub struct Recorder {
    pub sent: RefCell<Vec<String>>,
}

impl Recorder {
    /// Decodes everything sent so far
    pub fn sent_values(&self) -> Vec<Value> {
        self.sent
            .borrow()
            .iter()
            .map(|payload| serde_json::from_str(payload).unwrap())
            .collect()
    }

    /// Forgets everything sent so far
    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

impl Transport for Recorder {
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        self.sent.borrow_mut().push(payload.to_string());
        Ok(())
    }
}

/// Host-role channel accepting any origin, with its recorder
pub fn host_channel() -> (Channel, Rc<Recorder>) {
    let recorder = Rc::new(Recorder::default());
    let config = ChannelConfig::new("*", ChannelRole::Host).unwrap();
    let chan = Channel::new(config, recorder.clone());
    (chan, recorder)
}

/// Host-role channel that has already completed the handshake, with the
/// construction traffic cleared away
pub fn ready_host() -> (Channel, Rc<Recorder>) {
    let (chan, recorder) = host_channel();
    make_ready(&chan);
    recorder.clear();
    (chan, recorder)
}

/// Completes the handshake by acknowledging with a pong
pub fn make_ready(chan: &Channel) {
    deliver_value(chan, serde_json::json!({"method": "__ready", "params": "pong"})).unwrap();
}

/// Delivers one structured value as an inbound event from the test peer
pub fn deliver_value(chan: &Channel, value: Value) -> Result<DispatchOutcome, HandlerFault> {
    chan.deliver(InboundEvent::new(PEER_ORIGIN, value.to_string()))
}
