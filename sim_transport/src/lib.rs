//! # Simulated Transport
//!
//! This crate provides an in-memory implementation of the transport port
//! connecting two channels, for testing without real frames.
//!
//! ## Purpose
//!
//! The simulated transport allows testing protocol behavior without a
//! browser environment:
//! - Runs under `cargo test`
//! - Deterministic (explicit delivery, no real asynchrony)
//! - Inspectable (queued payloads are countable)
//! - Faultable (messages can be dropped on a plan)
//!
//! ## Philosophy
//!
//! **Testability is a first-class design constraint.**
//!
//! Delivery is explicit: payloads sit in a per-direction queue until the
//! test pumps them into the receiving channel, so every interleaving a
//! test needs can be produced on purpose.
//!
//! ## Example
//!
//! ```ignore
//! let pair = FramePair::new("https://host.example", "https://guest.example");
//! let host = Channel::new(host_config, pair.end_a());
//! let guest = Channel::new(guest_config, pair.end_b());
//! pair.pump(&host, &guest)?;
//! ```

pub mod fault_injection;

pub use fault_injection::{FaultPlan, MessageFault};

use channel::{Channel, DispatchOutcome, HandlerFault, InboundEvent, Transport, TransportError};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// One direction of the link: the sender's outbox.
struct Lane {
    queue: RefCell<VecDeque<String>>,
}

impl Lane {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            queue: RefCell::new(VecDeque::new()),
        })
    }
}

/// Outbound port handed to one channel; pushes into its lane.
struct FrameEnd {
    lane: Rc<Lane>,
    connected: Rc<Cell<bool>>,
}

impl Transport for FrameEnd {
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        if !self.connected.get() {
            return Err(TransportError::Detached);
        }
        self.lane.queue.borrow_mut().push_back(payload.to_string());
        Ok(())
    }
}

/// Two linked in-memory frame endpoints.
///
/// Side A sends into the `a_to_b` lane and side B into `b_to_a`; the test
/// decides when queued payloads reach the receiving channel.
pub struct FramePair {
    origin_a: String,
    origin_b: String,
    a_to_b: Rc<Lane>,
    b_to_a: Rc<Lane>,
    connected: Rc<Cell<bool>>,
    faults: RefCell<FaultPlan>,
}

impl FramePair {
    /// Creates a connected pair with the given endpoint origins
    pub fn new(origin_a: impl Into<String>, origin_b: impl Into<String>) -> Self {
        Self {
            origin_a: origin_a.into(),
            origin_b: origin_b.into(),
            a_to_b: Lane::new(),
            b_to_a: Lane::new(),
            connected: Rc::new(Cell::new(true)),
            faults: RefCell::new(FaultPlan::new()),
        }
    }

    /// Installs a fault plan applied at delivery time
    pub fn with_fault_plan(self, plan: FaultPlan) -> Self {
        *self.faults.borrow_mut() = plan;
        self
    }

    /// Replaces the fault plan on a live pair
    pub fn set_fault_plan(&self, plan: FaultPlan) {
        *self.faults.borrow_mut() = plan;
    }

    /// Returns side A's outbound port
    pub fn end_a(&self) -> Rc<dyn Transport> {
        Rc::new(FrameEnd {
            lane: self.a_to_b.clone(),
            connected: self.connected.clone(),
        })
    }

    /// Returns side B's outbound port
    pub fn end_b(&self) -> Rc<dyn Transport> {
        Rc::new(FrameEnd {
            lane: self.b_to_a.clone(),
            connected: self.connected.clone(),
        })
    }

    /// Severs the link; subsequent sends fail with `Detached`
    pub fn disconnect(&self) {
        self.connected.set(false);
    }

    /// Payloads side A has sent that side B has not yet received
    pub fn queued_to_b(&self) -> usize {
        self.a_to_b.queue.borrow().len()
    }

    /// Payloads side B has sent that side A has not yet received
    pub fn queued_to_a(&self) -> usize {
        self.b_to_a.queue.borrow().len()
    }

    /// Delivers one queued payload into side B, if any.
    ///
    /// Returns `None` when the lane is empty or the fault plan ate the
    /// payload; the next queued payload is NOT delivered in its place.
    pub fn deliver_to_b(
        &self,
        b: &Channel,
    ) -> Option<Result<DispatchOutcome, HandlerFault>> {
        self.deliver(&self.a_to_b, &self.origin_a, b)
    }

    /// Delivers one queued payload into side A, if any
    pub fn deliver_to_a(
        &self,
        a: &Channel,
    ) -> Option<Result<DispatchOutcome, HandlerFault>> {
        self.deliver(&self.b_to_a, &self.origin_b, a)
    }

    fn deliver(
        &self,
        lane: &Lane,
        sender_origin: &str,
        receiver: &Channel,
    ) -> Option<Result<DispatchOutcome, HandlerFault>> {
        let payload = lane.queue.borrow_mut().pop_front()?;
        if self.faults.borrow_mut().should_drop(&payload) {
            return None;
        }
        Some(receiver.deliver(InboundEvent::new(sender_origin, payload)))
    }

    /// Alternates deliveries in both directions until both lanes are
    /// empty. Returns the number of payloads that reached a channel
    /// (payloads eaten by the fault plan are not counted).
    ///
    /// A notification-handler fault aborts the pump, mirroring how it
    /// would unwind through a real event loop.
    pub fn pump(&self, a: &Channel, b: &Channel) -> Result<usize, HandlerFault> {
        let mut delivered = 0;
        // Every iteration with a non-empty lane pops at least one payload
        // (fault drops included), so the loop terminates.
        while self.queued_to_a() > 0 || self.queued_to_b() > 0 {
            if let Some(result) = self.deliver_to_b(b) {
                result?;
                delivered += 1;
            }
            if let Some(result) = self.deliver_to_a(a) {
                result?;
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use channel::{ChannelConfig, ChannelRole, Params};
    use serde_json::Value;

    fn pair_with_channels() -> (FramePair, Channel, Channel) {
        let pair = FramePair::new("https://host.example", "https://guest.example");
        let host = Channel::new(
            ChannelConfig::new("https://guest.example", ChannelRole::Host).unwrap(),
            pair.end_a(),
        );
        let guest = Channel::new(
            ChannelConfig::new("https://host.example", ChannelRole::Guest).unwrap(),
            pair.end_b(),
        );
        (pair, host, guest)
    }

    #[test]
    fn test_construction_queues_ready_pings() {
        let (pair, _host, _guest) = pair_with_channels();
        assert_eq!(pair.queued_to_b(), 1);
        assert_eq!(pair.queued_to_a(), 1);
    }

    #[test]
    fn test_pump_completes_handshake() {
        let (pair, host, guest) = pair_with_channels();
        assert!(!host.is_ready());
        assert!(guest.is_ready());
        pair.pump(&host, &guest).unwrap();
        assert!(host.is_ready());
        assert!(guest.is_ready());
    }

    #[test]
    fn test_notification_crosses_link() {
        let (pair, host, guest) = pair_with_channels();
        pair.pump(&host, &guest).unwrap();

        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        guest
            .bind(
                "tick",
                move |_req: Option<&channel::RequestHandle>,
                      _params: Params|
                      -> Result<Value, channel::HandlerFault> {
                    sink.set(sink.get() + 1);
                    Ok(Value::Null)
                },
            )
            .unwrap();

        host.notify("tick", Params::null()).unwrap();
        pair.pump(&host, &guest).unwrap();
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_disconnect_detaches_both_ends() {
        let (pair, host, _guest) = pair_with_channels();
        pair.disconnect();
        let err = host.notify("tick", Params::null()).unwrap_err();
        assert!(matches!(
            err,
            channel::ChannelError::Transport(TransportError::Detached)
        ));
    }

    #[test]
    fn test_drop_next_fault_eats_one_payload() {
        let (pair, host, guest) = pair_with_channels();
        pair.pump(&host, &guest).unwrap();
        pair.set_fault_plan(FaultPlan::new().with_fault(MessageFault::DropNext { count: 1 }));

        host.notify("tick", Params::null()).unwrap();
        assert!(pair.deliver_to_b(&guest).is_none());
        assert_eq!(pair.queued_to_b(), 0);

        // the plan is spent; the next payload goes through
        host.notify("tick", Params::null()).unwrap();
        assert!(pair.deliver_to_b(&guest).is_some());
    }
}
