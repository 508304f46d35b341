//! Channel facade and outbound plumbing
//!
//! A [`Channel`] owns all per-instance state (transaction table, method
//! registry, pending outbound queue) and exposes the four operations local
//! code uses: `bind`, `unbind`, `query`, `notify`. Inbound transport events
//! enter through [`Channel::deliver`].

use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::marshal;
use crate::params::{Callback, Params};
use crate::registry::{MethodHandler, MethodRegistry};
use crate::transaction::{
    ErrorFn, OutboundTransaction, SuccessFn, Transaction, TransactionTable,
};
use crate::transport::Transport;
use channel_types::{CallbackPath, ChannelId, TransactionId};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wire::{JsonCodec, WireCodec, WireMessage};

/// Handshake method name; never reaches the registry.
pub(crate) const READY_METHOD: &str = "__ready";
/// Handshake payload opening the exchange.
pub(crate) const READY_PING: &str = "ping";
/// Handshake payload acknowledging a ping.
pub(crate) const READY_PONG: &str = "pong";

/// Mutable per-channel state, touched only inside one facade call or one
/// inbound event.
pub(crate) struct State {
    pub ready: bool,
    pub closed: bool,
    /// Encoded payloads awaiting the handshake; drained LIFO (see the
    /// drain site in `dispatch`)
    pub pending: Vec<String>,
    pub table: TransactionTable,
    pub registry: MethodRegistry,
}

/// Shared interior of a channel. Immutable collaborators (config, codec,
/// transport) sit beside the `RefCell` so sending never requires a state
/// borrow.
pub(crate) struct ChannelCore {
    pub id: ChannelId,
    pub config: ChannelConfig,
    pub codec: Box<dyn WireCodec>,
    pub transport: Rc<dyn Transport>,
    pub state: RefCell<State>,
}

impl ChannelCore {
    /// Applies the configured scope to a local method name
    pub fn wire_method(&self, method: &str) -> String {
        match self.config.scope() {
            Some(scope) => scope.apply(method),
            None => method.to_string(),
        }
    }

    fn encode(&self, message: &WireMessage) -> Result<String, ChannelError> {
        Ok(self.codec.encode(&message.to_value())?)
    }

    /// Sends immediately, bypassing the readiness queue. Only the
    /// handshake ping uses this.
    pub fn send_now(&self, message: &WireMessage) -> Result<(), ChannelError> {
        let payload = self.encode(message)?;
        self.transport.send(&payload)?;
        Ok(())
    }

    /// Sends, or queues while the handshake is still outstanding
    pub fn post(&self, message: &WireMessage) -> Result<(), ChannelError> {
        let payload = self.encode(message)?;
        {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return Err(ChannelError::Closed);
            }
            if !state.ready {
                state.pending.push(payload);
                return Ok(());
            }
        }
        self.transport.send(&payload)?;
        Ok(())
    }

    /// Guard shared by the two terminal operations: validates the entry
    /// and removes it from the table before anything is transmitted, so a
    /// re-entrant call cannot double-terminate.
    fn finish_inbound(&self, id: TransactionId) -> Result<(), ChannelError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(ChannelError::Closed);
        }
        let direction = match state.table.lookup(id) {
            None => return Err(ChannelError::UnknownTransaction(id)),
            Some(txn) => txn.direction(),
        };
        if direction.is_outbound() {
            return Err(ChannelError::WrongDirection(id));
        }
        state.table.remove(id);
        Ok(())
    }

    pub fn complete_inbound(&self, id: TransactionId, value: Value) -> Result<(), ChannelError> {
        self.finish_inbound(id)?;
        self.post(&WireMessage::result(id, value))
    }

    pub fn error_inbound(
        &self,
        id: TransactionId,
        code: String,
        message: Option<String>,
    ) -> Result<(), ChannelError> {
        self.finish_inbound(id)?;
        self.post(&WireMessage::error(id, code, message))
    }

    /// Transmits a callback invocation for a declared path of an inbound
    /// transaction
    pub fn invoke_declared(
        &self,
        id: TransactionId,
        path: &CallbackPath,
        value: Value,
    ) -> Result<(), ChannelError> {
        {
            let state = self.state.borrow();
            if state.closed {
                return Err(ChannelError::Closed);
            }
            match state.table.lookup(id) {
                None => return Err(ChannelError::UnknownTransaction(id)),
                Some(Transaction::Inbound(txn)) => {
                    if !txn.declared.contains(path) {
                        return Err(ChannelError::InvalidCallback {
                            id,
                            path: path.clone(),
                        });
                    }
                }
                Some(Transaction::Outbound(_)) => {
                    return Err(ChannelError::WrongDirection(id));
                }
            }
        }
        self.post(&WireMessage::callback(id, path.clone(), value))
    }

    pub fn set_delay_return(&self, id: TransactionId, delay: bool) -> Result<(), ChannelError> {
        let mut state = self.state.borrow_mut();
        match state.table.lookup_mut(id) {
            Some(Transaction::Inbound(txn)) => {
                txn.delay_return = delay;
                Ok(())
            }
            Some(Transaction::Outbound(_)) => Err(ChannelError::WrongDirection(id)),
            None => Err(ChannelError::UnknownTransaction(id)),
        }
    }

    pub fn transaction_exists(&self, id: TransactionId) -> bool {
        self.state.borrow().table.contains(id)
    }
}

/// A query under construction.
///
/// `method` and a success continuation are required; parameters and the
/// error continuation are optional.
pub struct Query {
    pub(crate) method: String,
    pub(crate) params: Params,
    pub(crate) on_success: Option<SuccessFn>,
    pub(crate) on_error: Option<ErrorFn>,
}

impl Query {
    /// Starts building a query for a method
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Params::Null,
            on_success: None,
            on_error: None,
        }
    }

    /// Sets the query parameters; invocable leaves become progress
    /// callbacks the peer can invoke
    pub fn with_params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }

    /// Sets the continuation for a successful response
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnMut(Value) + 'static,
    {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Sets the continuation for an error response
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(String, Option<String>) + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// One configured, bidirectional protocol instance over a transport.
pub struct Channel {
    pub(crate) core: Rc<ChannelCore>,
}

impl Channel {
    /// Creates a channel with the JSON codec and starts the readiness
    /// handshake
    pub fn new(config: ChannelConfig, transport: Rc<dyn Transport>) -> Self {
        Self::with_codec(config, transport, JsonCodec::new())
    }

    /// Creates a channel with an explicit codec implementation
    pub fn with_codec<C>(config: ChannelConfig, transport: Rc<dyn Transport>, codec: C) -> Self
    where
        C: WireCodec + 'static,
    {
        let first_id = config.role().first_transaction_id();
        let starts_ready = config.role().starts_ready();
        let core = Rc::new(ChannelCore {
            id: ChannelId::new(),
            config,
            codec: Box::new(codec),
            transport,
            state: RefCell::new(State {
                ready: false,
                closed: false,
                pending: Vec::new(),
                table: TransactionTable::new(first_id),
                registry: MethodRegistry::new(),
            }),
        });

        // Handshake ordering: send the ping first, then arm the readiness
        // flag, then wait. The ping bypasses the queue because the flag is
        // not armed yet.
        let ping = WireMessage::notification(
            core.wire_method(READY_METHOD),
            Value::String(READY_PING.to_string()),
        );
        if let Err(err) = core.send_now(&ping) {
            log::warn!("{}: readiness ping not sent: {}", core.id, err);
        }
        core.state.borrow_mut().ready = starts_ready;
        log::debug!(
            "{}: constructed ({}, ready={})",
            core.id,
            core.config.peer_origin(),
            starts_ready
        );

        Channel { core }
    }

    /// Returns this instance's diagnostic id
    pub fn id(&self) -> ChannelId {
        self.core.id
    }

    /// Binds a handler to a local method name
    pub fn bind<H>(&self, name: &str, handler: H) -> Result<(), ChannelError>
    where
        H: MethodHandler + 'static,
    {
        let mut state = self.core.state.borrow_mut();
        if state.closed {
            return Err(ChannelError::Closed);
        }
        state.registry.bind(name, Rc::new(RefCell::new(handler)))
    }

    /// Removes a binding; returns whether one existed
    pub fn unbind(&self, name: &str) -> bool {
        let mut state = self.core.state.borrow_mut();
        if state.closed {
            return false;
        }
        state.registry.unbind(name)
    }

    /// Issues a query: marshals callbacks, records the outbound
    /// transaction and sends (or queues) the request. Returns the
    /// allocated transaction id.
    pub fn query(&self, query: Query) -> Result<TransactionId, ChannelError> {
        let Query {
            method,
            mut params,
            on_success,
            on_error,
        } = query;
        if method.is_empty() {
            return Err(ChannelError::InvalidArgument(
                "query method must not be empty".to_string(),
            ));
        }
        let on_success = on_success.ok_or_else(|| {
            ChannelError::InvalidArgument("query requires a success continuation".to_string())
        })?;

        let extracted = marshal::extract(&mut params);
        let declared: Vec<CallbackPath> = extracted.iter().map(|(path, _)| path.clone()).collect();
        let callbacks: HashMap<CallbackPath, Callback> = extracted.into_iter().collect();

        let id = {
            let mut state = self.core.state.borrow_mut();
            if state.closed {
                return Err(ChannelError::Closed);
            }
            let id = state.table.allocate_id();
            state.table.create(
                id,
                Transaction::Outbound(OutboundTransaction {
                    on_success,
                    on_error,
                    callbacks,
                }),
            );
            id
        };

        let message = WireMessage::request(
            id,
            self.core.wire_method(&method),
            params.into_json(),
            declared,
        );
        if let Err(err) = self.core.post(&message) {
            self.core.state.borrow_mut().table.remove(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Sends (or queues) a fire-and-forget notification
    pub fn notify(&self, method: &str, params: Params) -> Result<(), ChannelError> {
        if method.is_empty() {
            return Err(ChannelError::InvalidArgument(
                "notification method must not be empty".to_string(),
            ));
        }
        let message =
            WireMessage::notification(self.core.wire_method(method), params.into_json());
        self.core.post(&message)
    }

    /// Tears the channel down: clears the registry, table and queue.
    /// Subsequent facade calls fail and subsequent events are dropped.
    pub fn close(&self) {
        let mut state = self.core.state.borrow_mut();
        state.closed = true;
        state.pending.clear();
        state.table.clear();
        state.registry.clear();
        log::debug!("{}: closed", self.core.id);
    }

    /// True once the readiness handshake has completed on this side
    pub fn is_ready(&self) -> bool {
        self.core.state.borrow().ready
    }

    /// Number of encoded payloads waiting for the handshake
    pub fn pending_messages(&self) -> usize {
        self.core.state.borrow().pending.len()
    }

    /// Number of in-flight transactions, inbound and outbound
    pub fn open_transactions(&self) -> usize {
        self.core.state.borrow().table.len()
    }

    /// Number of bound methods
    pub fn bound_methods(&self) -> usize {
        self.core.state.borrow().registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelRole;
    use crate::error::{ChannelError, HandlerFault};
    use crate::test_util::{host_channel, ready_host, Recorder};
    use serde_json::json;

    type HandlerResult = Result<Value, HandlerFault>;

    fn echo_handler(
        _req: Option<&crate::transaction::RequestHandle>,
        params: Params,
    ) -> HandlerResult {
        Ok(params.into_json())
    }

    #[test]
    fn test_construction_sends_ready_ping_before_queuing_starts() {
        let (chan, recorder) = host_channel();
        assert_eq!(
            recorder.sent_values(),
            vec![json!({"method": "__ready", "params": "ping"})]
        );
        // the ping went out even though the channel is not ready
        assert!(!chan.is_ready());
        assert_eq!(chan.pending_messages(), 0);
    }

    #[test]
    fn test_query_requires_method_and_success() {
        let (chan, _recorder) = ready_host();
        assert!(matches!(
            chan.query(Query::new("").on_success(|_| {})),
            Err(ChannelError::InvalidArgument(_))
        ));
        assert!(matches!(
            chan.query(Query::new("peer.work")),
            Err(ChannelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_notify_requires_method() {
        let (chan, _recorder) = ready_host();
        assert!(matches!(
            chan.notify("", Params::null()),
            Err(ChannelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_host_allocates_even_ids_stepping_by_two() {
        let (chan, _recorder) = ready_host();
        let first = chan.query(Query::new("a").on_success(|_| {})).unwrap();
        let second = chan.query(Query::new("b").on_success(|_| {})).unwrap();
        assert_eq!(first.value(), 2);
        assert_eq!(second.value(), 4);
    }

    #[test]
    fn test_guest_allocates_odd_ids() {
        let recorder = Rc::new(Recorder::default());
        let config = crate::config::ChannelConfig::new("*", ChannelRole::Guest).unwrap();
        let chan = Channel::new(config, recorder.clone());
        let first = chan.query(Query::new("a").on_success(|_| {})).unwrap();
        let second = chan.query(Query::new("b").on_success(|_| {})).unwrap();
        assert_eq!(first.value(), 1);
        assert_eq!(second.value(), 3);
    }

    #[test]
    fn test_pre_ready_traffic_is_queued_not_sent() {
        let (chan, recorder) = host_channel();
        recorder.clear();

        chan.notify("tick", Params::null()).unwrap();
        chan.query(Query::new("peer.work").on_success(|_| {})).unwrap();

        assert!(recorder.sent_values().is_empty());
        assert_eq!(chan.pending_messages(), 2);
        // the outbound transaction is recorded even while queued
        assert_eq!(chan.open_transactions(), 1);
    }

    #[test]
    fn test_guest_sends_immediately() {
        let recorder = Rc::new(Recorder::default());
        let config = crate::config::ChannelConfig::new("*", ChannelRole::Guest).unwrap();
        let chan = Channel::new(config, recorder.clone());
        recorder.clear();

        chan.notify("tick", Params::null()).unwrap();
        assert_eq!(chan.pending_messages(), 0);
        assert_eq!(
            recorder.sent_values(),
            vec![json!({"method": "tick", "params": null})]
        );
    }

    #[test]
    fn test_bind_rejects_rebinding() {
        let (chan, _recorder) = ready_host();
        chan.bind("echo", echo_handler).unwrap();
        assert!(matches!(
            chan.bind("echo", echo_handler),
            Err(ChannelError::AlreadyBound(name)) if name == "echo"
        ));
    }

    #[test]
    fn test_unbind_is_idempotent_and_reports() {
        let (chan, _recorder) = ready_host();
        chan.bind("echo", echo_handler).unwrap();
        assert!(chan.unbind("echo"));
        assert!(!chan.unbind("echo"));
        assert_eq!(chan.bound_methods(), 0);
    }

    #[test]
    fn test_close_clears_state_and_fails_operations() {
        let (chan, _recorder) = host_channel();
        chan.bind("echo", echo_handler).unwrap();
        chan.notify("tick", Params::null()).unwrap();
        chan.query(Query::new("peer.work").on_success(|_| {})).unwrap();

        chan.close();
        assert_eq!(chan.pending_messages(), 0);
        assert_eq!(chan.open_transactions(), 0);
        assert_eq!(chan.bound_methods(), 0);

        assert!(matches!(
            chan.notify("tick", Params::null()),
            Err(ChannelError::Closed)
        ));
        assert!(matches!(
            chan.query(Query::new("peer.work").on_success(|_| {})),
            Err(ChannelError::Closed)
        ));
        assert!(matches!(
            chan.bind("again", echo_handler),
            Err(ChannelError::Closed)
        ));
    }

    #[test]
    fn test_query_params_are_marshaled() {
        let (chan, recorder) = ready_host();
        chan.query(
            Query::new("peer.work")
                .with_params(
                    Params::map()
                        .with_entry("plain", "value")
                        .with_entry(
                            "nested",
                            Params::map().with_entry("cb", Params::callback(|_| {})),
                        ),
                )
                .on_success(|_| {}),
        )
        .unwrap();

        assert_eq!(
            recorder.sent_values(),
            vec![json!({
                "id": 2,
                "method": "peer.work",
                "params": {"plain": "value", "nested": {}},
                "callbacks": ["nested/cb"],
            })]
        );
    }
}
