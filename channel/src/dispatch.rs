//! Inbound message dispatch
//!
//! Every inbound transport event runs the same gauntlet: origin check,
//! decode, scope strip, classification, then routing to the transaction
//! table or the method registry. A message that fails any step is dropped
//! and logged; the protocol has no NACK, so drops are invisible to both
//! peers.

use crate::channel::{Channel, ChannelCore, READY_METHOD, READY_PONG};
use crate::error::{ChannelError, HandlerFault};
use crate::marshal;
use crate::params::{Callback, Params};
use crate::transaction::{InboundTransaction, RequestHandle, Transaction};
use crate::transport::InboundEvent;
use channel_types::{CallbackPath, TransactionId};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use wire::message::fields;
use wire::{ClassifyError, ResponseBody, WireMessage};

/// Why an inbound event was dropped.
///
/// Dropped events have no observable effect: no handler runs, no table
/// entry changes, and neither peer is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Declared sender origin does not match the configured peer origin
    OriginMismatch,
    /// Payload text could not be parsed
    Parse,
    /// Payload parsed to something other than a key-value object
    NotAnObject,
    /// Method did not carry the configured namespace scope
    ScopeMismatch,
    /// Field set matches no message kind
    Unclassifiable,
    /// No handler bound for the method; the peer never gets a response
    UnboundMethod,
    /// Request id collides with an in-flight transaction
    DuplicateTransaction,
    /// Response or callback referenced an id not in the table
    UnknownTransaction,
    /// Callback path was not declared by the referenced request
    UndeclaredCallback,
    /// Message referenced a transaction of the wrong direction
    WrongDirection,
    /// Handshake message arrived while already ready
    AlreadyReady,
    /// Channel was closed
    Closed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DropReason::OriginMismatch => "origin mismatch",
            DropReason::Parse => "unparseable payload",
            DropReason::NotAnObject => "payload is not an object",
            DropReason::ScopeMismatch => "scope mismatch",
            DropReason::Unclassifiable => "unclassifiable field set",
            DropReason::UnboundMethod => "no handler bound",
            DropReason::DuplicateTransaction => "duplicate transaction id",
            DropReason::UnknownTransaction => "unknown transaction",
            DropReason::UndeclaredCallback => "undeclared callback path",
            DropReason::WrongDirection => "wrong transaction direction",
            DropReason::AlreadyReady => "already ready",
            DropReason::Closed => "channel closed",
        };
        write!(f, "{}", text)
    }
}

/// What became of one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event was routed; the environment should stop propagating it
    Consumed,
    /// The event was dropped with no observable effect
    Dropped(DropReason),
}

impl DispatchOutcome {
    /// True if the event was routed
    pub fn is_consumed(&self) -> bool {
        matches!(self, DispatchOutcome::Consumed)
    }
}

impl Channel {
    /// Routes one inbound transport event.
    ///
    /// Request-handler faults are normalized and answered over the wire.
    /// A fault from a notification handler is NOT caught: it propagates to
    /// the caller, which is whatever drives the transport loop.
    pub fn deliver(&self, event: InboundEvent) -> Result<DispatchOutcome, HandlerFault> {
        dispatch_event(&self.core, event)
    }
}

fn dropped(core: &ChannelCore, reason: DropReason) -> DispatchOutcome {
    log::debug!("{}: inbound event dropped: {}", core.id, reason);
    DispatchOutcome::Dropped(reason)
}

pub(crate) fn dispatch_event(
    core: &Rc<ChannelCore>,
    event: InboundEvent,
) -> Result<DispatchOutcome, HandlerFault> {
    if core.state.borrow().closed {
        return Ok(dropped(core, DropReason::Closed));
    }

    if !core.config.peer_origin().accepts(&event.origin) {
        return Ok(dropped(core, DropReason::OriginMismatch));
    }

    let decoded = match core.codec.decode(&event.payload) {
        Ok(value) => value,
        Err(err) => {
            log::debug!("{}: {}", core.id, err);
            return Ok(dropped(core, DropReason::Parse));
        }
    };

    let descoped = match strip_scope(core, decoded) {
        Ok(value) => value,
        Err(reason) => return Ok(dropped(core, reason)),
    };

    let message = match WireMessage::classify(descoped) {
        Ok(message) => message,
        Err(ClassifyError::NotAnObject) => return Ok(dropped(core, DropReason::NotAnObject)),
        Err(err) => {
            log::debug!("{}: {}", core.id, err);
            return Ok(dropped(core, DropReason::Unclassifiable));
        }
    };

    match message {
        WireMessage::Request {
            id,
            method,
            params,
            callbacks,
        } => Ok(route_request(core, id, method, params, callbacks)),
        WireMessage::CallbackInvocation {
            id,
            callback,
            params,
        } => Ok(route_callback(core, id, callback, params)),
        WireMessage::Response { id, body } => Ok(route_response(core, id, body)),
        WireMessage::Notification { method, params } => route_notification(core, method, params),
    }
}

/// Scope filtering happens before classification: a method-bearing message
/// must carry the configured prefix, and loses it here. Messages without a
/// method (responses, callback invocations) pass through.
fn strip_scope(core: &ChannelCore, mut value: Value) -> Result<Value, DropReason> {
    let scope = match core.config.scope() {
        Some(scope) => scope,
        None => return Ok(value),
    };
    let local = match value.get(fields::METHOD) {
        Some(Value::String(method)) => match scope.strip(method) {
            Some(local) => local.to_string(),
            None => return Err(DropReason::ScopeMismatch),
        },
        _ => return Ok(value),
    };
    if let Value::Object(obj) = &mut value {
        obj.insert(fields::METHOD.to_string(), Value::String(local));
    }
    Ok(value)
}

fn route_request(
    core: &Rc<ChannelCore>,
    id: TransactionId,
    method: String,
    params: Value,
    callbacks: Vec<CallbackPath>,
) -> DispatchOutcome {
    let handler = {
        let mut state = core.state.borrow_mut();
        let handler = match state.registry.lookup(&method) {
            Some(handler) => handler,
            // No error response: the peer treats this as permanent
            // non-response, same as a lost message.
            None => return dropped(core, DropReason::UnboundMethod),
        };
        let created = state.table.create(
            id,
            Transaction::Inbound(InboundTransaction {
                declared: callbacks.clone(),
                delay_return: false,
            }),
        );
        if !created {
            return dropped(core, DropReason::DuplicateTransaction);
        }
        handler
    };

    let handle = RequestHandle::new(id, Rc::downgrade(core));
    let mut params = Params::from_json(params);
    marshal::splice(&mut params, &callbacks, |path| make_stub(core, id, path));

    // No state borrow is held here: the handler may re-enter the facade.
    let outcome = handler.borrow_mut().handle(Some(&handle), params);

    match outcome {
        Ok(value) => {
            let auto_complete = {
                let state = core.state.borrow();
                matches!(
                    state.table.lookup(id),
                    Some(Transaction::Inbound(txn)) if !txn.delay_return
                )
            };
            if auto_complete {
                if let Err(err) = core.complete_inbound(id, value) {
                    log::warn!("{}: auto-complete of {} failed: {}", core.id, id, err);
                }
            }
        }
        Err(fault) => {
            let (code, message) = fault.normalize();
            match core.error_inbound(id, code, Some(message)) {
                Ok(()) => {}
                Err(ChannelError::UnknownTransaction(_)) => {
                    log::debug!("{}: {} already completed; fault discarded", core.id, id);
                }
                Err(err) => {
                    log::warn!("{}: error response for {} not sent: {}", core.id, id, err);
                }
            }
        }
    }

    DispatchOutcome::Consumed
}

fn make_stub(core: &Rc<ChannelCore>, id: TransactionId, path: &CallbackPath) -> Callback {
    let weak = Rc::downgrade(core);
    let path = path.clone();
    Callback::new(move |value| {
        let core = match weak.upgrade() {
            Some(core) => core,
            None => return,
        };
        if let Err(err) = core.invoke_declared(id, &path, value) {
            log::warn!("{}: callback {} on {} not sent: {}", core.id, path, id, err);
        }
    })
}

fn route_callback(
    core: &Rc<ChannelCore>,
    id: TransactionId,
    path: CallbackPath,
    params: Value,
) -> DispatchOutcome {
    let callback = {
        let state = core.state.borrow();
        match state.table.lookup(id) {
            None => return dropped(core, DropReason::UnknownTransaction),
            Some(Transaction::Inbound(_)) => return dropped(core, DropReason::WrongDirection),
            Some(Transaction::Outbound(txn)) => match txn.callbacks.get(&path) {
                None => return dropped(core, DropReason::UndeclaredCallback),
                Some(callback) => callback.clone(),
            },
        }
    };
    // The transaction stays live: more invocations or the terminal
    // response may follow.
    callback.call(params);
    DispatchOutcome::Consumed
}

fn route_response(core: &Rc<ChannelCore>, id: TransactionId, body: ResponseBody) -> DispatchOutcome {
    let removed = {
        let mut state = core.state.borrow_mut();
        let direction = match state.table.lookup(id) {
            None => return dropped(core, DropReason::UnknownTransaction),
            Some(txn) => txn.direction(),
        };
        if direction.is_inbound() {
            return dropped(core, DropReason::WrongDirection);
        }
        state.table.remove(id)
    };
    let mut txn = match removed {
        Some(Transaction::Outbound(txn)) => txn,
        _ => return dropped(core, DropReason::UnknownTransaction),
    };

    // The entry is already gone, so the continuation fires at most once
    // even if it re-enters the dispatcher.
    match body {
        ResponseBody::Result(value) => (txn.on_success)(value),
        ResponseBody::Error { code, message } => match txn.on_error.as_mut() {
            Some(on_error) => on_error(code, message),
            None => log::warn!("{}: unhandled error response for {}", core.id, id),
        },
    }
    DispatchOutcome::Consumed
}

fn route_notification(
    core: &Rc<ChannelCore>,
    method: String,
    params: Value,
) -> Result<DispatchOutcome, HandlerFault> {
    if method == READY_METHOD {
        return Ok(on_ready(core, &params));
    }

    let handler = {
        let state = core.state.borrow();
        match state.registry.lookup(&method) {
            Some(handler) => handler,
            None => return Ok(dropped(core, DropReason::UnboundMethod)),
        }
    };

    let outcome = match handler.borrow_mut().handle(None, Params::from_json(params)) {
        Ok(_) => Ok(DispatchOutcome::Consumed),
        // Notification faults are not the core's to handle.
        Err(fault) => Err(fault),
    };
    outcome
}

fn on_ready(core: &Rc<ChannelCore>, params: &Value) -> DispatchOutcome {
    let is_pong = params.as_str() == Some(READY_PONG);
    let was_ready = core.state.borrow().ready;

    // A redundant acknowledgement carries no information. A redundant
    // ping still gets a pong, so a peer that raced ahead of us completes
    // its own handshake.
    if was_ready && is_pong {
        return dropped(core, DropReason::AlreadyReady);
    }

    if !was_ready {
        let mut pending = std::mem::take(&mut core.state.borrow_mut().pending);

        // Drain order is newest-first: the queue is emptied from the
        // back. This is long-standing observable behavior; peers see
        // queued messages in reverse of the order they were issued.
        while let Some(payload) = pending.pop() {
            if let Err(err) = core.transport.send(&payload) {
                log::warn!("{}: queued payload not sent: {}", core.id, err);
            }
        }
        core.state.borrow_mut().ready = true;

        // A synchronous transport can re-enter during the flush and
        // queue more payloads; pick those up as well.
        let mut leftovers = std::mem::take(&mut core.state.borrow_mut().pending);
        while let Some(payload) = leftovers.pop() {
            if let Err(err) = core.transport.send(&payload) {
                log::warn!("{}: queued payload not sent: {}", core.id, err);
            }
        }

        log::debug!("{}: ready", core.id);
    }

    if !is_pong {
        let pong = WireMessage::notification(
            core.wire_method(READY_METHOD),
            Value::String(READY_PONG.to_string()),
        );
        if let Err(err) = core.post(&pong) {
            log::warn!("{}: readiness pong not sent: {}", core.id, err);
        }
    }
    DispatchOutcome::Consumed
}
