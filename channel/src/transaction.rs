//! Transaction table and transaction lifecycle
//!
//! Every outstanding request, inbound or outbound, has exactly one table
//! entry from creation until its terminal result or error is processed;
//! then it is removed. Callback invocations never terminate a transaction.

use crate::channel::ChannelCore;
use crate::error::ChannelError;
use crate::params::Callback;
use channel_types::{CallbackPath, Direction, TransactionId};
use serde_json::Value;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Success continuation of an outbound query
pub(crate) type SuccessFn = Box<dyn FnMut(Value)>;

/// Error continuation of an outbound query: `(code, message)`
pub(crate) type ErrorFn = Box<dyn FnMut(String, Option<String>)>;

/// A request we sent and are awaiting the answer to
pub(crate) struct OutboundTransaction {
    pub on_success: SuccessFn,
    pub on_error: Option<ErrorFn>,
    /// Invocables extracted from the query parameters, by declared path
    pub callbacks: HashMap<CallbackPath, Callback>,
}

/// A request the peer sent and we owe the answer to
pub(crate) struct InboundTransaction {
    /// Callback paths the peer declared as invocable
    pub declared: Vec<CallbackPath>,
    /// Suppresses automatic completion after the handler returns
    pub delay_return: bool,
}

/// One in-flight transaction
pub(crate) enum Transaction {
    Outbound(OutboundTransaction),
    Inbound(InboundTransaction),
}

impl Transaction {
    pub fn direction(&self) -> Direction {
        match self {
            Transaction::Outbound(_) => Direction::Outbound,
            Transaction::Inbound(_) => Direction::Inbound,
        }
    }
}

/// All in-flight transactions of one channel, plus the id allocator.
///
/// Ids step by 2 from the role's starting parity, so the two peers never
/// collide. There is no timeout sweep: an outbound entry with no response
/// stays here until the channel goes away.
pub(crate) struct TransactionTable {
    entries: HashMap<TransactionId, Transaction>,
    next_id: u64,
}

impl TransactionTable {
    /// Creates a table allocating ids from `first_id` upward
    pub fn new(first_id: u64) -> Self {
        Self {
            entries: HashMap::new(),
            next_id: first_id,
        }
    }

    /// Allocates the next outbound transaction id
    pub fn allocate_id(&mut self) -> TransactionId {
        let id = TransactionId::from_value(self.next_id);
        self.next_id += 2;
        id
    }

    /// Creates an entry; false if the id is already occupied
    pub fn create(&mut self, id: TransactionId, transaction: Transaction) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, transaction);
        true
    }

    /// Looks up a live entry
    pub fn lookup(&self, id: TransactionId) -> Option<&Transaction> {
        self.entries.get(&id)
    }

    /// Looks up a live entry mutably
    pub fn lookup_mut(&mut self, id: TransactionId) -> Option<&mut Transaction> {
        self.entries.get_mut(&id)
    }

    /// Removes an entry, yielding its continuations
    pub fn remove(&mut self, id: TransactionId) -> Option<Transaction> {
        self.entries.remove(&id)
    }

    /// Returns true while the entry is live
    pub fn contains(&self, id: TransactionId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of in-flight transactions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Handle to one inbound transaction, passed to the request handler.
///
/// Clones may be kept beyond the handler invocation to complete the
/// transaction later (deferred response). Every operation fails with
/// [`ChannelError::UnknownTransaction`] once the transaction has reached
/// its terminal response.
#[derive(Clone)]
pub struct RequestHandle {
    id: TransactionId,
    core: Weak<ChannelCore>,
}

impl RequestHandle {
    pub(crate) fn new(id: TransactionId, core: Weak<ChannelCore>) -> Self {
        Self { id, core }
    }

    /// The transaction this handle answers for
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Invokes a callback the peer declared, transmitting a
    /// callback-invocation message
    pub fn invoke(&self, callback: &str, value: Value) -> Result<(), ChannelError> {
        self.core()?
            .invoke_declared(self.id, &CallbackPath::new(callback), value)
    }

    /// Completes the transaction with a successful result
    pub fn complete(&self, value: Value) -> Result<(), ChannelError> {
        self.core()?.complete_inbound(self.id, value)
    }

    /// Completes the transaction with an error code and message
    pub fn error(
        &self,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), ChannelError> {
        self.core()?
            .error_inbound(self.id, code.into(), Some(message.into()))
    }

    /// Suppresses (or re-enables) automatic completion when the handler
    /// returns; only meaningful while the handler invocation is on the
    /// stack
    pub fn set_delay_return(&self, delay: bool) -> Result<(), ChannelError> {
        self.core()?.set_delay_return(self.id, delay)
    }

    /// True once a terminal response has been sent for this transaction
    pub fn is_completed(&self) -> bool {
        match self.core.upgrade() {
            Some(core) => !core.transaction_exists(self.id),
            None => true,
        }
    }

    fn core(&self) -> Result<Rc<ChannelCore>, ChannelError> {
        self.core
            .upgrade()
            .ok_or(ChannelError::UnknownTransaction(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(paths: &[&str]) -> Transaction {
        Transaction::Inbound(InboundTransaction {
            declared: paths.iter().map(|p| CallbackPath::new(*p)).collect(),
            delay_return: false,
        })
    }

    #[test]
    fn test_allocation_steps_by_two() {
        let mut table = TransactionTable::new(1);
        assert_eq!(table.allocate_id().value(), 1);
        assert_eq!(table.allocate_id().value(), 3);
        assert_eq!(table.allocate_id().value(), 5);
    }

    #[test]
    fn test_create_lookup_remove() {
        let mut table = TransactionTable::new(2);
        let id = table.allocate_id();
        assert!(table.create(id, inbound(&["cb"])));
        assert!(table.lookup(id).is_some());
        assert!(table.remove(id).is_some());
        assert!(table.lookup(id).is_none());
        assert!(table.remove(id).is_none());
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let mut table = TransactionTable::new(2);
        let id = TransactionId::from_value(4);
        assert!(table.create(id, inbound(&[])));
        assert!(!table.create(id, inbound(&[])));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_direction() {
        assert!(inbound(&[]).direction().is_inbound());
    }
}
