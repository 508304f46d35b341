//! Method registry
//!
//! Maps local (un-namespaced) method names to handlers. A name binds at
//! most once; unbinding is idempotent.

use crate::error::{ChannelError, HandlerFault};
use crate::params::Params;
use crate::transaction::RequestHandle;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Handler for queries and notifications bound on this side.
///
/// Queries receive `Some(handle)` and their returned value becomes the
/// response unless the handle defers or completes first. Notifications
/// receive `None` and their returned value is discarded.
pub trait MethodHandler {
    /// Handles one inbound request or notification
    fn handle(
        &mut self,
        request: Option<&RequestHandle>,
        params: Params,
    ) -> Result<Value, HandlerFault>;
}

impl<F> MethodHandler for F
where
    F: FnMut(Option<&RequestHandle>, Params) -> Result<Value, HandlerFault>,
{
    fn handle(
        &mut self,
        request: Option<&RequestHandle>,
        params: Params,
    ) -> Result<Value, HandlerFault> {
        self(request, params)
    }
}

/// Handlers are shared so the registry can stay borrowable while one runs.
pub(crate) type SharedHandler = Rc<RefCell<dyn MethodHandler>>;

/// Name → handler mapping for the methods this side serves
pub(crate) struct MethodRegistry {
    handlers: HashMap<String, SharedHandler>,
}

impl MethodRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Binds a handler to a method name
    pub fn bind(&mut self, name: &str, handler: SharedHandler) -> Result<(), ChannelError> {
        if name.is_empty() {
            return Err(ChannelError::InvalidArgument(
                "method name must not be empty".to_string(),
            ));
        }
        if self.handlers.contains_key(name) {
            return Err(ChannelError::AlreadyBound(name.to_string()));
        }
        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// Removes a binding; absent names are not an error
    pub fn unbind(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    /// Looks up the handler for a method name
    pub fn lookup(&self, name: &str) -> Option<SharedHandler> {
        self.handlers.get(name).cloned()
    }

    /// Drops every binding
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Returns the number of bound methods
    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> SharedHandler {
        Rc::new(RefCell::new(
            |_req: Option<&RequestHandle>, _params: Params| -> Result<Value, HandlerFault> {
                Ok(Value::Null)
            },
        ))
    }

    #[test]
    fn test_bind_and_lookup() {
        let mut registry = MethodRegistry::new();
        registry.bind("echo", noop()).unwrap();
        assert!(registry.lookup("echo").is_some());
        assert!(registry.lookup("other").is_none());
    }

    #[test]
    fn test_rebind_fails() {
        let mut registry = MethodRegistry::new();
        registry.bind("echo", noop()).unwrap();
        let err = registry.bind("echo", noop()).unwrap_err();
        assert!(matches!(err, ChannelError::AlreadyBound(name) if name == "echo"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = MethodRegistry::new();
        assert!(matches!(
            registry.bind("", noop()),
            Err(ChannelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unbind_is_idempotent() {
        let mut registry = MethodRegistry::new();
        registry.bind("echo", noop()).unwrap();
        assert!(registry.unbind("echo"));
        assert!(!registry.unbind("echo"));
    }

    #[test]
    fn test_rebind_after_unbind() {
        let mut registry = MethodRegistry::new();
        registry.bind("echo", noop()).unwrap();
        registry.unbind("echo");
        assert!(registry.bind("echo", noop()).is_ok());
    }
}
