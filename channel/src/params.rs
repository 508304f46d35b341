//! Structured parameter values
//!
//! Handlers and queries exchange a structured value that mirrors JSON with
//! one extra leaf kind: a live invocable. The marshaler extracts invocables
//! into callback paths before anything touches the wire, so a remaining
//! invocable leaf serializes as `null`, exactly as the original
//! environment's serializer treats function values.
//!
//! Maps preserve enumeration (insertion) order; the marshaler's traversal
//! order depends on it.

use serde_json::{Map, Number, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A live invocable value.
///
/// Cloning shares the underlying function; it may be called any number of
/// times with one structured argument. On the receiving side of a request,
/// callbacks are stubs that transmit a callback-invocation message instead
/// of running local code.
#[derive(Clone)]
pub struct Callback {
    inner: Rc<RefCell<dyn FnMut(Value)>>,
}

impl Callback {
    /// Wraps a function as a callback value
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut(Value) + 'static,
    {
        Self {
            inner: Rc::new(RefCell::new(f)),
        }
    }

    /// Invokes the callback with one argument
    pub fn call(&self, value: Value) {
        (self.inner.borrow_mut())(value);
    }

    /// Returns true if both handles share one underlying function
    pub fn same_as(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback(<fn>)")
    }
}

/// A structured parameter value: JSON plus invocable leaves.
#[derive(Debug, Clone)]
pub enum Params {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// JSON number
    Number(Number),
    /// Text
    String(String),
    /// Ordered list; the marshaler does not descend into lists
    List(Vec<Params>),
    /// Key-value map in insertion order
    Map(Vec<(String, Params)>),
    /// Live invocable leaf
    Callback(Callback),
}

impl Params {
    /// Creates the null value
    pub fn null() -> Self {
        Params::Null
    }

    /// Creates an empty map
    pub fn map() -> Self {
        Params::Map(Vec::new())
    }

    /// Wraps a function as a callback leaf
    pub fn callback<F>(f: F) -> Self
    where
        F: FnMut(Value) + 'static,
    {
        Params::Callback(Callback::new(f))
    }

    /// Appends a map entry, turning a non-map receiver into a fresh map
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<Params>) -> Self {
        let mut entries = match self {
            Params::Map(entries) => entries,
            _ => Vec::new(),
        };
        entries.push((key.into(), value.into()));
        Params::Map(entries)
    }

    /// Looks up a map entry by key
    pub fn get(&self, key: &str) -> Option<&Params> {
        match self {
            Params::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns the text content of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Params::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the callback of an invocable leaf
    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Params::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    /// Returns true for the null value
    pub fn is_null(&self) -> bool {
        matches!(self, Params::Null)
    }

    /// Converts a plain structured value; never produces callback leaves
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Params::Null,
            Value::Bool(b) => Params::Bool(b),
            Value::Number(n) => Params::Number(n),
            Value::String(s) => Params::String(s),
            Value::Array(items) => Params::List(items.into_iter().map(Params::from_json).collect()),
            Value::Object(fields) => Params::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Params::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Renders the value for the wire; any remaining callback leaf becomes
    /// `null`
    pub fn into_json(self) -> Value {
        match self {
            Params::Null => Value::Null,
            Params::Bool(b) => Value::Bool(b),
            Params::Number(n) => Value::Number(n),
            Params::String(s) => Value::String(s),
            Params::List(items) => Value::Array(items.into_iter().map(Params::into_json).collect()),
            Params::Map(entries) => {
                let mut fields = Map::new();
                for (key, value) in entries {
                    fields.insert(key, value.into_json());
                }
                Value::Object(fields)
            }
            Params::Callback(_) => Value::Null,
        }
    }
}

impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Params::Null, Params::Null) => true,
            (Params::Bool(a), Params::Bool(b)) => a == b,
            (Params::Number(a), Params::Number(b)) => a == b,
            (Params::String(a), Params::String(b)) => a == b,
            (Params::List(a), Params::List(b)) => a == b,
            (Params::Map(a), Params::Map(b)) => a == b,
            (Params::Callback(a), Params::Callback(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        Params::from_json(value)
    }
}

impl From<Callback> for Params {
    fn from(cb: Callback) -> Self {
        Params::Callback(cb)
    }
}

impl From<&str> for Params {
    fn from(s: &str) -> Self {
        Params::String(s.to_string())
    }
}

impl From<String> for Params {
    fn from(s: String) -> Self {
        Params::String(s)
    }
}

impl From<bool> for Params {
    fn from(b: bool) -> Self {
        Params::Bool(b)
    }
}

impl From<i64> for Params {
    fn from(n: i64) -> Self {
        Params::Number(Number::from(n))
    }
}

impl From<u64> for Params {
    fn from(n: u64) -> Self {
        Params::Number(Number::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_roundtrip() {
        let value = json!({"a": 1, "b": [true, null], "c": "x"});
        assert_eq!(Params::from_json(value.clone()).into_json(), value);
    }

    #[test]
    fn test_callback_leaf_serializes_as_null() {
        let params = Params::map().with_entry("cb", Params::callback(|_| {}));
        assert_eq!(params.into_json(), json!({"cb": null}));
    }

    #[test]
    fn test_map_preserves_insertion_order() {
        let params = Params::map()
            .with_entry("z", 1i64)
            .with_entry("a", 2i64)
            .with_entry("m", 3i64);
        match params {
            Params::Map(entries) => {
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["z", "a", "m"]);
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_callback_invocation_shares_state() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let cb = Callback::new(move |v| sink.borrow_mut().push(v));
        let clone = cb.clone();
        cb.call(json!(1));
        clone.call(json!(2));
        assert_eq!(*seen.borrow(), vec![json!(1), json!(2)]);
        assert!(cb.same_as(&clone));
    }

    #[test]
    fn test_get_on_map() {
        let params = Params::map().with_entry("k", "v");
        assert_eq!(params.get("k").and_then(Params::as_str), Some("v"));
        assert!(params.get("missing").is_none());
    }
}
