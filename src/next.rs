//! Continuation stand-in
//!
//! [`Next`] replaces the callback a handler invokes to pass control on,
//! optionally with an error or a routing token.

use std::{
    error::Error as StdError,
    fmt,
    sync::Arc
};
use serde_json::Value;
use crate::{
    stub::Stub,
    utils::str::{short_type_name, value_to_text}
};

/// A shared error passed to the continuation
pub type SharedError = Arc<
    dyn StdError
    + Send
    + Sync
>;

/// A value passed to the continuation
#[derive(Clone)]
pub enum NextArg {
    /// An error, together with the short name of its concrete type
    Error {
        /// The error object
        error: SharedError,
        /// Short name of the concrete error type, e.g. `Error`
        type_name: &'static str,
    },
    /// A string, such as the `"route"` skip token
    Text(String),
    /// Any other value
    Value(Value),
}

impl fmt::Debug for NextArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextArg::Error { error, type_name } => f
                .debug_struct("Error")
                .field("type_name", type_name)
                .field("error", error)
                .finish(),
            NextArg::Text(text) => f.debug_tuple("Text").field(text).finish(),
            NextArg::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// String conversion of the argument, errors render as `<Type>: <message>`
impl fmt::Display for NextArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextArg::Error { error, type_name } => write!(f, "{type_name}: {error}"),
            NextArg::Text(text) => f.write_str(text),
            NextArg::Value(value) => f.write_str(&value_to_text(value)),
        }
    }
}

impl NextArg {
    /// Wraps an error
    pub fn error<E: StdError + Send + Sync + 'static>(error: E) -> Self {
        Self::shared(Arc::new(error))
    }

    /// Wraps a shared error, keeping its identity
    pub fn shared<E: StdError + Send + Sync + 'static>(error: Arc<E>) -> Self {
        Self::Error {
            type_name: short_type_name(std::any::type_name::<E>()),
            error,
        }
    }

    /// The message carried by the argument: the error message for errors,
    /// the string conversion otherwise
    pub fn message(&self) -> String {
        match self {
            NextArg::Error { error, .. } => error.to_string(),
            NextArg::Text(text) => text.clone(),
            NextArg::Value(value) => value_to_text(value),
        }
    }

    /// Returns the error, if the argument is one
    #[inline]
    pub fn as_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            NextArg::Error { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }

    /// Attempts to downcast the argument to a concrete error type
    #[inline]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.as_error()?.downcast_ref::<E>()
    }

    /// Returns `true` if the argument is the very same error object
    pub fn is_same_error<E: StdError + Send + Sync + 'static>(&self, other: &Arc<E>) -> bool {
        match self {
            NextArg::Error { error, .. } => std::ptr::addr_eq(Arc::as_ptr(error), Arc::as_ptr(other)),
            _ => false,
        }
    }

    /// Returns `true` for values that do not count as an argument:
    /// `false`, `0` and empty strings
    pub fn is_falsy(&self) -> bool {
        match self {
            NextArg::Error { .. } => false,
            NextArg::Text(text) => text.is_empty(),
            NextArg::Value(value) => match value {
                Value::Null => true,
                Value::Bool(b) => !b,
                Value::Number(n) => n.as_f64() == Some(0.0),
                Value::String(s) => s.is_empty(),
                Value::Array(_) | Value::Object(_) => false,
            },
        }
    }
}

impl From<&str> for NextArg {
    #[inline]
    fn from(text: &str) -> Self {
        NextArg::Text(text.into())
    }
}

impl From<String> for NextArg {
    #[inline]
    fn from(text: String) -> Self {
        NextArg::Text(text)
    }
}

impl From<Value> for NextArg {
    #[inline]
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => NextArg::Text(text),
            other => NextArg::Value(other),
        }
    }
}

/// Continuation stand-in passed to the handler under test
///
/// Every call is recorded with its argument; clones share the record.
#[derive(Clone)]
pub struct Next {
    stub: Stub<Option<NextArg>>
}

impl fmt::Debug for Next {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next(..)")
    }
}

impl Default for Next {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Next {
    /// Creates a new continuation stand-in
    pub fn new() -> Self {
        Self { stub: Stub::new("next") }
    }

    /// Passes control on without an argument
    #[inline]
    pub fn call(&self) {
        self.stub.call(None);
    }

    /// Passes control on with an error
    #[inline]
    pub fn error<E: StdError + Send + Sync + 'static>(&self, error: E) {
        self.stub.call(Some(NextArg::error(error)));
    }

    /// Passes control on with a shared error, preserving its identity
    #[inline]
    pub fn shared_error<E: StdError + Send + Sync + 'static>(&self, error: Arc<E>) {
        self.stub.call(Some(NextArg::shared(error)));
    }

    /// Skips the remaining handlers of the current route
    #[inline]
    pub fn route(&self) {
        self.stub.call(Some(NextArg::from("route")));
    }

    /// Skips the remaining handlers of the current router
    #[inline]
    pub fn router(&self) {
        self.stub.call(Some(NextArg::from("router")));
    }

    /// Passes control on with an arbitrary argument
    ///
    /// `null` is recorded as a call without an argument.
    pub fn call_with(&self, arg: impl Into<NextArg>) {
        let arg = match arg.into() {
            NextArg::Value(Value::Null) => None,
            arg => Some(arg),
        };
        self.stub.call(arg);
    }

    /// The underlying stub
    #[inline]
    pub fn stub(&self) -> &Stub<Option<NextArg>> {
        &self.stub
    }

    /// Number of recorded calls
    #[inline]
    pub fn call_count(&self) -> usize {
        self.stub.call_count()
    }

    /// `true` if called at least once
    #[inline]
    pub fn called(&self) -> bool {
        self.stub.called()
    }

    /// Argument of the first call; `None` if not called or called without one
    #[inline]
    pub fn first_arg(&self) -> Option<NextArg> {
        self.stub.first_call().flatten()
    }

    /// Returns `true` if both values refer to the same stand-in
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.stub.ptr_eq(&other.stub)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Error as IoError;
    use serde_json::json;
    use super::*;

    #[derive(Debug)]
    struct ValidationError(&'static str);

    impl fmt::Display for ValidationError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for ValidationError {}

    #[test]
    fn it_records_calls_without_argument() {
        let next = Next::new();
        next.call();

        assert_eq!(next.call_count(), 1);
        assert!(next.first_arg().is_none());
    }

    #[test]
    fn it_records_null_as_missing_argument() {
        let next = Next::new();
        next.call_with(Value::Null);

        assert!(next.called());
        assert!(next.first_arg().is_none());
    }

    #[test]
    fn it_renders_errors_with_type_name() {
        let arg = NextArg::error(IoError::other("fail"));

        assert_eq!(arg.to_string(), "Error: fail");
        assert_eq!(arg.message(), "fail");

        let arg = NextArg::error(ValidationError("name is required"));
        assert_eq!(arg.to_string(), "ValidationError: name is required");
    }

    #[test]
    fn it_downcasts_errors() {
        let arg = NextArg::error(ValidationError("bad"));

        assert!(arg.downcast_ref::<ValidationError>().is_some());
        assert!(arg.downcast_ref::<IoError>().is_none());
        assert!(NextArg::from("route").downcast_ref::<ValidationError>().is_none());
    }

    #[test]
    fn it_compares_error_identity() {
        let error = Arc::new(ValidationError("bad"));
        let arg = NextArg::shared(error.clone());

        assert!(arg.is_same_error(&error));
        assert!(!arg.is_same_error(&Arc::new(ValidationError("bad"))));
    }

    #[test]
    fn it_classifies_falsy_values() {
        assert!(NextArg::from(json!(false)).is_falsy());
        assert!(NextArg::from(json!(0)).is_falsy());
        assert!(NextArg::from("").is_falsy());
        assert!(!NextArg::from("route").is_falsy());
        assert!(!NextArg::from(json!({ "code": 1 })).is_falsy());
        assert!(!NextArg::error(ValidationError("")).is_falsy());
    }

    #[test]
    fn it_records_route_tokens() {
        let next = Next::new();
        next.route();

        assert_eq!(next.first_arg().unwrap().message(), "route");
    }
}
