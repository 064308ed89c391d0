//! Recording stubs
//!
//! A [`Stub`] stands in for a single method of a mocked object.
//! It records every call together with its arguments, returns a
//! configurable value and can notify the completion engine about calls.
//!
//! # Example
//! ```no_run
//! use handler_mocks::stub::{Stub, IntoArgs};
//! use serde_json::json;
//!
//! let stub: Stub = Stub::new("send");
//! stub.call("Hello".into_args());
//!
//! assert!(stub.called());
//! assert!(stub.called_with_exactly(&[json!("Hello")]));
//! ```

use std::{fmt, sync::{Arc, Mutex}};
use serde_json::Value;
use smallvec::SmallVec;
use crate::{
    error::{Error, Result},
    utils::{str::join_args, sync::lock}
};

/// Arguments of a single recorded call
pub type Args = SmallVec<[Value; 2]>;

/// A hook that is invoked after each recorded call
pub(crate) type CallHook = Arc<
    dyn Fn()
    + Send
    + Sync
>;

/// A recording stand-in for a single method
pub struct Stub<A = Args> {
    inner: Arc<StubInner<A>>
}

struct StubInner<A> {
    name: &'static str,
    calls: Mutex<Vec<A>>,
    returns: Mutex<Value>,
    hook: Mutex<Option<CallHook>>,
}

impl<A> Clone for Stub<A> {
    #[inline]
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<A> fmt::Debug for Stub<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("name", &self.inner.name)
            .field("call_count", &lock(&self.inner.calls).len())
            .finish()
    }
}

impl<A: Clone> Stub<A> {
    /// Creates a new stub for the method with the given name
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(StubInner {
                name,
                calls: Mutex::new(Vec::new()),
                returns: Mutex::new(Value::Null),
                hook: Mutex::new(None),
            })
        }
    }

    /// Records a call and returns the configured value
    ///
    /// The call is visible to queries before the hook runs.
    pub fn call(&self, args: A) -> Value {
        lock(&self.inner.calls).push(args);
        let hook = lock(&self.inner.hook).clone();
        if let Some(hook) = hook {
            hook();
        }
        lock(&self.inner.returns).clone()
    }

    /// Configures the value returned by subsequent calls
    pub fn returns(&self, value: impl Into<Value>) -> &Self {
        *lock(&self.inner.returns) = value.into();
        self
    }

    /// Returns the value configured for this stub
    #[inline]
    pub fn returned(&self) -> Value {
        lock(&self.inner.returns).clone()
    }

    /// Installs a hook that runs after each recorded call, replacing a previous one
    pub(crate) fn on_call(&self, hook: CallHook) {
        *lock(&self.inner.hook) = Some(hook);
    }

    /// Name of the stubbed method
    #[inline]
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Number of recorded calls
    #[inline]
    pub fn call_count(&self) -> usize {
        lock(&self.inner.calls).len()
    }

    /// `true` if called at least once
    #[inline]
    pub fn called(&self) -> bool {
        self.call_count() > 0
    }

    /// `true` if never called
    #[inline]
    pub fn not_called(&self) -> bool {
        self.call_count() == 0
    }

    /// Arguments of all recorded calls in call order
    #[inline]
    pub fn calls(&self) -> Vec<A> {
        lock(&self.inner.calls).clone()
    }

    /// Arguments of the first call, if any
    #[inline]
    pub fn first_call(&self) -> Option<A> {
        lock(&self.inner.calls).first().cloned()
    }

    /// Arguments of the most recent call, if any
    #[inline]
    pub fn last_call(&self) -> Option<A> {
        lock(&self.inner.calls).last().cloned()
    }

    /// Returns `true` if both stubs record into the same storage
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Fails unless the stub was called at least once
    pub fn assert_called(&self) -> Result<()> {
        if self.called() {
            Ok(())
        } else {
            Err(Error::assertion(format!(
                "expected {}() to have been called at least once, but it was never called",
                self.name()
            )))
        }
    }
}

impl Stub<Args> {
    /// `true` if any call started with the `expected` arguments
    pub fn called_with(&self, expected: &[Value]) -> bool {
        lock(&self.inner.calls)
            .iter()
            .any(|args| args.len() >= expected.len() && args[..expected.len()] == *expected)
    }

    /// `true` if any call had exactly the `expected` arguments
    pub fn called_with_exactly(&self, expected: &[Value]) -> bool {
        lock(&self.inner.calls)
            .iter()
            .any(|args| args.as_slice() == expected)
    }

    /// Fails unless some call started with the `expected` arguments
    pub fn assert_called_with(&self, expected: &[Value]) -> Result<()> {
        if self.called_with(expected) {
            Ok(())
        } else {
            Err(self.mismatch("to have been called with arguments", expected))
        }
    }

    /// Fails unless some call had exactly the `expected` arguments
    pub fn assert_called_with_exactly(&self, expected: &[Value]) -> Result<()> {
        if self.called_with_exactly(expected) {
            Ok(())
        } else {
            Err(self.mismatch("to have been called with exact arguments", expected))
        }
    }

    fn mismatch(&self, what: &str, expected: &[Value]) -> Error {
        let calls = lock(&self.inner.calls);
        let actual = if calls.is_empty() {
            String::from("it was never called")
        } else {
            let recorded = calls
                .iter()
                .map(|args| format!("({})", join_args(args)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("it was called with {recorded}")
        };
        Error::assertion(format!(
            "expected {}() {what} ({}), but {actual}",
            self.name(),
            join_args(expected)
        ))
    }
}

/// Converts a value into an argument list of a recorded call
///
/// Implemented for `()` (no arguments), single JSON-compatible values
/// and tuples of up to four of them.
pub trait IntoArgs {
    /// Performs the conversion
    fn into_args(self) -> Args;
}

impl IntoArgs for () {
    #[inline]
    fn into_args(self) -> Args {
        Args::new()
    }
}

impl IntoArgs for Args {
    #[inline]
    fn into_args(self) -> Args {
        self
    }
}

impl IntoArgs for Vec<Value> {
    #[inline]
    fn into_args(self) -> Args {
        Args::from_vec(self)
    }
}

macro_rules! impl_into_args_single {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoArgs for $ty {
                #[inline]
                fn into_args(self) -> Args {
                    smallvec::smallvec![Value::from(self)]
                }
            }
        )*
    };
}

impl_into_args_single! {
    &str, String, Value, bool, i32, i64, u16, u32, u64, f64
}

macro_rules! impl_into_args_tuple ({ $($param:ident)* } => {
    impl<$($param: Into<Value>,)*> IntoArgs for ($($param,)*) {
        #[inline]
        #[allow(non_snake_case)]
        fn into_args(self) -> Args {
            let ($($param,)*) = self;
            smallvec::smallvec![$($param.into(),)*]
        }
    }
});

impl_into_args_tuple! { T1 }
impl_into_args_tuple! { T1 T2 }
impl_into_args_tuple! { T1 T2 T3 }
impl_into_args_tuple! { T1 T2 T3 T4 }

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use serde_json::json;
    use super::*;

    #[test]
    fn it_records_calls_in_order() {
        let stub: Stub = Stub::new("write");
        stub.call("a".into_args());
        stub.call(("b", 2).into_args());

        assert_eq!(stub.call_count(), 2);
        assert_eq!(stub.first_call().unwrap().as_slice(), &[json!("a")]);
        assert_eq!(stub.last_call().unwrap().as_slice(), &[json!("b"), json!(2)]);
    }

    #[test]
    fn it_returns_configured_value() {
        let stub: Stub = Stub::new("get");
        assert_eq!(stub.call(().into_args()), Value::Null);

        stub.returns("text/html");
        assert_eq!(stub.call(().into_args()), json!("text/html"));
    }

    #[test]
    fn it_runs_hook_after_recording() {
        let stub: Stub = Stub::new("send");
        let seen = Arc::new(AtomicUsize::new(0));
        let observed = seen.clone();
        let probe = stub.clone();

        stub.on_call(Arc::new(move || {
            observed.store(probe.call_count(), Ordering::SeqCst);
        }));
        stub.call(().into_args());

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn it_matches_argument_prefix() {
        let stub: Stub = Stub::new("render");
        stub.call(("index", json!({ "title": "Home" })).into_args());

        assert!(stub.called_with(&[json!("index")]));
        assert!(stub.called_with(&[]));
        assert!(!stub.called_with(&[json!("other")]));
        assert!(!stub.called_with_exactly(&[json!("index")]));
        assert!(stub.called_with_exactly(&[json!("index"), json!({ "title": "Home" })]));
    }

    #[test]
    fn it_distinguishes_empty_call_from_null_argument() {
        let stub: Stub = Stub::new("send");
        stub.call(().into_args());

        assert!(stub.called_with_exactly(&[]));
        assert!(!stub.called_with_exactly(&[Value::Null]));
    }

    #[test]
    fn it_reports_mismatched_arguments() {
        let stub: Stub = Stub::new("redirect");
        stub.call("/wrong/url".into_args());

        let err = stub.assert_called_with_exactly(&[json!("/other/url")]).unwrap_err();

        assert!(err.is_assertion());
        assert_eq!(
            err.to_string(),
            r#"expected redirect() to have been called with exact arguments ("/other/url"), but it was called with ("/wrong/url")"#
        );
    }

    #[test]
    fn it_reports_missing_call() {
        let stub: Stub = Stub::new("status");

        let err = stub.assert_called_with(&[json!(404)]).unwrap_err();
        assert!(err.to_string().ends_with("but it was never called"));

        let err = stub.assert_called().unwrap_err();
        assert!(err.to_string().contains("status()"));
    }

    #[test]
    fn it_shares_records_between_clones() {
        let stub: Stub = Stub::new("end");
        let cloned = stub.clone();
        cloned.call(().into_args());

        assert!(stub.ptr_eq(&cloned));
        assert!(stub.called());
    }
}
