//! Awaitable assertion chain
//!
//! [`TestResult`] is a future resolving to the settled [`Mocks`]. Every
//! `expect_*` method returns a new link that first awaits the previous one,
//! then runs its own check. Links are cheap to clone and can be awaited
//! more than once.
//!
//! # Example
//! ```no_run
//! use handler_mocks::Mocks;
//!
//! # async fn dox() {
//! let root = Mocks::new().test(|_req, res, _next| {
//!     res.status(404).send(());
//! });
//!
//! root.expect_status(404).expect_send(()).await.unwrap();
//!
//! let err = root.expect_json(serde_json::json!({})).await.unwrap_err();
//! assert_eq!(err.to_string(), "json() call was expected, but (also?) send() was called");
//! # }
//! ```

use std::{
    error::Error as StdError,
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll}
};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use crate::{
    error::{Error, Result},
    mocks::Mocks,
    response::{ResponseMethod, TerminalAction},
    stub::IntoArgs,
    utils::str::value_to_text
};

pub use self::next::{ArgCheck, MessageCheck, NextExpectation};

pub mod next;

type Link = Shared<BoxFuture<'static, Result<Mocks>>>;

/// A pending handler invocation together with the checks chained onto it
///
/// Resolves to the [`Mocks`] of the invocation once it is complete and
/// every chained check has passed.
#[must_use = "checks only run when the TestResult is awaited"]
#[derive(Clone)]
pub struct TestResult {
    link: Link
}

impl fmt::Debug for TestResult {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TestResult(..)")
    }
}

impl Future for TestResult {
    type Output = Result<Mocks>;

    #[inline]
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.link).poll(cx)
    }
}

impl TestResult {
    /// Roots a chain at the completion of an invocation
    pub(crate) fn new(mocks: Mocks, done: BoxFuture<'static, Result<()>>) -> Self {
        Self::from_future(async move {
            done.await?;
            Ok(mocks)
        })
    }

    fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Mocks>> + Send + 'static
    {
        Self { link: fut.boxed().shared() }
    }

    /// Chains a custom check that runs after every previous link
    ///
    /// # Example
    /// ```no_run
    /// use handler_mocks::{Mocks, error::Error};
    ///
    /// # async fn dox() {
    /// Mocks::new()
    ///     .test(|_req, res, _next| {
    ///         res.set_local("seen", true).end(());
    ///     })
    ///     .expect_end(())
    ///     .expect_that(|mocks| match mocks.res.local("seen") {
    ///         Some(_) => Ok(()),
    ///         None => Err(Error::assertion("locals.seen not set")),
    ///     })
    ///     .await
    ///     .unwrap();
    /// # }
    /// ```
    pub fn expect_that<F>(&self, check: F) -> Self
    where
        F: FnOnce(&Mocks) -> Result<()> + Send + 'static
    {
        let prev = self.link.clone();
        Self::from_future(async move {
            let mocks = prev.await?;
            check(&mocks)?;
            Ok(mocks)
        })
    }

    fn expect_terminal<F>(&self, action: TerminalAction, check: F) -> Self
    where
        F: FnOnce(&Mocks) -> Result<()> + Send + 'static
    {
        self.expect_that(move |mocks| {
            ensure_exclusive(mocks, action)?;
            check(mocks)
        })
    }

    /// Expects `json(value)` as the only terminal action
    pub fn expect_json(&self, value: impl Into<Value>) -> Self {
        let expected: [Value; 1] = [value.into()];
        self.expect_terminal(TerminalAction::Json, move |mocks| {
            mocks.res.stub(ResponseMethod::Json).assert_called_with(&expected)
        })
    }

    /// Expects `jsonp(value)` as the only terminal action
    pub fn expect_jsonp(&self, value: impl Into<Value>) -> Self {
        let expected: [Value; 1] = [value.into()];
        self.expect_terminal(TerminalAction::Jsonp, move |mocks| {
            mocks.res.stub(ResponseMethod::Jsonp).assert_called_with(&expected)
        })
    }

    /// Expects `send` with exactly these arguments as the only terminal action
    pub fn expect_send(&self, args: impl IntoArgs) -> Self {
        let expected = args.into_args();
        self.expect_terminal(TerminalAction::Send, move |mocks| {
            mocks.res.stub(ResponseMethod::Send).assert_called_with_exactly(&expected)
        })
    }

    /// Expects `end` with exactly these arguments as the only terminal action
    pub fn expect_end(&self, args: impl IntoArgs) -> Self {
        let expected = args.into_args();
        self.expect_terminal(TerminalAction::End, move |mocks| {
            mocks.res.stub(ResponseMethod::End).assert_called_with_exactly(&expected)
        })
    }

    /// Expects `send_file` starting with these arguments as the only terminal action
    pub fn expect_send_file(&self, args: impl IntoArgs) -> Self {
        let expected = args.into_args();
        self.expect_terminal(TerminalAction::SendFile, move |mocks| {
            mocks.res.stub(ResponseMethod::SendFile).assert_called_with(&expected)
        })
    }

    /// Expects `download` starting with these arguments as the only terminal action
    pub fn expect_download(&self, args: impl IntoArgs) -> Self {
        let expected = args.into_args();
        self.expect_terminal(TerminalAction::Download, move |mocks| {
            mocks.res.stub(ResponseMethod::Download).assert_called_with(&expected)
        })
    }

    /// Expects `redirect` with exactly these arguments as the only terminal action
    pub fn expect_redirect(&self, args: impl IntoArgs) -> Self {
        let expected = args.into_args();
        self.expect_terminal(TerminalAction::Redirect, move |mocks| {
            mocks.res.stub(ResponseMethod::Redirect).assert_called_with_exactly(&expected)
        })
    }

    /// Expects `render` starting with these arguments as the only terminal action
    pub fn expect_render(&self, args: impl IntoArgs) -> Self {
        let expected = args.into_args();
        self.expect_terminal(TerminalAction::Render, move |mocks| {
            mocks.res.stub(ResponseMethod::Render).assert_called_with(&expected)
        })
    }

    /// Expects `send_status(code)` as the only terminal action
    pub fn expect_send_status(&self, code: u16) -> Self {
        let expected = [Value::from(code)];
        self.expect_terminal(TerminalAction::SendStatus, move |mocks| {
            mocks.res.stub(ResponseMethod::SendStatus).assert_called_with(&expected)
        })
    }

    /// Expects `content_type(type)` to have been called
    ///
    /// Does not check terminal actions.
    pub fn expect_type(&self, content_type: impl Into<String>) -> Self {
        let expected = [Value::String(content_type.into())];
        self.expect_that(move |mocks| {
            mocks.res.stub(ResponseMethod::Type).assert_called_with(&expected)
        })
    }

    /// Expects `status(code)` to have been called
    ///
    /// Does not check terminal actions.
    pub fn expect_status(&self, code: u16) -> Self {
        let expected = [Value::from(code)];
        self.expect_that(move |mocks| {
            mocks.res.stub(ResponseMethod::Status).assert_called_with(&expected)
        })
    }

    /// Expects a header set with either `set(name, value)` or `set_header(name, value)`
    ///
    /// Does not check terminal actions.
    pub fn expect_header(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        self.expect_that(move |mocks| {
            let expected = [Value::String(name), value];
            let found = [ResponseMethod::Set, ResponseMethod::SetHeader]
                .into_iter()
                .any(|method| mocks.res.stub(method).called_with_exactly(&expected));
            if found {
                Ok(())
            } else {
                Err(Error::assertion(format!(
                    "Expected header '{}' to have been set to '{}'",
                    value_to_text(&expected[0]),
                    value_to_text(&expected[1])
                )))
            }
        })
    }

    /// Expects the continuation as the only terminal action, called
    /// without an argument or with a falsy one
    pub fn expect_next(&self) -> Self {
        self.expect_next_impl(None, None)
    }

    /// Expects the continuation as the only terminal action, called with
    /// an argument meeting the expectation
    ///
    /// # Example
    /// ```no_run
    /// use handler_mocks::Mocks;
    ///
    /// # async fn dox() {
    /// Mocks::new()
    ///     .test(|_req, _res, next| next.route())
    ///     .expect_next_kind("route")
    ///     .await
    ///     .unwrap();
    /// # }
    /// ```
    pub fn expect_next_kind(&self, expected: impl Into<NextExpectation>) -> Self {
        self.expect_next_impl(Some(expected.into()), None)
    }

    /// Like [`expect_next_kind`](Self::expect_next_kind), additionally checking
    /// the argument's message with a substring, a pattern or a predicate
    ///
    /// # Example
    /// ```no_run
    /// use handler_mocks::{Mocks, assert::NextExpectation};
    ///
    /// # async fn dox() {
    /// Mocks::new()
    ///     .test(|_req, _res, next| next.error(std::io::Error::other("user 42 not found")))
    ///     .expect_next_with(NextExpectation::of::<std::io::Error>(), "not found")
    ///     .await
    ///     .unwrap();
    /// # }
    /// ```
    pub fn expect_next_with(
        &self,
        expected: impl Into<NextExpectation>,
        check: impl Into<MessageCheck>
    ) -> Self {
        self.expect_next_impl(Some(expected.into()), Some(check.into()))
    }

    /// Expects the continuation to have been called with an error of type `E`
    #[inline]
    pub fn expect_next_of<E: StdError + 'static>(&self) -> Self {
        self.expect_next_kind(NextExpectation::of::<E>())
    }

    /// Expects the continuation to have been called with this very error
    #[inline]
    pub fn expect_next_error<E: StdError + Send + Sync + 'static>(&self, err: &Arc<E>) -> Self {
        self.expect_next_kind(NextExpectation::instance(err))
    }

    /// Expects the continuation to have been called with an argument
    /// whose message equals `msg`
    #[inline]
    pub fn expect_next_message(&self, msg: impl Into<String>) -> Self {
        self.expect_next_kind(NextExpectation::message(msg))
    }

    fn expect_next_impl(&self, expected: Option<NextExpectation>, check: Option<MessageCheck>) -> Self {
        self.expect_terminal(TerminalAction::Next, move |mocks| {
            let arg = mocks.next.first_arg();
            next::validate(arg.as_ref(), expected.as_ref(), check.as_ref())
        })
    }
}

/// Fails unless `expected` is the only terminal action and was recorded once
///
/// Other actions are checked first, so a wrong action is reported by name
/// rather than as a missing call.
fn ensure_exclusive(mocks: &Mocks, expected: TerminalAction) -> Result<()> {
    let unexpected = TerminalAction::ALL
        .into_iter()
        .find(|&action| action != expected && mocks.call_count(action) != 0);
    if let Some(action) = unexpected {
        return Err(Error::exclusivity(format!(
            "{expected}() call was expected, but (also?) {action}() was called"
        )));
    }

    match mocks.call_count(expected) {
        1 => Ok(()),
        0 => Err(Error::assertion(format!("{expected}() not called as expected"))),
        _ => Err(Error::assertion(format!("{expected}() called more than once"))),
    }
}
