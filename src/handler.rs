//! Handler contract
//!
//! A handler under test is any closure taking the request, response and
//! continuation stand-ins (optionally prefixed with an error). What it
//! returns decides how the invocation completes, see [`IntoCompletion`].

use std::future::Future;
use futures_util::future::{BoxFuture, FutureExt};
use crate::{
    error::{BoxError, Error, Result},
    next::Next,
    request::MockRequest,
    response::MockResponse
};

/// How a handler finished its synchronous part
pub enum Completion {
    /// The handler returned without a deferred value
    Returned,
    /// The handler failed before returning
    Failed(Error),
    /// The handler returned a deferred computation that owns completion
    Deferred(Deferred),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Returned => f.write_str("Returned"),
            Completion::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            Completion::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Classifies a handler's return value
pub trait IntoCompletion {
    /// Performs the conversion
    fn into_completion(self) -> Completion;
}

impl IntoCompletion for () {
    #[inline]
    fn into_completion(self) -> Completion {
        Completion::Returned
    }
}

impl<T: IntoCompletion, E: Into<BoxError>> IntoCompletion for std::result::Result<T, E> {
    #[inline]
    fn into_completion(self) -> Completion {
        match self {
            Ok(value) => value.into_completion(),
            Err(err) => Completion::Failed(Error::handler(err)),
        }
    }
}

impl IntoCompletion for Deferred {
    #[inline]
    fn into_completion(self) -> Completion {
        Completion::Deferred(self)
    }
}

impl IntoCompletion for Completion {
    #[inline]
    fn into_completion(self) -> Completion {
        self
    }
}

/// Converts the output of a deferred computation into its settlement
pub trait IntoOutcome {
    /// Performs the conversion
    fn into_outcome(self) -> Result<()>;
}

impl IntoOutcome for () {
    #[inline]
    fn into_outcome(self) -> Result<()> {
        Ok(())
    }
}

impl<T, E: Into<BoxError>> IntoOutcome for std::result::Result<T, E> {
    #[inline]
    fn into_outcome(self) -> Result<()> {
        self.map(|_| ()).map_err(Error::handler)
    }
}

/// A deferred computation returned by a handler
///
/// Once returned, its settlement decides when the invocation is complete;
/// terminal calls made meanwhile are only recorded.
///
/// # Example
/// ```no_run
/// use handler_mocks::{Mocks, deferred};
///
/// # async fn dox() {
/// Mocks::new()
///     .test(|_req, res, _next| deferred(async move {
///         res.json(serde_json::json!({ "ok": true }));
///     }))
///     .expect_json(serde_json::json!({ "ok": true }))
///     .await
///     .unwrap();
/// # }
/// ```
pub struct Deferred {
    fut: BoxFuture<'static, Result<()>>
}

impl std::fmt::Debug for Deferred {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Deferred(..)")
    }
}

impl Deferred {
    /// Wraps a future whose output is `()` or a `Result`
    pub fn new<F>(fut: F) -> Self
    where
        F: Future + Send + 'static,
        F::Output: IntoOutcome
    {
        Self { fut: async move { fut.await.into_outcome() }.boxed() }
    }

    /// Consumes the wrapper, returning the boxed computation
    #[inline]
    pub(crate) fn into_inner(self) -> BoxFuture<'static, Result<()>> {
        self.fut
    }
}

/// Shorthand for [`Deferred::new`]
#[inline]
pub fn deferred<F>(fut: F) -> Deferred
where
    F: Future + Send + 'static,
    F::Output: IntoOutcome
{
    Deferred::new(fut)
}

/// Describes a handler taking the request, response and continuation stand-ins
pub trait RequestHandler {
    /// Return type of the handler
    type Output: IntoCompletion;

    /// Calls the handler
    fn call(self, req: MockRequest, res: MockResponse, next: Next) -> Self::Output;
}

/// Describes an error handler taking an error followed by the stand-ins
pub trait ErrorRequestHandler<E> {
    /// Return type of the handler
    type Output: IntoCompletion;

    /// Calls the handler
    fn call(self, err: E, req: MockRequest, res: MockResponse, next: Next) -> Self::Output;
}

impl<Func, R> RequestHandler for Func
where
    Func: FnOnce(MockRequest, MockResponse, Next) -> R,
    R: IntoCompletion
{
    type Output = R;

    #[inline]
    fn call(self, req: MockRequest, res: MockResponse, next: Next) -> Self::Output {
        (self)(req, res, next)
    }
}

impl<Func, E, R> ErrorRequestHandler<E> for Func
where
    Func: FnOnce(E, MockRequest, MockResponse, Next) -> R,
    R: IntoCompletion
{
    type Output = R;

    #[inline]
    fn call(self, err: E, req: MockRequest, res: MockResponse, next: Next) -> Self::Output {
        (self)(err, req, res, next)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Error as IoError;
    use super::*;

    #[test]
    fn it_classifies_unit_as_returned() {
        assert!(matches!(().into_completion(), Completion::Returned));
    }

    #[test]
    fn it_classifies_results() {
        let ok: std::result::Result<(), IoError> = Ok(());
        assert!(matches!(ok.into_completion(), Completion::Returned));

        let ok: std::result::Result<Deferred, IoError> = Ok(deferred(async {}));
        assert!(matches!(ok.into_completion(), Completion::Deferred(_)));

        let err: std::result::Result<(), IoError> = Err(IoError::other("boom"));
        match err.into_completion() {
            Completion::Failed(err) => {
                assert!(err.is_handler_error());
                assert_eq!(err.to_string(), "boom");
            }
            other => panic!("unexpected completion: {other:?}"),
        }
    }

    #[tokio::test]
    async fn it_settles_deferred_with_its_output() {
        let ok = deferred(async {}).into_inner().await;
        assert!(ok.is_ok());

        let err = deferred(async { Err::<(), _>(IoError::other("rejected")) })
            .into_inner()
            .await
            .unwrap_err();
        assert!(err.is_handler_error());
        assert!(err.downcast_ref::<IoError>().is_some());
    }

    #[test]
    fn it_calls_closures_as_handlers() {
        let handler = |_req: MockRequest, res: MockResponse, _next: Next| {
            res.send_status(204);
        };
        let res = MockResponse::default();
        RequestHandler::call(handler, MockRequest::default(), res.clone(), Next::new());

        assert!(res.stub(crate::response::ResponseMethod::SendStatus).called());
    }

    #[test]
    fn it_calls_closures_as_error_handlers() {
        let handler = |err: &'static str, _req: MockRequest, _res: MockResponse, next: Next| {
            next.call_with(err);
        };
        let next = Next::new();
        ErrorRequestHandler::call(handler, "boom", MockRequest::default(), MockResponse::default(), next.clone());

        assert_eq!(next.first_arg().unwrap().message(), "boom");
    }
}
