//! Invocation context holding the stand-ins of one handler under test

use std::fmt::{Debug, Formatter};
use crate::{
    assert::TestResult,
    completion,
    handler::{ErrorRequestHandler, IntoCompletion, RequestHandler},
    next::Next,
    request::{MockRequest, RequestOptions},
    response::{MockResponse, ResponseOptions, TerminalAction}
};

/// Request, response and continuation stand-ins for a single handler invocation
///
/// The fields are cheap handles: clones record into the same storage,
/// so a handler can move them into spawned tasks.
///
/// # Example
/// ```no_run
/// use handler_mocks::{Mocks, RequestOptions, ResponseOptions};
///
/// # async fn dox() {
/// let mocks = Mocks::create(
///     RequestOptions::new().param("name", "Carsten"),
///     ResponseOptions::new()
/// );
///
/// mocks
///     .test(|req, res, _next| {
///         let name = req.param("name").unwrap_or_default();
///         res.status(200).send(format!("Hello {}", name.as_str().unwrap_or_default()));
///     })
///     .expect_status(200)
///     .expect_send("Hello Carsten")
///     .await
///     .unwrap();
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mocks {
    /// Request stand-in
    pub req: MockRequest,
    /// Response stand-in
    pub res: MockResponse,
    /// Continuation stand-in
    pub next: Next,
}

impl Mocks {
    /// Creates stand-ins with default contents
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates stand-ins with the given overrides merged into the defaults
    pub fn create(req: RequestOptions, res: ResponseOptions) -> Self {
        Self {
            req: MockRequest::new(req),
            res: MockResponse::new(res),
            next: Next::new(),
        }
    }

    /// Creates a [`MocksBuilder`]
    #[inline]
    pub fn builder() -> MocksBuilder {
        MocksBuilder::new()
    }

    /// Runs a request handler against the stand-ins
    ///
    /// The handler is invoked right away; the returned [`TestResult`]
    /// resolves once the invocation is complete.
    pub fn test<F, R>(&self, handler: F) -> TestResult
    where
        F: FnOnce(MockRequest, MockResponse, Next) -> R,
        R: IntoCompletion
    {
        let (req, res, next) = (self.req.clone(), self.res.clone(), self.next.clone());
        let done = completion::start(&self.res, &self.next, move || {
            RequestHandler::call(handler, req, res, next).into_completion()
        });
        TestResult::new(self.clone(), done)
    }

    /// Runs an error handler against the stand-ins with a pre-supplied error
    pub fn test_error<F, E, R>(&self, handler: F, err: E) -> TestResult
    where
        F: FnOnce(E, MockRequest, MockResponse, Next) -> R,
        R: IntoCompletion
    {
        let (req, res, next) = (self.req.clone(), self.res.clone(), self.next.clone());
        let done = completion::start(&self.res, &self.next, move || {
            ErrorRequestHandler::call(handler, err, req, res, next).into_completion()
        });
        TestResult::new(self.clone(), done)
    }

    /// Number of recorded calls of a terminal action
    pub fn call_count(&self, action: TerminalAction) -> usize {
        match action.response_method() {
            Some(method) => self.res.stub(method).call_count(),
            None => self.next.call_count(),
        }
    }

    /// Returns `true` if both contexts hold the same stand-ins
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.req.ptr_eq(&other.req)
            && self.res.ptr_eq(&other.res)
            && self.next.ptr_eq(&other.next)
    }
}

/// Builder for [`Mocks`]
///
/// # Example
/// ```no_run
/// use handler_mocks::Mocks;
///
/// let mocks = Mocks::builder()
///     .configure_request(|req| req.url("/users?page=2").body(serde_json::json!({ "name": "a" })))
///     .configure_response(|res| res.local("user", "admin"))
///     .build();
///
/// assert_eq!(mocks.req.query_value("page").unwrap(), "2");
/// ```
#[derive(Default)]
pub struct MocksBuilder {
    req: RequestOptions,
    res: ResponseOptions,
}

impl Debug for MocksBuilder {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MocksBuilder(...)").finish()
    }
}

impl MocksBuilder {
    /// Creates a new [`MocksBuilder`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the request overrides
    pub fn with_request(mut self, req: RequestOptions) -> Self {
        self.req = req;
        self
    }

    /// Replaces the response overrides
    pub fn with_response(mut self, res: ResponseOptions) -> Self {
        self.res = res;
        self
    }

    /// Adjusts the request overrides
    pub fn configure_request<F>(mut self, config: F) -> Self
    where
        F: FnOnce(RequestOptions) -> RequestOptions
    {
        self.req = config(self.req);
        self
    }

    /// Adjusts the response overrides
    pub fn configure_response<F>(mut self, config: F) -> Self
    where
        F: FnOnce(ResponseOptions) -> ResponseOptions
    {
        self.res = config(self.res);
        self
    }

    /// Builds the stand-ins
    pub fn build(self) -> Mocks {
        Mocks::create(self.req, self.res)
    }
}
