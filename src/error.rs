//! Error Handling tools

use std::{
    convert::Infallible,
    fmt,
    sync::Arc,
    error::Error as StdError
};

/// Boxed error type accepted from handlers and checks
pub type BoxError = Box<
    dyn StdError
    + Send
    + Sync
>;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Describes what kind of failure rejected a chain link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An expectation was not met
    Assertion,
    /// A terminal action other than the expected one was recorded
    Exclusivity,
    /// The handler failed or its deferred value rejected
    Handler,
}

/// Generic error
///
/// The inner error is shared, so the same rejection can be observed
/// by every link of an assertion chain.
#[derive(Debug, Clone)]
pub struct Error {
    /// What kind of failure it is
    pub kind: ErrorKind,

    /// Inner error object
    inner: Arc<BoxError>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner(), f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let inner: &(dyn StdError + 'static) = self.inner();
        Some(inner)
    }
}

impl From<Infallible> for Error {
    fn from(infallible: Infallible) -> Error {
        match infallible {}
    }
}

impl From<serde_json::Error> for Error {
    #[inline]
    fn from(err: serde_json::Error) -> Error {
        Self::handler(err)
    }
}

impl Error {
    /// Creates an assertion failure with the given message
    #[inline]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::from_parts(ErrorKind::Assertion, message.into())
    }

    /// Creates a mutual exclusion failure with the given message
    #[inline]
    pub fn exclusivity(message: impl Into<String>) -> Self {
        Self::from_parts(ErrorKind::Exclusivity, message.into())
    }

    /// Wraps an error raised by the handler under test
    #[inline]
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::from_parts(ErrorKind::Handler, err)
    }

    /// Creates [`Error`] from kind and underlying error
    #[inline]
    pub fn from_parts(kind: ErrorKind, err: impl Into<BoxError>) -> Self {
        Self { kind, inner: Arc::new(err.into()) }
    }

    /// Returns a reference to the underlying error
    #[inline]
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &**self.inner
    }

    /// Attempts to downcast the underlying error to a concrete type
    ///
    /// # Example
    /// ```no_run
    /// use handler_mocks::error::Error;
    ///
    /// let err = Error::handler(std::io::Error::other("boom"));
    /// assert!(err.downcast_ref::<std::io::Error>().is_some());
    /// ```
    #[inline]
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.inner().downcast_ref::<T>()
    }

    /// Returns `true` if both errors share the same underlying error object
    #[inline]
    pub fn ptr_eq(&self, other: &Error) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Check if an expectation was not met
    #[inline]
    pub fn is_assertion(&self) -> bool {
        self.kind == ErrorKind::Assertion
    }

    /// Check if another terminal action was recorded than the expected one
    #[inline]
    pub fn is_exclusivity(&self) -> bool {
        self.kind == ErrorKind::Exclusivity
    }

    /// Check if the handler itself failed
    #[inline]
    pub fn is_handler_error(&self) -> bool {
        self.kind == ErrorKind::Handler
    }
}
