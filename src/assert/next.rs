//! Validation of the argument passed to the continuation

use std::{
    error::Error as StdError,
    fmt,
    sync::Arc
};
use regex::Regex;
use crate::{
    error::{BoxError, Error, ErrorKind, Result},
    next::{NextArg, SharedError},
    utils::str::short_type_name
};

/// What the continuation is expected to have been called with
#[derive(Clone)]
pub enum NextExpectation {
    /// The very same error object
    Instance(SharedError),
    /// An argument whose message equals the string
    Message(String),
    /// An error of a concrete type
    Kind {
        /// Short name of the type, used in failure messages
        name: &'static str,
        /// Tests whether an argument is of the type
        matches: fn(&NextArg) -> bool,
    },
}

impl fmt::Debug for NextExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextExpectation::Instance(err) => f.debug_tuple("Instance").field(err).finish(),
            NextExpectation::Message(msg) => f.debug_tuple("Message").field(msg).finish(),
            NextExpectation::Kind { name, .. } => f.debug_tuple("Kind").field(name).finish(),
        }
    }
}

impl From<&str> for NextExpectation {
    #[inline]
    fn from(msg: &str) -> Self {
        Self::Message(msg.into())
    }
}

impl From<String> for NextExpectation {
    #[inline]
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

fn is_instance_of<E: StdError + 'static>(arg: &NextArg) -> bool {
    arg.downcast_ref::<E>().is_some()
}

impl NextExpectation {
    /// Expects an error of type `E`
    ///
    /// # Example
    /// ```no_run
    /// use handler_mocks::assert::NextExpectation;
    ///
    /// let expected = NextExpectation::of::<std::io::Error>();
    /// ```
    pub fn of<E: StdError + 'static>() -> Self {
        Self::Kind {
            name: short_type_name(std::any::type_name::<E>()),
            matches: is_instance_of::<E>,
        }
    }

    /// Expects the very same error object
    pub fn instance<E: StdError + Send + Sync + 'static>(err: &Arc<E>) -> Self {
        let shared: SharedError = err.clone();
        Self::Instance(shared)
    }

    /// Expects an argument whose message equals `msg`
    #[inline]
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    fn check(&self, arg: &NextArg) -> Result<()> {
        match self {
            NextExpectation::Instance(expected) => {
                let same = matches!(
                    arg,
                    NextArg::Error { error, .. } if std::ptr::addr_eq(Arc::as_ptr(error), Arc::as_ptr(expected))
                );
                if same {
                    Ok(())
                } else {
                    Err(Error::assertion(format!(
                        "expected next to have been called with the given error \"{expected}\", but got \"{arg}\""
                    )))
                }
            },
            NextExpectation::Message(expected) => {
                let msg = arg.message();
                if msg == *expected {
                    Ok(())
                } else {
                    Err(Error::assertion(format!(
                        "expected next to have been called with \"{expected}\", but got \"{msg}\""
                    )))
                }
            },
            NextExpectation::Kind { name, matches } => {
                if matches(arg) {
                    Ok(())
                } else {
                    Err(Error::assertion(format!(
                        "expected next to have been called with instance of {name}"
                    )))
                }
            },
        }
    }
}

/// Predicate over the continuation argument
pub type ArgCheck = Arc<
    dyn Fn(&NextArg) -> std::result::Result<(), BoxError>
    + Send
    + Sync
>;

/// Additional check of the continuation argument's message
#[derive(Clone)]
pub enum MessageCheck {
    /// The message contains the string
    Contains(String),
    /// The message matches the pattern
    Matches(Regex),
    /// A custom predicate, its failure becomes the assertion failure
    Predicate(ArgCheck),
}

impl fmt::Debug for MessageCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageCheck::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            MessageCheck::Matches(re) => f.debug_tuple("Matches").field(&re.as_str()).finish(),
            MessageCheck::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for MessageCheck {
    #[inline]
    fn from(s: &str) -> Self {
        Self::Contains(s.into())
    }
}

impl From<String> for MessageCheck {
    #[inline]
    fn from(s: String) -> Self {
        Self::Contains(s)
    }
}

impl From<Regex> for MessageCheck {
    #[inline]
    fn from(re: Regex) -> Self {
        Self::Matches(re)
    }
}

impl MessageCheck {
    /// Wraps a predicate over the continuation argument
    ///
    /// # Example
    /// ```no_run
    /// use handler_mocks::assert::MessageCheck;
    ///
    /// let check = MessageCheck::predicate(|arg| {
    ///     if arg.message().len() < 64 { Ok(()) } else { Err("message too long") }
    /// });
    /// ```
    pub fn predicate<F, E>(check: F) -> Self
    where
        F: Fn(&NextArg) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>
    {
        let check: ArgCheck = Arc::new(move |arg: &NextArg| -> std::result::Result<(), BoxError> {
            check(arg).map_err(Into::into)
        });
        Self::Predicate(check)
    }

    fn check(&self, arg: &NextArg) -> Result<()> {
        let msg = arg.message();
        match self {
            MessageCheck::Contains(part) if msg.contains(part.as_str()) => Ok(()),
            MessageCheck::Contains(part) => Err(Error::assertion(format!(
                "expected error message to include \"{part}\", but got \"{msg}\""
            ))),
            MessageCheck::Matches(re) if re.is_match(&msg) => Ok(()),
            MessageCheck::Matches(re) => Err(Error::assertion(format!(
                "expected error message to match /{}/, but got \"{msg}\"",
                re.as_str()
            ))),
            MessageCheck::Predicate(check) => check(arg).map_err(|err| match err.downcast::<Error>() {
                Ok(err) => *err,
                Err(err) => Error::from_parts(ErrorKind::Assertion, err),
            }),
        }
    }
}

/// Validates the first argument the continuation was called with
///
/// Without an expectation the argument must be absent or falsy.
pub(crate) fn validate(
    arg: Option<&NextArg>,
    expected: Option<&NextExpectation>,
    check: Option<&MessageCheck>
) -> Result<()> {
    let Some(expected) = expected else {
        return match arg {
            Some(arg) if !arg.is_falsy() => Err(Error::assertion(format!(
                "expected call to next() without arguments, but got \"{arg}\""
            ))),
            _ => Ok(()),
        };
    };

    let Some(arg) = arg else {
        return Err(Error::assertion(
            "expected next to have been called with any argument, but was called without"
        ));
    };

    expected.check(arg)?;
    match check {
        Some(check) => check.check(arg),
        None => Ok(()),
    }
}
