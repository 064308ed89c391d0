//! # Handler Mocks
//!
//! > Test harness for `(req, res, next)` style request handlers: run a handler
//! > against recording stand-ins, wait until it is done and assert how it responded.
//!
//! ## Features
//! * Completion detection for synchronous handlers, deferred values and
//!   terminal calls made after the handler returned
//! * Awaitable, re-enterable assertion chains
//! * Mutual exclusion check across all terminal response actions
//! * Typed expectations for the argument passed to `next`
//! * Full [Tokio](https://tokio.rs/) compatibility
//! * Runs on stable Rust 1.80+
//!
//! ## Example
//! ```toml
//! [dev-dependencies]
//! handler-mocks = "0.1.0"
//! tokio = { version = "1", features = ["full"] }
//! ```
//! ```no_run
//! use handler_mocks::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), error::Error> {
//!     let mocks = Mocks::create(
//!         RequestOptions::new().param("name", "Carsten"),
//!         ResponseOptions::new()
//!     );
//!
//!     // Example of request handler
//!     mocks
//!         .test(|req, res, next| {
//!             match req.param("name") {
//!                 Some(name) => { res.status(200).send(format!("Hello {}", name.as_str().unwrap_or_default())); },
//!                 None => next.error(std::io::Error::other("validation failed")),
//!             }
//!         })
//!         .expect_status(200)
//!         .expect_send("Hello Carsten")
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

mod completion;
mod utils;

pub mod assert;
pub mod error;
pub mod handler;
pub mod mocks;
pub mod next;
pub mod request;
pub mod response;
pub mod stub;

pub use crate::assert::TestResult;
pub use crate::handler::{deferred, Deferred};
pub use crate::mocks::{Mocks, MocksBuilder};
pub use crate::next::{Next, NextArg};
pub use crate::request::{MockRequest, RequestOptions};
pub use crate::response::{MockResponse, ResponseOptions, TerminalAction};
