//! Completion detection for a single handler invocation
//!
//! A handler may finish in three ways: by calling a terminal method before
//! returning, by calling one after returning (e.g. from a spawned task), or
//! by returning a [`Deferred`] whose settlement owns completion. [`start`]
//! unifies them into one future that settles exactly once.

use std::sync::{Arc, Mutex};
use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::oneshot;
use crate::{
    error::Result,
    handler::{Completion, Deferred},
    next::Next,
    response::{MockResponse, TerminalAction},
    utils::sync::lock
};

/// Whether the handler finished before or after returning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// The handler is still running and no terminal action fired yet
    Undetermined,
    /// A terminal action fired before the handler returned
    Synchronous,
    /// The handler returned before any terminal action fired
    Asynchronous,
}

#[derive(Debug)]
struct State {
    mode: Mode,
    returned_deferred: bool,
    terminal_fired: bool,
}

/// Single-resolution result cell
///
/// Only the first [`SettleOnce::settle`] has an effect.
#[derive(Debug)]
pub(crate) struct SettleOnce {
    tx: Mutex<Option<oneshot::Sender<Result<()>>>>
}

impl SettleOnce {
    /// Creates the cell together with the receiving end
    pub(crate) fn new() -> (Self, oneshot::Receiver<Result<()>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Mutex::new(Some(tx)) }, rx)
    }

    /// Settles the cell, returns `false` if it was already settled
    pub(crate) fn settle(&self, outcome: Result<()>) -> bool {
        let Some(tx) = lock(&self.tx).take() else {
            return false;
        };
        // The receiver is gone only if nobody awaits the result anymore
        let _ = tx.send(outcome);
        true
    }
}

/// Per-invocation record of how the handler is completing
#[derive(Debug)]
struct Invocation {
    state: Mutex<State>,
    cell: SettleOnce,
}

impl Invocation {
    fn new(cell: SettleOnce) -> Self {
        Self {
            state: Mutex::new(State {
                mode: Mode::Undetermined,
                returned_deferred: false,
                terminal_fired: false,
            }),
            cell,
        }
    }

    /// Called by the stubs of every terminal action
    fn on_terminal(&self, _action: TerminalAction) {
        let should_settle = {
            let mut state = lock(&self.state);
            state.terminal_fired = true;
            match state.mode {
                Mode::Undetermined => {
                    state.mode = Mode::Synchronous;
                    false
                },
                Mode::Asynchronous => !state.returned_deferred,
                Mode::Synchronous => false,
            }
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(action = %_action, settles = should_settle, "terminal action observed");

        if should_settle {
            self.settle(Ok(()));
        }
    }

    /// Called once the handler has returned, yields the deferred value if any
    fn on_return(&self, completion: Completion) -> Option<Deferred> {
        let (deferred, outcome) = {
            let mut state = lock(&self.state);
            let finished = state.mode == Mode::Synchronous;
            if state.mode == Mode::Undetermined {
                state.mode = Mode::Asynchronous;
            }

            #[cfg(feature = "tracing")]
            tracing::trace!(
                mode = ?state.mode,
                terminal_fired = state.terminal_fired,
                "handler returned"
            );

            match completion {
                Completion::Failed(err) => (None, Some(Err(err))),
                Completion::Deferred(deferred) => {
                    state.returned_deferred = true;
                    (Some(deferred), None)
                },
                Completion::Returned if finished => (None, Some(Ok(()))),
                Completion::Returned => (None, None),
            }
        };
        if let Some(outcome) = outcome {
            self.settle(outcome);
        }
        deferred
    }

    fn settle(&self, outcome: Result<()>) {
        #[cfg(feature = "tracing")]
        let is_ok = outcome.is_ok();

        if self.cell.settle(outcome) {
            #[cfg(feature = "tracing")]
            tracing::trace!(ok = is_ok, "invocation settled");
        }
    }
}

/// Installs completion triggers on the stand-ins, runs the handler and
/// returns a future that resolves once the invocation is complete
///
/// The future stays pending if the handler never completes.
pub(crate) fn start<F>(res: &MockResponse, next: &Next, invoke: F) -> BoxFuture<'static, Result<()>>
where
    F: FnOnce() -> Completion
{
    let (cell, rx) = SettleOnce::new();
    let invocation = Arc::new(Invocation::new(cell));

    for action in TerminalAction::ALL {
        let trigger = invocation.clone();
        let hook = Arc::new(move || trigger.on_terminal(action));
        match action.response_method() {
            Some(method) => res.stub(method).on_call(hook),
            None => next.stub().on_call(hook),
        }
    }

    let deferred = invocation.on_return(invoke());

    async move {
        if let Some(deferred) = deferred {
            let outcome = deferred.into_inner().await;

            #[cfg(feature = "tracing")]
            tracing::trace!(ok = outcome.is_ok(), "deferred value settled");

            invocation.settle(outcome);
        }
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => std::future::pending().await,
        }
    }.boxed()
}
