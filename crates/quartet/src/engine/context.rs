//! Per-call deadline and cancellation state.
//!
//! A [`CallContext`] is created when a call opens and is shared (by cheap
//! clones) between the caller-facing stream, the handler, and every inbound
//! receiver and outbound emitter of the call. It carries:
//!
//! - an optional monotonic deadline,
//! - a [`CancellationToken`] (a child of the dispatcher's shutdown token when
//!   the call was opened through a [`Dispatcher`](super::Dispatcher)),
//! - a write-once [`Outcome`].
//!
//! The outcome records how the call ended: the handler's own result once a
//! driver sees it return, or the [`Terminal`] reason that cut it short. The
//! first outcome recorded wins and never changes afterwards. Every blocking
//! engine operation races its work against [`CallContext::terminated`], so
//! handlers observe cancellation at their next `receive()`/`emit()` without
//! polling.

use super::dispatcher::InflightGuard;
use super::registry::{MethodDescriptor, Shape};
use crate::{Error, Result};
use core::{fmt, future::Future, time::Duration};
use std::sync::{Arc, OnceLock};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Why a call ended before its handler finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminal {
    /// The caller (or a failed peer) cancelled the call.
    Canceled,
    /// The deadline passed.
    DeadlineExceeded,
    /// The service cancelled the call while shutting down.
    Shutdown,
}

impl From<Terminal> for Error {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Canceled => Error::Canceled,
            Terminal::DeadlineExceeded => Error::DeadlineExceeded,
            Terminal::Shutdown => Error::ServiceShutdown,
        }
    }
}

/// How a call ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The handler returned successfully.
    Completed,
    /// The handler returned an error.
    Failed(Error),
    /// The call ended before its handler finished.
    Terminated(Terminal),
}

impl Outcome {
    fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Completed,
            Err(e) => Self::Failed(e.clone()),
        }
    }

    /// The error that operations on a call with this outcome fail with.
    /// A completed call refuses further work as `Canceled`.
    pub fn to_error(&self) -> Error {
        match self {
            Self::Completed => Error::Canceled,
            Self::Failed(e) => e.clone(),
            Self::Terminated(terminal) => (*terminal).into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

struct Shared {
    outcome: OnceLock<Outcome>,
    // Held only for its `Drop`: the call stops counting as in flight once the
    // last clone of its context is gone.
    _inflight: Option<InflightGuard>,
}

/// Deadline and cancellation handle for one call.
#[derive(Clone)]
pub struct CallContext {
    method: Option<&'static MethodDescriptor>,
    deadline: Option<Instant>,
    token: CancellationToken,
    shared: Arc<Shared>,
}

impl CallContext {
    /// A standalone call with no deadline.
    pub fn new() -> Self {
        Self::build(None, None, CancellationToken::new(), None)
    }

    /// A standalone call that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(None, Some(deadline), CancellationToken::new(), None)
    }

    /// A standalone call that expires `timeout` from now. A zero timeout
    /// produces a call that is already expired.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub(crate) fn build(
        method: Option<&'static MethodDescriptor>,
        deadline: Option<Instant>,
        token: CancellationToken,
        inflight: Option<InflightGuard>,
    ) -> Self {
        Self {
            method,
            deadline,
            token,
            shared: Arc::new(Shared {
                outcome: OnceLock::new(),
                _inflight: inflight,
            }),
        }
    }

    /// The operation this call was opened for, if it went through a
    /// dispatcher.
    pub fn method(&self) -> Option<&'static MethodDescriptor> {
        self.method
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, saturating at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Raises cancellation. Has no effect on a call that is already terminal.
    pub fn cancel(&self) {
        self.terminate(Terminal::Canceled);
    }

    fn record(&self, outcome: Outcome) -> Outcome {
        let outcome = self.shared.outcome.get_or_init(|| outcome).clone();
        self.token.cancel();
        outcome
    }

    fn terminate(&self, terminal: Terminal) -> Outcome {
        self.record(Outcome::Terminated(terminal))
    }

    /// Records the handler's result as the outcome unless the call already
    /// has one, and releases anything still blocked on the call.
    pub(crate) fn finish<T>(&self, result: &Result<T>) {
        self.record(Outcome::from_result(result));
    }

    /// How the call ended, if it has.
    ///
    /// Also detects a deadline that has passed or a parent cancellation that
    /// nobody has observed yet, and records it.
    pub fn outcome(&self) -> Option<Outcome> {
        if let Some(outcome) = self.shared.outcome.get() {
            return Some(outcome.clone());
        }
        if self.token.is_cancelled() {
            // Cancelled through the parent token without an outcome being
            // recorded first: the dispatcher is shutting down.
            return Some(self.terminate(Terminal::Shutdown));
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Some(self.terminate(Terminal::DeadlineExceeded))
            }
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// Fails with the outcome's error if the call has ended.
    pub fn check(&self) -> Result<()> {
        match self.outcome() {
            Some(outcome) => Err(outcome.to_error()),
            None => Ok(()),
        }
    }

    /// Resolves once the call ends, yielding the outcome's error.
    pub async fn terminated(&self) -> Error {
        if let Some(outcome) = self.outcome() {
            return outcome.to_error();
        }

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => {}
                    () = sleep_until(deadline) => {
                        self.terminate(Terminal::DeadlineExceeded);
                    }
                }
            }
            None => self.token.cancelled().await,
        }

        self.outcome()
            .map_or(Error::Canceled, |outcome| outcome.to_error())
    }

    /// Runs `fut` until it completes or the call becomes terminal, whichever
    /// comes first. On termination `fut` is dropped and its result discarded.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output> {
        self.check()?;
        tokio::select! {
            biased;
            err = self.terminated() => Err(err),
            out = fut => Ok(out),
        }
    }

    /// Rejects contexts opened for an operation bound to another shape.
    pub(crate) fn ensure_shape(&self, shape: Shape) -> Result<()> {
        match self.method {
            Some(method) if method.shape != shape => {
                Err(Error::unimplemented(format!("{method} as {shape}")))
            }
            _ => Ok(()),
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("method", &self.method.map(|m| m.to_string()))
            .field("deadline", &self.deadline)
            .field("outcome", &self.shared.outcome.get())
            .finish()
    }
}
