//! The two directions of a call.
//!
//! - [`Inbound`] is the handler's view of the caller's messages.
//! - [`Emitter`] is the handler's half of the outbound direction.
//! - [`CallStream`] is the caller's half of the outbound direction.
//!
//! Within one direction messages are observed in the order they were sent.
//! Nothing orders the two directions of a bidi call relative to each other.

use super::context::CallContext;
use crate::{Error, Result};
use core::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};
use futures::{Stream, StreamExt, stream::BoxStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Inbound messages of a client-streaming or bidi call.
pub struct Inbound<T> {
    ctx: CallContext,
    stream: BoxStream<'static, Result<T>>,
    finished: bool,
}

impl<T: Send + 'static> Inbound<T> {
    /// Wraps a transport stream. An `Err` item from the transport means the
    /// caller aborted the call without a clean end-of-input.
    pub fn new<S>(ctx: CallContext, stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            ctx,
            stream: stream.boxed(),
            finished: false,
        }
    }

    /// An inbound direction fed from an in-process channel.
    pub fn from_receiver(ctx: CallContext, rx: mpsc::Receiver<Result<T>>) -> Self {
        Self::new(ctx, ReceiverStream::new(rx))
    }

    /// An inbound direction that yields `messages` and then end-of-input.
    pub fn from_iter<I>(ctx: CallContext, messages: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::new(ctx, futures::stream::iter(messages.into_iter().map(Ok)))
    }
}

impl<T> Inbound<T> {
    /// Waits for the next inbound message.
    ///
    /// Returns `Ok(None)` at a clean end-of-input (and on every call after it
    /// while the call is live). Fails with the call's outcome once it has
    /// ended, and with the transport's error if the caller aborts mid-stream.
    /// An abort cancels the call, so every later `receive` fails too.
    pub async fn receive(&mut self) -> Result<Option<T>> {
        self.ctx.check()?;
        if self.finished {
            return Ok(None);
        }

        let next = tokio::select! {
            biased;
            err = self.ctx.terminated() => return Err(err),
            next = self.stream.next() => next,
        };

        match next {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(err)) => {
                tracing::debug!("Caller aborted inbound stream: {err}");
                self.ctx.cancel();
                Err(err)
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }
}

impl<T> fmt::Debug for Inbound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbound")
            .field("ctx", &self.ctx)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// The handler's sending half of a server-streaming or bidi call.
///
/// `emit` takes `&mut self`, so one direction never has two sends in flight.
pub struct Emitter<T> {
    ctx: CallContext,
    tx: mpsc::Sender<Result<T>>,
    emitted: u64,
}

impl<T> Emitter<T> {
    pub(crate) fn new(ctx: CallContext, tx: mpsc::Sender<Result<T>>) -> Self {
        Self {
            ctx,
            tx,
            emitted: 0,
        }
    }

    /// Sends one message to the caller.
    ///
    /// Fails immediately if the call is terminal. Otherwise waits for room in
    /// the outbound buffer, failing if the call becomes terminal while
    /// waiting. If the caller has gone away the call is cancelled and the
    /// emit fails with [`Error::Canceled`].
    pub async fn emit(&mut self, message: T) -> Result<()> {
        self.ctx.check()?;

        let sent = tokio::select! {
            biased;
            err = self.ctx.terminated() => return Err(err),
            sent = self.tx.send(Ok(message)) => sent,
        };

        match sent {
            Ok(()) => {
                self.emitted += 1;
                Ok(())
            }
            Err(_) => {
                self.ctx.cancel();
                Err(Error::Canceled)
            }
        }
    }

    /// Number of messages emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("ctx", &self.ctx)
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

/// The caller's view of a streaming call's outbound direction.
///
/// Yields emitted messages in order. A failed call ends with a single `Err`
/// item carrying its terminal status; a successful call simply ends. Dropping
/// the stream before the call has ended cancels it.
pub struct CallStream<T> {
    ctx: CallContext,
    inner: ReceiverStream<Result<T>>,
}

impl<T> CallStream<T> {
    pub(crate) fn new(ctx: CallContext, rx: mpsc::Receiver<Result<T>>) -> Self {
        Self {
            ctx,
            inner: ReceiverStream::new(rx),
        }
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    /// Cancels the call. Messages already buffered are still delivered; the
    /// handler's next blocking operation fails with `Canceled`.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }
}

impl<T> Stream for CallStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<T> Drop for CallStream<T> {
    fn drop(&mut self) {
        if !self.ctx.is_terminal() {
            self.ctx.cancel();
        }
    }
}

impl<T> fmt::Debug for CallStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallStream")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
