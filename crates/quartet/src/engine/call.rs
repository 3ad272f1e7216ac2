//! Drivers for the four interaction shapes.
//!
//! | Shape           | Inbound        | Outbound       | Concurrency                       |
//! |-----------------|----------------|----------------|-----------------------------------|
//! | `unary`         | one request    | one response   | handler awaited under the guard   |
//! | `server_stream` | one request    | [`Emitter`]    | handler spawned, caller streams   |
//! | `client_stream` | [`Inbound`]    | one response   | handler awaited under the guard   |
//! | `bidi_stream`   | [`Inbound`]    | [`Emitter`]    | handler spawned, caller streams   |
//!
//! Every driver runs the handler under [`CallContext::guard`], so a deadline
//! or cancellation ends the call even if the handler never looks at its
//! context. Streaming drivers deliver a handler error (or the terminal
//! outcome) as the last item of the [`CallStream`]; messages already emitted
//! are not retracted.

use super::context::CallContext;
use super::registry::Shape;
use super::stream::{CallStream, Emitter, Inbound};
use crate::Result;
use core::future::Future;
use tokio::sync::mpsc;

/// One request in, one response (or error) out.
///
/// If the call becomes terminal before the handler finishes, the handler's
/// future is dropped and the terminal outcome is returned instead.
pub async fn unary<Req, Resp, H, Fut>(ctx: CallContext, request: Req, handler: H) -> Result<Resp>
where
    H: FnOnce(CallContext, Req) -> Fut,
    Fut: Future<Output = Result<Resp>>,
{
    let result = match ctx.ensure_shape(Shape::Unary) {
        Ok(()) => ctx.guard(handler(ctx.clone(), request)).await.and_then(|r| r),
        Err(e) => Err(e),
    };
    ctx.finish(&result);
    log_outcome(&ctx, &result);
    result
}

/// One request in, a stream of responses out.
///
/// The handler runs as its own task and emits through the [`Emitter`];
/// returning `Ok(())` closes the stream normally.
pub fn server_stream<Req, Resp, H, Fut>(
    ctx: CallContext,
    request: Req,
    buffer: usize,
    handler: H,
) -> CallStream<Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    H: FnOnce(Req, Emitter<Resp>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    spawn_streaming(ctx, Shape::ServerStream, buffer, move |emitter| {
        handler(request, emitter)
    })
}

/// A stream of requests in, one response out.
///
/// The handler pulls messages with [`Inbound::receive`] and answers once it
/// has seen end-of-input. A caller abort surfaces as an error from
/// `receive`, and the handler need not produce a response.
pub async fn client_stream<Req, Resp, H, Fut>(inbound: Inbound<Req>, handler: H) -> Result<Resp>
where
    H: FnOnce(Inbound<Req>) -> Fut,
    Fut: Future<Output = Result<Resp>>,
{
    let ctx = inbound.context().clone();
    let result = match ctx.ensure_shape(Shape::ClientStream) {
        Ok(()) => ctx.guard(handler(inbound)).await.and_then(|r| r),
        Err(e) => Err(e),
    };
    ctx.finish(&result);
    log_outcome(&ctx, &result);
    result
}

/// A stream of requests in, a stream of responses out.
///
/// End-of-input does not close the outbound direction; the stream ends when
/// the handler returns. Handlers that answer each inbound message can hand
/// both halves to [`relay`], which keeps receiving while emission waits.
pub fn bidi_stream<Req, Resp, H, Fut>(
    inbound: Inbound<Req>,
    buffer: usize,
    handler: H,
) -> CallStream<Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    H: FnOnce(Inbound<Req>, Emitter<Resp>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let ctx = inbound.context().clone();
    spawn_streaming(ctx, Shape::BidiStream, buffer, move |emitter| {
        handler(inbound, emitter)
    })
}

fn spawn_streaming<Resp, H, Fut>(
    ctx: CallContext,
    shape: Shape,
    buffer: usize,
    handler: H,
) -> CallStream<Resp>
where
    Resp: Send + 'static,
    H: FnOnce(Emitter<Resp>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(buffer.max(1));

    if let Err(e) = ctx.ensure_shape(shape) {
        ctx.finish::<()>(&Err(e.clone()));
        // The channel has room for at least one item.
        let _ = tx.try_send(Err(e));
        return CallStream::new(ctx, rx);
    }

    let emitter = Emitter::new(ctx.clone(), tx.clone());
    let task_ctx = ctx.clone();
    tokio::spawn(async move {
        let result = task_ctx.guard(handler(emitter)).await.and_then(|r| r);
        // Set before `tx` drops: a caller that sees the stream end finds the
        // outcome already recorded.
        task_ctx.finish(&result);
        log_outcome(&task_ctx, &result);

        if let Err(e) = result {
            // Best effort: the caller may already be gone.
            if let Err(_e) = tx.send(Err(e)).await {
                tracing::debug!("Caller left before terminal status was delivered");
            }
        }
    });

    CallStream::new(ctx, rx)
}

/// Answers every inbound message of a bidi call, running receive and emit as
/// two concurrent activities joined before returning.
///
/// `answer` runs as each message arrives. Answers wait in an unbounded queue
/// until the caller has room for them, so a caller that is not reading never
/// stops the call from receiving. An error from `answer` or from `receive`
/// ends the receiving side; answers already queued are still emitted before
/// the error is reported.
pub async fn relay<Req, Resp, F>(
    mut inbound: Inbound<Req>,
    mut out: Emitter<Resp>,
    mut answer: F,
) -> Result<()>
where
    F: FnMut(Req) -> Result<Resp>,
{
    let (tx, mut rx) = mpsc::unbounded_channel();

    let receiving = async move {
        while let Some(message) = inbound.receive().await? {
            if tx.send(answer(message)?).is_err() {
                break;
            }
        }
        Ok::<_, crate::Error>(())
    };
    let emitting = async move {
        while let Some(reply) = rx.recv().await {
            out.emit(reply).await?;
        }
        Ok::<_, crate::Error>(())
    };

    let (received, emitted) = tokio::join!(receiving, emitting);
    received.and(emitted)
}

fn log_outcome<T>(ctx: &CallContext, result: &Result<T>) {
    let method = ctx
        .method()
        .map_or_else(|| "<anonymous>".to_string(), |m| m.to_string());
    match result {
        Ok(_) => tracing::debug!("Call {method} completed"),
        Err(e) => match e.code() {
            crate::Code::Internal => tracing::error!("Call {method} failed: {e}"),
            crate::Code::InvalidArgument | crate::Code::NotFound => {
                tracing::warn!("Call {method} rejected: {e}")
            }
            _ => tracing::debug!("Call {method} ended: {e}"),
        },
    }
}
