//! Request arrival stamping.
//!
//! Tonic starts its own `grpc-timeout` timer when a request enters the
//! server stack, before any handler runs. [`ArrivalLayer`] records that same
//! moment in the request extensions so a call's deadline is counted from it
//! rather than from when the handler got around to opening the call. The
//! engine's deadline then never lands after tonic's, and an expired call
//! reports `DEADLINE_EXCEEDED` instead of tonic's `CANCELLED`.

use core::task::{Context, Poll};
use tokio::time::Instant;
use tonic::codegen::http;
use tower::{Layer, Service};

/// When the server stack first saw a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arrived(pub Instant);

impl Arrived {
    /// The stamped instant, or now for requests that bypassed the layer.
    pub fn of<T>(request: &tonic::Request<T>) -> Instant {
        request
            .extensions()
            .get::<Self>()
            .map_or_else(Instant::now, |arrived| arrived.0)
    }
}

/// Stamps every request with [`Arrived`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ArrivalLayer;

impl<S> Layer<S> for ArrivalLayer {
    type Service = ArrivalService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ArrivalService { inner }
    }
}

#[derive(Clone, Debug)]
pub struct ArrivalService<S> {
    inner: S,
}

impl<S, B> Service<http::Request<B>> for ArrivalService<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: http::Request<B>) -> Self::Future {
        // Stamped synchronously: the inner future may not run until polled.
        request.extensions_mut().insert(Arrived(Instant::now()));
        self.inner.call(request)
    }
}
