//! gRPC service implementations.
//!
//! Each handler translates between wire messages and the engine-level
//! services, opening every call through the shared [`Dispatcher`] so the
//! caller's `grpc-timeout` becomes the call deadline and shutdown reaches
//! every in-flight call.
//!
//! ## Structure
//!
//! - [`calculator`] - `calculator.CalculatorService`.
//! - [`blog`] - `blog.BlogService` over a document store.
//! - [`greet`] - `greet.GreetService`.

pub mod blog;
pub mod calculator;
pub mod greet;

use crate::server::arrival::Arrived;
use crate::server::config::ServerConfig;
use crate::server::telemetry::{
    decrement_streams_inflight, increment_errors, increment_requests, increment_streams_inflight,
    record_call_duration,
};
use blog::BlogHandler;
use calculator::CalculatorHandler;
use futures::StreamExt;
use futures::stream::BoxStream;
use greet::GreetHandler;
use quartet_tonic_core::deadline::request_timeout;
use quartet_tonic_core::error::{IntoStatus, error_from_status};
use quartet_tonic_core::proto::blog::BlogServiceServer;
use quartet_tonic_core::proto::calculator::CalculatorServiceServer;
use quartet_tonic_core::proto::greet::GreetServiceServer;
use quartet_tonic_core::quartet::{
    self,
    calculator::Calculator,
    engine::{CallContext, CallStream, Dispatcher, Inbound, MethodDescriptor},
    greet::Greeter,
    store::MemoryStore,
};
use std::sync::Arc;
use std::time::Instant;
use tonic::codec::CompressionEncoding;
use tonic::{Request, Response, Status, Streaming};

/// Outbound stream type shared by every streaming method.
pub type ResponseStream<T> = BoxStream<'static, Result<T, Status>>;

/// One admitted call: its context plus the bookkeeping for metrics.
pub(crate) struct Call {
    method: &'static MethodDescriptor,
    ctx: CallContext,
    start: Instant,
}

impl Call {
    /// Admits a call for `method`, deriving its deadline from the request's
    /// `grpc-timeout` counted from when the request arrived.
    pub(crate) fn open<T>(
        dispatcher: &Dispatcher,
        method: &'static MethodDescriptor,
        request: &Request<T>,
    ) -> Result<Self, Status> {
        increment_requests(method.name);

        let timeout = request_timeout(request.metadata()).unwrap_or_else(|e| {
            tracing::debug!("Ignoring malformed timeout on {method}: {e}");
            None
        });

        match dispatcher.open_since(method, timeout, Arrived::of(request)) {
            Ok(ctx) => Ok(Self {
                method,
                ctx,
                start: Instant::now(),
            }),
            Err(e) => {
                increment_errors(method.name, e.code());
                Err(e.into_status())
            }
        }
    }

    pub(crate) fn context(&self) -> CallContext {
        self.ctx.clone()
    }

    /// Wraps an inbound gRPC stream so the handler can `receive()` from it.
    pub(crate) fn inbound<M, T>(&self, streaming: Streaming<M>, convert: fn(M) -> T) -> Inbound<T>
    where
        M: Send + 'static,
        T: Send + 'static,
    {
        let messages = streaming.map(move |item| match item {
            Ok(message) => Ok(convert(message)),
            Err(status) => Err(error_from_status(&status)),
        });
        Inbound::new(self.ctx.clone(), messages)
    }

    /// Completes a single-response call.
    pub(crate) fn respond<T>(self, result: quartet::Result<T>) -> Result<Response<T>, Status> {
        record_call_duration(self.method.name, self.start.elapsed().as_secs_f64() * 1000.0);
        match result {
            Ok(message) => Ok(Response::new(message)),
            Err(e) => {
                increment_errors(self.method.name, e.code());
                Err(e.into_status())
            }
        }
    }

    /// Completes a streaming call by handing the engine's stream to tonic.
    pub(crate) fn stream<T, R>(
        self,
        stream: CallStream<T>,
        convert: fn(T) -> R,
    ) -> Response<ResponseStream<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
    {
        let tracker = StreamTracker::new(self.method, self.start);
        let stream = stream.map(move |item| match item {
            Ok(message) => Ok(convert(message)),
            Err(e) => Err(tracker.fail(e)),
        });
        Response::new(stream.boxed())
    }
}

/// Keeps `streams_inflight` and `call_duration` accurate for as long as
/// tonic holds the response stream.
struct StreamTracker {
    method: &'static MethodDescriptor,
    start: Instant,
}

impl StreamTracker {
    fn new(method: &'static MethodDescriptor, start: Instant) -> Self {
        increment_streams_inflight();
        Self { method, start }
    }

    fn fail(&self, e: quartet::Error) -> Status {
        increment_errors(self.method.name, e.code());
        e.into_status()
    }
}

impl Drop for StreamTracker {
    fn drop(&mut self) {
        decrement_streams_inflight();
        record_call_duration(self.method.name, self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

/// Every service the server exposes, sharing one dispatcher.
#[derive(Clone)]
pub struct Services {
    dispatcher: Arc<Dispatcher>,
    calculator: CalculatorHandler,
    blog: BlogHandler<MemoryStore>,
    greet: GreetHandler,
}

impl Services {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: &ServerConfig, store: Arc<MemoryStore>) -> Self {
        let dispatcher = Arc::new(
            Dispatcher::new(quartet::default_registry())
                .with_default_timeout(config.default_deadline)
                .with_drain_timeout(config.shutdown_timeout),
        );

        let calculator = Calculator::new().with_stream_buffer(config.stream_buffer_size);
        let greeter = Greeter::new(config.greet_interval, config.greet_repeat)
            .with_stream_buffer(config.stream_buffer_size);
        let blogs = quartet::blog::BlogService::new(store)
            .with_stream_buffer(config.stream_buffer_size);

        Self {
            calculator: CalculatorHandler::new(calculator, Arc::clone(&dispatcher)),
            blog: BlogHandler::new(blogs, Arc::clone(&dispatcher)),
            greet: GreetHandler::new(greeter, Arc::clone(&dispatcher)),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn calculator_server(&self) -> CalculatorServiceServer<CalculatorHandler> {
        CalculatorServiceServer::new(self.calculator.clone())
            .send_compressed(CompressionEncoding::Zstd)
            .send_compressed(CompressionEncoding::Gzip)
            .send_compressed(CompressionEncoding::Deflate)
            .accept_compressed(CompressionEncoding::Zstd)
            .accept_compressed(CompressionEncoding::Gzip)
            .accept_compressed(CompressionEncoding::Deflate)
    }

    pub fn blog_server(&self) -> BlogServiceServer<BlogHandler<MemoryStore>> {
        BlogServiceServer::new(self.blog.clone())
            .send_compressed(CompressionEncoding::Zstd)
            .send_compressed(CompressionEncoding::Gzip)
            .send_compressed(CompressionEncoding::Deflate)
            .accept_compressed(CompressionEncoding::Zstd)
            .accept_compressed(CompressionEncoding::Gzip)
            .accept_compressed(CompressionEncoding::Deflate)
    }

    pub fn greet_server(&self) -> GreetServiceServer<GreetHandler> {
        GreetServiceServer::new(self.greet.clone())
            .send_compressed(CompressionEncoding::Zstd)
            .send_compressed(CompressionEncoding::Gzip)
            .send_compressed(CompressionEncoding::Deflate)
            .accept_compressed(CompressionEncoding::Zstd)
            .accept_compressed(CompressionEncoding::Gzip)
            .accept_compressed(CompressionEncoding::Deflate)
    }

    /// Stops admitting calls, drains in-flight ones, then cancels the rest.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}
