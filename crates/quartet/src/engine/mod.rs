//! RPC interaction engine.
//!
//! Sequences message exchange for the four call shapes and enforces deadline
//! and cancellation semantics uniformly, independent of handler logic.
//!
//! ## Structure
//!
//! - [`context`] - per-call deadline, cancellation token and terminal outcome.
//! - [`stream`] - inbound receiver, outbound emitter, caller-side stream.
//! - [`call`] - the `unary`, `server_stream`, `client_stream` and
//!   `bidi_stream` drivers, plus `relay` for per-message bidi handlers.
//! - [`registry`] - shapes and the service registration surface.
//! - [`dispatcher`] - call admission, in-flight accounting and shutdown.

pub mod call;
pub mod context;
pub mod dispatcher;
pub mod registry;
pub mod stream;

pub use call::{bidi_stream, client_stream, relay, server_stream, unary};
pub use context::{CallContext, Outcome, Terminal};
pub use dispatcher::Dispatcher;
pub use registry::{MethodDescriptor, Registry, ServiceDescriptor, Shape};
pub use stream::{CallStream, Emitter, Inbound};
