//! Error taxonomy shared by the interaction engine and every service built on
//! it.
//!
//! Each variant corresponds to exactly one terminal [`Code`]. Handlers return
//! the specific variant with a descriptive message; the engine attaches it to
//! the call's terminal state and the transport layer maps the [`Code`] onto its
//! own status codes.
//!
//! ## Error Cases
//! - `InvalidArgument`: a caller-supplied identifier or parameter failed
//!   validation.
//! - `NotFound`: the requested resource has no corresponding record.
//! - `DeadlineExceeded`: the call's deadline passed before completion.
//! - `Canceled`: the caller aborted the call, or the peer went away.
//! - `Internal`: a store operation or decode failed unexpectedly.
//! - `Unimplemented`: no handler is bound for the invoked operation.
//! - `ServiceShutdown`: the call arrived, or was still running, while the
//!   service was shutting down.

use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for calls dispatched through the engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A caller-supplied value failed validation. Never retried.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The referenced resource does not exist.
    #[error("Not found: {reason}")]
    NotFound { reason: String },

    /// The call's deadline expired before it completed.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// The call was aborted before completion.
    #[error("Call cancelled")]
    Canceled,

    /// An unexpected failure inside the service or its store.
    #[error("Internal error: {context}")]
    Internal { context: String },

    /// No handler is bound for the requested operation.
    #[error("Unimplemented: {method}")]
    Unimplemented { method: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    pub fn internal(context: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
        }
    }

    pub fn unimplemented(method: impl Into<String>) -> Self {
        Self::Unimplemented {
            method: method.into(),
        }
    }

    /// Returns the taxonomy kind of this error.
    pub const fn code(&self) -> Code {
        match self {
            Self::InvalidArgument { .. } => Code::InvalidArgument,
            Self::NotFound { .. } => Code::NotFound,
            Self::DeadlineExceeded => Code::DeadlineExceeded,
            Self::Canceled => Code::Canceled,
            Self::Internal { .. } => Code::Internal,
            Self::Unimplemented { .. } => Code::Unimplemented,
            Self::ServiceShutdown => Code::Unavailable,
        }
    }

    /// The human-readable part of the error, without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidArgument { reason } | Self::NotFound { reason } => reason.clone(),
            Self::Internal { context } => context.clone(),
            Self::Unimplemented { method } => format!("{method} is not implemented"),
            other => other.to_string(),
        }
    }
}

/// Terminal status kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    InvalidArgument,
    NotFound,
    DeadlineExceeded,
    Canceled,
    Internal,
    Unimplemented,
    Unavailable,
}

impl Code {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Canceled => "canceled",
            Self::Internal => "internal",
            Self::Unimplemented => "unimplemented",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
