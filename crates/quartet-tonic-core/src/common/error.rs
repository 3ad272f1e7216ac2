//! Mapping between the engine's error taxonomy and gRPC status.
//!
//! Every [`Code`] maps onto exactly one [`tonic::Code`]:
//!
//! | Engine             | gRPC                 |
//! |--------------------|----------------------|
//! | `InvalidArgument`  | `INVALID_ARGUMENT`   |
//! | `NotFound`         | `NOT_FOUND`          |
//! | `DeadlineExceeded` | `DEADLINE_EXCEEDED`  |
//! | `Canceled`         | `CANCELLED`          |
//! | `Internal`         | `INTERNAL`           |
//! | `Unimplemented`    | `UNIMPLEMENTED`      |
//! | `Unavailable`      | `UNAVAILABLE`        |
//!
//! Going the other way, statuses outside this table become `Internal`.

use quartet::{Code, Error};
use tonic::Status;

pub const fn to_tonic_code(code: Code) -> tonic::Code {
    match code {
        Code::InvalidArgument => tonic::Code::InvalidArgument,
        Code::NotFound => tonic::Code::NotFound,
        Code::DeadlineExceeded => tonic::Code::DeadlineExceeded,
        Code::Canceled => tonic::Code::Cancelled,
        Code::Internal => tonic::Code::Internal,
        Code::Unimplemented => tonic::Code::Unimplemented,
        Code::Unavailable => tonic::Code::Unavailable,
    }
}

/// Converts an engine error into the status sent to the caller.
pub trait IntoStatus {
    fn into_status(self) -> Status;
}

impl IntoStatus for Error {
    fn into_status(self) -> Status {
        Status::new(to_tonic_code(self.code()), self.message())
    }
}

/// Recovers an engine error from a status received over the wire, e.g. an
/// aborted inbound stream.
pub fn error_from_status(status: &Status) -> Error {
    let message = status.message();
    match status.code() {
        tonic::Code::InvalidArgument => Error::invalid_argument(message),
        tonic::Code::NotFound => Error::not_found(message),
        tonic::Code::DeadlineExceeded => Error::DeadlineExceeded,
        tonic::Code::Cancelled => Error::Canceled,
        tonic::Code::Unimplemented => Error::unimplemented(message),
        tonic::Code::Unavailable => Error::ServiceShutdown,
        other => Error::internal(format!("{other:?}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_carry_the_message_without_the_kind_prefix() {
        let status = Error::invalid_argument("Received negative number: -1").into_status();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(status.message(), "Received negative number: -1");

        let status = Error::ServiceShutdown.into_status();
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }

    #[test]
    fn taxonomy_survives_the_wire() {
        let errors = [
            Error::invalid_argument("bad id"),
            Error::not_found("no blog"),
            Error::DeadlineExceeded,
            Error::Canceled,
            Error::ServiceShutdown,
        ];
        for error in errors {
            let status = error.clone().into_status();
            assert_eq!(error_from_status(&status), error);
        }
    }

    #[test]
    fn unknown_statuses_are_internal() {
        let status = Status::new(tonic::Code::DataLoss, "torn frame");
        assert_eq!(error_from_status(&status).code(), Code::Internal);
    }
}
