//! `grpc-timeout` request header.
//!
//! The header value is an ASCII integer of at most eight digits followed by a
//! single unit character:
//!
//! | Unit | Meaning      |
//! |------|--------------|
//! | `H`  | hours        |
//! | `M`  | minutes      |
//! | `S`  | seconds      |
//! | `m`  | milliseconds |
//! | `u`  | microseconds |
//! | `n`  | nanoseconds  |

use core::time::Duration;
use tonic::metadata::MetadataMap;

pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

const MAX_DIGITS: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutError {
    #[error("grpc-timeout header is not valid ASCII")]
    NotAscii,

    #[error("grpc-timeout {0:?} has no digits")]
    MissingValue(String),

    #[error("grpc-timeout {0:?} has more than eight digits")]
    TooLong(String),

    #[error("grpc-timeout {0:?} has a non-numeric value")]
    InvalidValue(String),

    #[error("grpc-timeout {0:?} has an unknown unit")]
    InvalidUnit(String),
}

/// Parses a `grpc-timeout` header value.
///
/// # Errors
///
/// Returns [`TimeoutError`] when `value` does not follow the header grammar.
pub fn parse_grpc_timeout(value: &str) -> Result<Duration, TimeoutError> {
    let Some(unit) = value.chars().last() else {
        return Err(TimeoutError::MissingValue(value.to_string()));
    };
    let digits = &value[..value.len() - unit.len_utf8()];

    if digits.is_empty() {
        return Err(TimeoutError::MissingValue(value.to_string()));
    }
    if digits.len() > MAX_DIGITS {
        return Err(TimeoutError::TooLong(value.to_string()));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeoutError::InvalidValue(value.to_string()));
    }
    let amount: u64 = digits
        .parse()
        .map_err(|_| TimeoutError::InvalidValue(value.to_string()))?;

    let timeout = match unit {
        'H' => Duration::from_secs(amount * 60 * 60),
        'M' => Duration::from_secs(amount * 60),
        'S' => Duration::from_secs(amount),
        'm' => Duration::from_millis(amount),
        'u' => Duration::from_micros(amount),
        'n' => Duration::from_nanos(amount),
        _ => return Err(TimeoutError::InvalidUnit(value.to_string())),
    };
    Ok(timeout)
}

/// The caller's timeout, if the request carries one.
///
/// # Errors
///
/// Returns [`TimeoutError`] when the header is present but malformed.
pub fn request_timeout(metadata: &MetadataMap) -> Result<Option<Duration>, TimeoutError> {
    let Some(value) = metadata.get(GRPC_TIMEOUT_HEADER) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| TimeoutError::NotAscii)?;
    parse_grpc_timeout(value).map(Some)
}
