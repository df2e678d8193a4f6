//! Error type definitions.
//!
//! Two layers of errors flow through the queue:
//! - [`CallError`] describes the failure of a single attempt, as reported by
//!   the caller's work closure.
//! - [`QueueError`] is the terminal error delivered to the caller after the
//!   retry budget is spent (or immediately, for non-retryable failures).

use std::time::Duration;
use thiserror::Error;

/// Failure of one attempt of a unit of work.
///
/// The queue inspects this only to decide retryability: the status code, the
/// transient kinds, and (for opaque errors) whether the message indicates
/// throttling. Everything else passes through to the caller untouched.
#[derive(Debug, Error)]
pub enum CallError {
    /// The call completed with a failing HTTP status.
    #[error("HTTP status {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// Message or body excerpt describing the failure.
        message: String,
        /// Server-provided `Retry-After` hint, if the transport exposed one.
        /// Preferred over the window-based approximation when present.
        retry_after: Option<Duration>,
    },

    /// The call timed out. Always retryable.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection failed or was reset before a response. Always retryable.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other failure. Retried only when the message indicates throttling.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CallError {
    /// Convenience constructor for a status failure with no `Retry-After`.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        CallError::Status {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// The HTTP status code, if this failure carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CallError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal outcome error delivered through the handle returned by
/// [`enqueue`](crate::RequestQueue::enqueue).
#[derive(Debug, Error)]
pub enum QueueError {
    /// A retryable condition persisted through every retry.
    #[error("rate limit exceeded after {attempts} attempts (last status: {last_status:?})")]
    RateLimitExceeded {
        /// Total attempts made, including the initial one.
        attempts: u32,
        /// Status code of the last triggering failure, if it carried one.
        last_status: Option<u16>,
    },

    /// A non-retryable failure, surfaced from the first attempt that hit it.
    #[error(transparent)]
    Call(CallError),

    /// The queue was shut down before this request completed.
    #[error("queue closed before the request completed")]
    Closed,

    /// The configuration failed validation.
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_constructor() {
        let err = CallError::status(503, "service unavailable");
        assert_eq!(err.status_code(), Some(503));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_status_code_absent_for_transient_kinds() {
        assert_eq!(CallError::Timeout("t".into()).status_code(), None);
        assert_eq!(CallError::Connection("c".into()).status_code(), None);
        let opaque: CallError = anyhow::anyhow!("boom").into();
        assert_eq!(opaque.status_code(), None);
    }

    #[test]
    fn test_rate_limit_exceeded_message() {
        let err = QueueError::RateLimitExceeded {
            attempts: 4,
            last_status: Some(429),
        };
        let msg = err.to_string();
        assert!(msg.contains("4 attempts"), "got: {msg}");
        assert!(msg.contains("429"), "got: {msg}");
    }

    #[test]
    fn test_call_error_is_transparent() {
        let err = QueueError::Call(CallError::status(404, "not found"));
        assert_eq!(err.to_string(), "HTTP status 404: not found");
    }
}
