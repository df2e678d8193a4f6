//! Attempt classification and retry triggers.
//!
//! Decides whether a failed attempt is retried, and with which trigger. Also
//! bridges `reqwest::Error` into [`CallError`] so callers wrapping reqwest
//! calls inherit correct categorization.

use std::time::Duration;
use strum_macros::EnumIter as EnumIterMacro;

use super::types::CallError;
use crate::config::HTTP_STATUS_TOO_MANY_REQUESTS;

/// Category of a retry trigger, for aggregate statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum TriggerKind {
    /// A throttle signal: HTTP 429 or a message that indicates rate limiting.
    Throttled,
    /// A retryable non-throttle status (502, 503, 504 by default).
    ServerError,
    /// A timed-out attempt.
    Timeout,
    /// A connection failure or reset.
    Connection,
}

impl TriggerKind {
    /// Returns a human-readable string representation of the trigger kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Throttled => "throttled",
            TriggerKind::ServerError => "server error",
            TriggerKind::Timeout => "timeout",
            TriggerKind::Connection => "connection",
        }
    }
}

/// Why an attempt is being retried.
#[derive(Debug, Clone)]
pub(crate) struct RetryTrigger {
    /// Status code of the triggering failure, if it carried one.
    pub(crate) status: Option<u16>,
    /// True when the failure was a throttle signal. Drives the rate adapter
    /// and the window-reset delay override.
    pub(crate) throttled: bool,
    /// Server-provided retry hint, if any.
    pub(crate) retry_after: Option<Duration>,
    /// Statistics category.
    pub(crate) kind: TriggerKind,
}

/// Classifies a failed attempt.
///
/// Returns the retry trigger when the failure is retryable (status in the
/// configured retry set, a transient network error, or an opaque error whose
/// message indicates throttling), or `None` when it must surface immediately.
pub(crate) fn classify(error: &CallError, retry_on_statuses: &[u16]) -> Option<RetryTrigger> {
    match error {
        CallError::Status {
            status,
            retry_after,
            ..
        } => {
            if !retry_on_statuses.contains(status) {
                return None;
            }
            let throttled = *status == HTTP_STATUS_TOO_MANY_REQUESTS;
            Some(RetryTrigger {
                status: Some(*status),
                throttled,
                retry_after: *retry_after,
                kind: if throttled {
                    TriggerKind::Throttled
                } else {
                    TriggerKind::ServerError
                },
            })
        }
        CallError::Timeout(_) => Some(RetryTrigger {
            status: None,
            throttled: false,
            retry_after: None,
            kind: TriggerKind::Timeout,
        }),
        CallError::Connection(_) => Some(RetryTrigger {
            status: None,
            throttled: false,
            retry_after: None,
            kind: TriggerKind::Connection,
        }),
        CallError::Other(inner) => classify_opaque(inner),
    }
}

/// Message-based classification for errors that expose no structure.
///
/// Walks the error chain looking for throttling or transient-network wording;
/// anything else is non-retryable.
fn classify_opaque(error: &anyhow::Error) -> Option<RetryTrigger> {
    for cause in error.chain() {
        let msg = cause.to_string().to_lowercase();

        if msg.contains("rate limit") || msg.contains("too many requests") || msg.contains("429")
        {
            return Some(RetryTrigger {
                status: None,
                throttled: true,
                retry_after: None,
                kind: TriggerKind::Throttled,
            });
        }
        if msg.contains("timed out") || msg.contains("timeout") {
            return Some(RetryTrigger {
                status: None,
                throttled: false,
                retry_after: None,
                kind: TriggerKind::Timeout,
            });
        }
        if msg.contains("connection reset")
            || msg.contains("connection refused")
            || msg.contains("broken pipe")
        {
            return Some(RetryTrigger {
                status: None,
                throttled: false,
                retry_after: None,
                kind: TriggerKind::Connection,
            });
        }
    }
    None
}

impl From<reqwest::Error> for CallError {
    /// Categorizes a `reqwest::Error` into the queue's taxonomy.
    ///
    /// Status errors keep their code; timeouts and connect failures map to the
    /// transient kinds; everything else stays opaque.
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return CallError::Status {
                status: status.as_u16(),
                message: error.to_string(),
                retry_after: None,
            };
        }
        if error.is_timeout() {
            CallError::Timeout(error.to_string())
        } else if error.is_connect() {
            CallError::Connection(error.to_string())
        } else {
            CallError::Other(error.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_RETRY_ON_STATUSES;

    fn retry_set() -> Vec<u16> {
        DEFAULT_RETRY_ON_STATUSES.to_vec()
    }

    #[test]
    fn test_429_is_throttled() {
        let err = CallError::status(429, "too many requests");
        let trigger = classify(&err, &retry_set()).expect("429 should be retryable");
        assert!(trigger.throttled);
        assert_eq!(trigger.status, Some(429));
        assert_eq!(trigger.kind, TriggerKind::Throttled);
    }

    #[test]
    fn test_gateway_errors_are_retryable_but_not_throttled() {
        for status in [502, 503, 504] {
            let err = CallError::status(status, "upstream unhappy");
            let trigger = classify(&err, &retry_set()).expect("gateway errors retry");
            assert!(!trigger.throttled, "{status} is not a throttle signal");
            assert_eq!(trigger.kind, TriggerKind::ServerError);
        }
    }

    #[test]
    fn test_client_errors_are_fatal() {
        for status in [400, 401, 403, 404] {
            let err = CallError::status(status, "client error");
            assert!(classify(&err, &retry_set()).is_none(), "{status} must not retry");
        }
    }

    #[test]
    fn test_custom_retry_set_is_honored() {
        let err = CallError::status(500, "internal");
        assert!(classify(&err, &retry_set()).is_none());
        assert!(classify(&err, &[500]).is_some());
    }

    #[test]
    fn test_timeout_and_connection_are_retryable() {
        let timeout = CallError::Timeout("deadline elapsed".into());
        assert_eq!(
            classify(&timeout, &retry_set()).map(|t| t.kind),
            Some(TriggerKind::Timeout)
        );

        let reset = CallError::Connection("connection reset by peer".into());
        assert_eq!(
            classify(&reset, &retry_set()).map(|t| t.kind),
            Some(TriggerKind::Connection)
        );
    }

    #[test]
    fn test_opaque_throttle_message_is_retryable() {
        let err: CallError = anyhow::anyhow!("REST API rate limit exceeded").into();
        let trigger = classify(&err, &retry_set()).expect("throttle message should retry");
        assert!(trigger.throttled);
        assert_eq!(trigger.kind, TriggerKind::Throttled);
    }

    #[test]
    fn test_opaque_timeout_message_is_retryable() {
        let err: CallError = anyhow::anyhow!("operation timed out").into();
        let trigger = classify(&err, &retry_set()).expect("timeout message should retry");
        assert_eq!(trigger.kind, TriggerKind::Timeout);
    }

    #[test]
    fn test_opaque_unknown_message_is_fatal() {
        let err: CallError = anyhow::anyhow!("invalid session id").into();
        assert!(classify(&err, &retry_set()).is_none());
    }

    #[test]
    fn test_throttle_detected_through_error_chain() {
        let base = anyhow::anyhow!("429 too many requests");
        let wrapped = base.context("query failed");
        let err: CallError = wrapped.into();
        let trigger = classify(&err, &retry_set()).expect("chained throttle should retry");
        assert!(trigger.throttled);
    }

    #[test]
    fn test_retry_after_hint_carried_through() {
        let err = CallError::Status {
            status: 429,
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(7)),
        };
        let trigger = classify(&err, &retry_set()).expect("retryable");
        assert_eq!(trigger.retry_after, Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_trigger_kind_as_str() {
        use strum::IntoEnumIterator;
        for kind in TriggerKind::iter() {
            assert!(!kind.as_str().is_empty());
        }
    }
}
