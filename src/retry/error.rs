//! Error taxonomy for executed calls and for construction-time validation.

use thiserror::Error;

use crate::context::CancelReason;

/// Terminal outcome of a failed `RetryExecutor::execute` call.
///
/// Exactly one of these is returned per failed call; the executor never
/// swallows an error.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// The breaker refused the attempt before any call was made. Callers may
    /// use this to back off at a higher level.
    #[error("circuit open for {destination}")]
    CircuitOpen { destination: String },

    /// Permanent application-level failure, propagated unchanged on first
    /// occurrence.
    #[error(transparent)]
    NotRetryable(E),

    /// The final underlying error after the attempt budget ran out or the
    /// breaker stopped admitting further attempts.
    #[error("retries exhausted after {attempts} attempt(s)")]
    Exhausted {
        /// Attempts actually performed.
        attempts: u32,
        #[source]
        source: E,
    },

    /// The caller cancelled during a backoff wait.
    #[error("call cancelled while waiting to retry")]
    Cancelled,

    /// The caller's deadline elapsed during a backoff wait.
    #[error("deadline exceeded while waiting to retry")]
    DeadlineExceeded,
}

impl<E> CallError<E> {
    /// The underlying remote-call error, if an attempt ran and failed.
    pub fn into_source(self) -> Option<E> {
        match self {
            CallError::NotRetryable(e) | CallError::Exhausted { source: e, .. } => Some(e),
            _ => None,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CallError::CircuitOpen { .. })
    }
}

impl<E> From<CancelReason> for CallError<E> {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Cancelled => CallError::Cancelled,
            CancelReason::DeadlineExceeded => CallError::DeadlineExceeded,
        }
    }
}

/// Construction-time configuration error. Detected when an executor or
/// breaker is built, never at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ConfigError {
    pub(crate) fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}
