//! Classify remote-call failures into retry policy error kinds.
//!
//! Transport adapters map their concrete failures (status codes, IO errors)
//! into [`ErrorKind`]; that mapping stays in the adapter. This module only
//! decides which kinds are safe to reattempt.

/// High-level classification of a remote-call failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Destination temporarily unavailable (connection refused/reset, DNS,
    /// service overload signals).
    Unavailable,
    /// Destination is shedding load or a quota ran out.
    ResourceExhausted,
    /// The attempt timed out. Whether the caller's overall deadline is
    /// exhausted is enforced by the executor's wait, not here.
    Timeout,
    /// The request itself is malformed.
    InvalidArgument,
    /// Requested entity does not exist.
    NotFound,
    /// Entity already exists.
    AlreadyExists,
    /// Caller is not allowed to perform the operation.
    PermissionDenied,
    /// Any failure outside the known taxonomy.
    Other,
}

impl ErrorKind {
    /// Whether a failure of this kind is safe to reattempt.
    ///
    /// Contract: anything outside the known-transient set, including
    /// [`ErrorKind::Other`], is not retryable, so unclassified failures are
    /// never masked by silent retries.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Unavailable | ErrorKind::ResourceExhausted | ErrorKind::Timeout
        )
    }
}

/// Implemented by adapter error types so the executor can classify failures.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
