//! Cancellable call context: cooperative cancellation plus an optional deadline.
//!
//! Each outbound call carries a `CallContext`. The retry executor races its
//! backoff wait against `done()`, so a cancelled caller or an elapsed deadline
//! interrupts the wait immediately instead of being polled.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context stopped admitting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller cancelled the token.
    Cancelled,
    /// The context's deadline elapsed.
    DeadlineExceeded,
}

/// Cancellation token plus optional deadline for one logical call.
///
/// Clones share the same token, so an adapter can keep one clone and hand
/// another to the executor.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an absolute deadline.
    pub fn with_deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(at);
        self
    }

    /// Attach a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once the token is cancelled or the deadline has passed.
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|at| Instant::now() >= at)
    }

    /// Resolves when the context fires. Pending forever for an unbounded,
    /// uncancelled context, which makes it safe to race in a `select!`.
    pub async fn done(&self) -> CancelReason {
        match self.deadline {
            Some(at) => tokio::select! {
                () = self.cancel.cancelled() => CancelReason::Cancelled,
                () = tokio::time::sleep_until(at) => CancelReason::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_resolves_done() {
        let ctx = CallContext::new();
        assert!(!ctx.is_done());
        ctx.cancel();
        assert!(ctx.is_done());
        assert_eq!(ctx.done().await, CancelReason::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_resolves_done() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(10));
        assert_eq!(ctx.done().await, CancelReason::DeadlineExceeded);
        assert!(ctx.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_wins_over_later_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::from_secs(60));
        ctx.cancel();
        assert_eq!(ctx.done().await, CancelReason::Cancelled);
    }

    #[tokio::test]
    async fn clones_share_the_token() {
        let ctx = CallContext::new();
        let other = ctx.clone();
        other.cancel();
        assert!(ctx.is_done());
    }
}
