//! Retry loop: run one-attempt futures until success or the policy says stop.
//!
//! Attempts within one `execute` call are strictly sequential; the backoff
//! wait between them is the only suspension point and is raced against the
//! call context, so cancellation never waits out a timer.

use std::future::Future;
use std::sync::Arc;

use crate::breaker::CircuitBreaker;
use crate::context::CallContext;

use super::classify::Classify;
use super::error::{CallError, ConfigError};
use super::policy::RetryPolicy;

/// Orchestrates attempts against one destination: consults the breaker,
/// awaits the attempt, classifies failures, and waits between tries.
///
/// Holds no mutable state of its own; the attached breaker is the only
/// structure shared across concurrent `execute` calls.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl RetryExecutor {
    /// Build an executor. The policy is validated here, not at call time.
    pub fn new(policy: RetryPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;
        Ok(Self {
            policy,
            breaker: None,
        })
    }

    /// Attach the destination's shared breaker. Without one, `execute`
    /// degrades to plain retry-with-backoff.
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `invoke` (one remote-call attempt per call) until it succeeds or a
    /// terminal condition is hit; see [`CallError`] for the outcomes.
    ///
    /// An already-cancelled context still performs the first attempt: no wait
    /// precedes it, and cancellation is only observed at backoff waits.
    pub async fn execute<F, Fut, T, E>(
        &self,
        ctx: &CallContext,
        mut invoke: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        if let Some(breaker) = &self.breaker {
            if !breaker.can_attempt() {
                return Err(CallError::CircuitOpen {
                    destination: breaker.destination().to_string(),
                });
            }
        }

        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0u32;
        loop {
            match invoke().await {
                Ok(value) => {
                    if let Some(breaker) = &self.breaker {
                        breaker.record_success();
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if let Some(breaker) = &self.breaker {
                        breaker.record_failure();
                    }
                    let attempts = attempt + 1;
                    let budget_spent = attempts >= max_attempts;
                    let breaker_refused =
                        self.breaker.as_ref().is_some_and(|b| !b.can_attempt());
                    if budget_spent || breaker_refused {
                        tracing::debug!(
                            "giving up after {} attempt(s) ({:?})",
                            attempts,
                            err.kind()
                        );
                        return Err(CallError::Exhausted {
                            attempts,
                            source: err,
                        });
                    }
                    if !err.kind().is_retryable() {
                        return Err(CallError::NotRetryable(err));
                    }

                    let delay = self.policy.compute_delay(attempt);
                    tracing::debug!(
                        "attempt {}/{} failed ({:?}), retrying in {:?}",
                        attempts,
                        max_attempts,
                        err.kind(),
                        delay
                    );
                    tokio::select! {
                        biased;
                        reason = ctx.done() => return Err(reason.into()),
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt = attempts;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct Transient;

    impl std::fmt::Display for Transient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "transient failure")
        }
    }

    impl std::error::Error for Transient {}

    impl Classify for Transient {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Unavailable
        }
    }

    fn executor(max_attempts: u32) -> RetryExecutor {
        RetryExecutor::new(RetryPolicy {
            max_attempts,
            jitter: 0.0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_invalid_policy_at_construction() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(RetryExecutor::new(policy).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn success_returns_without_retrying() {
        let calls = AtomicU32::new(0);
        let result = executor(3)
            .execute(&CallContext::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Transient>(7) }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_after_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = executor(3)
            .execute(&CallContext::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Transient) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(CallError::Exhausted { attempts: 3, .. }) => {}
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn single_attempt_never_enters_backoff() {
        // Not using a paused clock on purpose: a real 5s initial backoff
        // would blow past the elapsed bound below if the wait were entered.
        let policy = RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(5),
            jitter: 0.0,
            ..Default::default()
        };
        let exec = RetryExecutor::new(policy).unwrap();
        let calls = AtomicU32::new(0);
        let started = std::time::Instant::now();
        let result: Result<(), _> = exec
            .execute(&CallContext::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Transient) }
            })
            .await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match result {
            Err(CallError::Exhausted { attempts: 1, .. }) => {}
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }
}
