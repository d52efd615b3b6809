//! Per-destination circuit breaker.
//!
//! One breaker instance per logical destination, created once and shared
//! (`Arc`) by every concurrent call to that destination for the lifetime of
//! the owning client. The breaker is purely advisory state: it never returns
//! errors, the retry executor decides what a refusal means.
//!
//! # State transitions
//! ```text
//! Closed ──[max_failures failures]──> Open
//!   ▲                                   │
//!   │                                   │ [reset_timeout elapses, next can_attempt]
//!   │                                   ▼
//!   └──[threshold successes]──── HalfOpen ──[any failure]──> Open
//! ```

mod state;

pub use state::BreakerState;

use std::sync::RwLock;
use std::time::Duration;

use tokio::time::Instant;

use crate::retry::ConfigError;
use state::{BreakerCore, Transition};

/// Fixed breaker parameters.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive Closed-state failures before the circuit opens.
    pub max_failures: u32,
    /// How long the circuit stays open before admitting a trial attempt.
    pub reset_timeout: Duration,
    /// Consecutive HalfOpen successes required to close again.
    pub half_open_success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_timeout: Duration::from_secs(30),
            half_open_success_threshold: 2,
        }
    }
}

impl BreakerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_failures < 1 {
            return Err(ConfigError::new("max_failures", "must be at least 1"));
        }
        if self.half_open_success_threshold < 1 {
            return Err(ConfigError::new(
                "half_open_success_threshold",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// State and counters at one point in time, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failure_count: u32,
    pub success_count: u32,
}

/// Shared, lock-guarded circuit breaker for one destination.
///
/// All mutations go through a single `RwLock`, making `can_attempt`,
/// `record_success` and `record_failure` linearizable with respect to each
/// other across concurrent calls.
#[derive(Debug)]
pub struct CircuitBreaker {
    destination: String,
    config: BreakerConfig,
    core: RwLock<BreakerCore>,
}

impl CircuitBreaker {
    /// Build a breaker for one destination; the config is validated here.
    pub fn new(destination: impl Into<String>, config: BreakerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            destination: destination.into(),
            config,
            core: RwLock::new(BreakerCore::new()),
        })
    }

    /// Destination label this breaker guards (used in logs and errors).
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Whether an attempt may proceed right now. While Open, an elapsed
    /// reset timeout flips the breaker to HalfOpen before admitting.
    pub fn can_attempt(&self) -> bool {
        // Fast path under the read lock; only the Open state can mutate.
        {
            let core = self.core.read().unwrap();
            if core.state != BreakerState::Open {
                return true;
            }
        }
        let now = Instant::now();
        let mut core = self.core.write().unwrap();
        // State may have moved between the locks; can_attempt re-checks.
        let (admit, transition) = core.can_attempt(&self.config, now);
        drop(core);
        self.log(transition);
        admit
    }

    /// Record a successful attempt outcome.
    pub fn record_success(&self) {
        let transition = self.core.write().unwrap().record_success(&self.config);
        self.log(transition);
    }

    /// Record a failed attempt outcome.
    pub fn record_failure(&self) {
        let now = Instant::now();
        let transition = self.core.write().unwrap().record_failure(&self.config, now);
        self.log(transition);
    }

    pub fn state(&self) -> BreakerState {
        self.core.read().unwrap().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let core = self.core.read().unwrap();
        BreakerSnapshot {
            state: core.state,
            failure_count: core.failure_count,
            success_count: core.success_count,
        }
    }

    fn log(&self, transition: Transition) {
        match transition {
            Transition::None => {}
            Transition::Opened => {
                tracing::warn!("circuit open for {}", self.destination);
            }
            Transition::HalfOpened => {
                tracing::info!("circuit half-open for {}, trialing recovery", self.destination);
            }
            Transition::Closed => {
                tracing::info!("circuit closed for {}", self.destination);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn breaker(max_failures: u32, reset_secs: u64, threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "backend-a",
            BreakerConfig {
                max_failures,
                reset_timeout: Duration::from_secs(reset_secs),
                half_open_success_threshold: threshold,
            },
        )
        .unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = BreakerConfig {
            max_failures: 0,
            ..Default::default()
        };
        assert!(CircuitBreaker::new("backend-a", cfg).is_err());
    }

    #[test]
    fn starts_closed_and_admits() {
        let b = breaker(2, 30, 1);
        assert_eq!(b.state(), BreakerState::Closed);
        assert!(b.can_attempt());
    }

    #[tokio::test(start_paused = true)]
    async fn open_rejects_until_reset_timeout() {
        let b = breaker(2, 30, 1);
        b.record_failure();
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);
        assert!(!b.can_attempt());

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!b.can_attempt());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(b.can_attempt());
        assert_eq!(b.state(), BreakerState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_scenario_closes_after_one_success() {
        let b = breaker(2, 30, 1);
        b.record_failure();
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(b.can_attempt());
        assert_eq!(b.state(), BreakerState::HalfOpen);

        b.record_success();
        let snap = b.snapshot();
        assert_eq!(snap.state, BreakerState::Closed);
        assert_eq!(snap.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_needs_threshold_successes() {
        let b = breaker(1, 30, 2);
        b.record_failure();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(b.can_attempt());

        b.record_success();
        assert_eq!(b.state(), BreakerState::HalfOpen);
        b.record_success();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_failure_reopens_immediately() {
        let b = breaker(1, 30, 2);
        b.record_failure();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(b.can_attempt());
        assert_eq!(b.state(), BreakerState::HalfOpen);

        b.record_failure();
        let snap = b.snapshot();
        assert_eq!(snap.state, BreakerState::Open);
        assert_eq!(snap.failure_count, 0);
        assert_eq!(snap.success_count, 0);
    }

    #[tokio::test]
    async fn shared_breaker_survives_concurrent_records() {
        let b = Arc::new(breaker(50, 30, 2));
        let mut handles = Vec::new();
        for i in 0..16 {
            let b = Arc::clone(&b);
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    if b.can_attempt() {
                        if i % 2 == 0 {
                            b.record_success();
                        } else {
                            b.record_failure();
                        }
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        // Still in a coherent state and below the (high) threshold.
        assert!(matches!(
            b.state(),
            BreakerState::Closed | BreakerState::Open | BreakerState::HalfOpen
        ));
    }
}
