//! Exponential backoff with cap and symmetric jitter.

use std::time::Duration;

use rand::Rng;

use super::error::ConfigError;

/// Immutable retry/backoff parameters.
///
/// Validated once at executor construction; `compute_delay` assumes a valid
/// policy and never fails.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts per call, including the first. Must be >= 1.
    pub max_attempts: u32,
    /// Delay before the first retry. Must be positive.
    pub initial_backoff: Duration,
    /// Upper bound on any computed delay. Must be >= `initial_backoff`.
    pub max_backoff: Duration,
    /// Growth factor applied per attempt. Must be >= 1.0.
    pub backoff_multiplier: f64,
    /// Symmetric jitter fraction in [0, 1]; 0 disables jitter.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Check the parameter ranges. Invalid values are a programmer error and
    /// are rejected at construction time, never at call time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts < 1 {
            return Err(ConfigError::new("max_attempts", "must be at least 1"));
        }
        if self.initial_backoff.is_zero() {
            return Err(ConfigError::new("initial_backoff", "must be positive"));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(ConfigError::new(
                "max_backoff",
                "must be at least initial_backoff",
            ));
        }
        // Written as a negated >= so NaN is rejected too.
        if !(self.backoff_multiplier >= 1.0) {
            return Err(ConfigError::new("backoff_multiplier", "must be at least 1.0"));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::new("jitter", "must be within [0, 1]"));
        }
        Ok(())
    }

    /// Delay to wait before retry number `attempt` (zero-based), using the
    /// thread-local rng for jitter.
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        self.compute_delay_with(attempt, &mut rand::thread_rng())
    }

    /// Same as `compute_delay` with an explicit random source, so tests can
    /// seed one and get reproducible delays.
    ///
    /// `base = initial_backoff * multiplier^attempt` capped at `max_backoff`,
    /// then perturbed by `base * (1 - jitter + 2 * jitter * u)` with `u`
    /// uniform in [0, 1). The result is clamped to `[0, max_backoff]`.
    pub fn compute_delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let max = self.max_backoff.as_secs_f64();
        let raw = self.initial_backoff.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        // Large attempt counts overflow to infinity; treat that as the cap.
        let base = if raw.is_finite() { raw.min(max) } else { max };
        let delay = if self.jitter > 0.0 {
            let u: f64 = rng.gen();
            base * (1.0 - self.jitter + 2.0 * self.jitter * u)
        } else {
            base
        };
        Duration::from_secs_f64(delay.clamp(0.0, max))
    }
}
