//! Pure breaker state transitions, separated from the lock wrapper so they
//! can be unit-tested with synthetic clocks.

use tokio::time::Instant;

use super::BreakerConfig;

/// Admission state of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation; every attempt is admitted.
    Closed,
    /// Destination deemed failing; attempts refused until the reset timeout
    /// elapses.
    Open,
    /// Trial period after an open interval; attempts are admitted to probe
    /// recovery.
    HalfOpen,
}

/// What a mutation did, so the wrapper can log transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Transition {
    None,
    Opened,
    HalfOpened,
    Closed,
}

#[derive(Debug)]
pub(super) struct BreakerCore {
    pub(super) state: BreakerState,
    pub(super) failure_count: u32,
    pub(super) success_count: u32,
    pub(super) last_failure_at: Option<Instant>,
}

impl BreakerCore {
    pub(super) fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_at: None,
        }
    }

    /// Whether an attempt may proceed at `now`. In Open, an elapsed reset
    /// timeout transitions to HalfOpen (with `success_count` reset) before
    /// admitting.
    pub(super) fn can_attempt(&mut self, cfg: &BreakerConfig, now: Instant) -> (bool, Transition) {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => (true, Transition::None),
            BreakerState::Open => {
                let elapsed = self
                    .last_failure_at
                    .map(|at| now.saturating_duration_since(at) >= cfg.reset_timeout)
                    .unwrap_or(true);
                if elapsed {
                    self.state = BreakerState::HalfOpen;
                    self.success_count = 0;
                    (true, Transition::HalfOpened)
                } else {
                    (false, Transition::None)
                }
            }
        }
    }

    pub(super) fn record_success(&mut self, cfg: &BreakerConfig) -> Transition {
        match self.state {
            BreakerState::Closed => {
                self.failure_count = 0;
                Transition::None
            }
            // can_attempt gates entry while Open; nothing to account for.
            BreakerState::Open => Transition::None,
            BreakerState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= cfg.half_open_success_threshold {
                    self.state = BreakerState::Closed;
                    self.failure_count = 0;
                    Transition::Closed
                } else {
                    Transition::None
                }
            }
        }
    }

    pub(super) fn record_failure(&mut self, cfg: &BreakerConfig, now: Instant) -> Transition {
        match self.state {
            BreakerState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= cfg.max_failures {
                    self.state = BreakerState::Open;
                    self.last_failure_at = Some(now);
                    Transition::Opened
                } else {
                    Transition::None
                }
            }
            BreakerState::Open => {
                self.last_failure_at = Some(now);
                Transition::None
            }
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open;
                self.failure_count = 0;
                self.success_count = 0;
                self.last_failure_at = Some(now);
                Transition::Opened
            }
        }
    }
}
