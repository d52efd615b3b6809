use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::breaker::BreakerConfig;
use crate::retry::{ConfigError, RetryPolicy};

/// Retry policy parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum number of attempts per call (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound on any backoff delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Backoff growth factor per attempt.
    pub backoff_multiplier: f64,
    /// Symmetric jitter fraction in [0, 1].
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetrySettings {
    /// Convert to a validated runtime policy.
    pub fn to_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let policy = RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        };
        policy.validate()?;
        Ok(policy)
    }
}

/// Circuit breaker parameters (`[breaker]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// Consecutive failures before the circuit opens.
    pub max_failures: u32,
    /// How long the circuit stays open, in milliseconds.
    pub reset_timeout_ms: u64,
    /// Consecutive half-open successes required to close again.
    pub half_open_success_threshold: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_timeout_ms: 30_000,
            half_open_success_threshold: 2,
        }
    }
}

impl BreakerSettings {
    /// Convert to a validated runtime breaker config.
    pub fn to_config(&self) -> Result<BreakerConfig, ConfigError> {
        let config = BreakerConfig {
            max_failures: self.max_failures,
            reset_timeout: Duration::from_millis(self.reset_timeout_ms),
            half_open_success_threshold: self.half_open_success_threshold,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Global configuration loaded from `~/.config/breakwater/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Retry policy; missing section falls back to built-in defaults.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Breaker parameters; missing section falls back to built-in defaults.
    #[serde(default)]
    pub breaker: BreakerSettings,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("breakwater")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ResilienceConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ResilienceConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ResilienceConfig = toml::from_str(&data)?;
    Ok(cfg)
}
