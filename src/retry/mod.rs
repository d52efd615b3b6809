//! Retry and backoff policy.
//!
//! This module encapsulates error classification (transient failures vs.
//! permanent rejections), exponential backoff decisions, and the attempt
//! loop itself, so that every transport adapter shares a consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{Classify, ErrorKind};
pub use error::{CallError, ConfigError};
pub use policy::RetryPolicy;
pub use run::RetryExecutor;
