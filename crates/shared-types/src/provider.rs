//! # Provider Lifecycle
//!
//! Every pluggable component (transports, resource managers, crypto,
//! processors) goes through the same three steps:
//!
//! ```text
//! init(config) ──→ open() ──→ ... ──→ close()
//! ```
//!
//! `init` receives the component's `k=v;...` configuration string.

use crate::config::ConfigMap;
use crate::errors::DopResult;
use std::time::Duration;
use tracing::{info, warn};

/// Lifecycle shared by every provider and processor.
pub trait Provider: Send + Sync {
    /// Parse the configuration string.
    fn init(&self, _config: &str) -> DopResult<()> {
        Ok(())
    }

    /// Acquire connections and resources.
    fn open(&self) -> DopResult<()> {
        Ok(())
    }

    /// Release connections and resources.
    fn close(&self) -> DopResult<()> {
        Ok(())
    }
}

/// Retry policy for `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub retries: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 10,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy read from `retrycount`/`rc` and `retrydelay`/`rd` (seconds).
    #[must_use]
    pub fn from_config(config: &ConfigMap) -> Self {
        let base = Self::default();
        let retries = config.get_int(&["retrycount", "rc"], i64::from(base.retries));
        let delay = config.get_int(&["retrydelay", "rd"], 1);
        Self {
            retries: u32::try_from(retries).unwrap_or(0),
            delay: Duration::from_secs(u64::try_from(delay).unwrap_or(0)),
        }
    }
}

/// Open `provider`, retrying recoverable failures with a fixed delay.
///
/// The last failure is returned as non-recoverable.
pub fn open_with_retry<P: Provider + ?Sized>(
    provider: &P,
    name: &str,
    policy: RetryPolicy,
) -> DopResult<()> {
    let mut attempt = 0;
    loop {
        match provider.open() {
            Ok(()) => {
                if attempt > 0 {
                    info!("[Lifecycle] {} opened after {} retries", name, attempt);
                }
                return Ok(());
            }
            Err(e) if e.recoverable && attempt < policy.retries => {
                attempt += 1;
                warn!(
                    code = e.code,
                    "[Lifecycle] Opening {} failed, retry {}/{}: {}",
                    name, attempt, policy.retries, e.msg
                );
                std::thread::sleep(policy.delay);
            }
            Err(e) => return Err(e.rip()),
        }
    }
}
