//! Retry policy with exponential backoff and jitter, used by every storage
//! backend and by the downloader's per-blob fetch loop.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{BackendError, Result};

/// Exponential backoff configuration, overridable via `CFS_*` environment
/// variables so an operator can tune retry behavior without a rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the first try.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Backoff ceiling; the multiplier stops growing it past this.
    pub max_backoff: Duration,
    /// Backoff growth factor applied after each failed attempt.
    pub multiplier: f64,
    /// Add up to 30% random jitter to each backoff to avoid thundering herds.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Build from `CFS_MAX_RETRIES`, `CFS_RETRY_BACKOFF_MS`,
    /// `CFS_MAX_BACKOFF_SECS`, `CFS_BACKOFF_MULTIPLIER`, `CFS_RETRY_JITTER`,
    /// falling back to [`RetryPolicy::default`] for any variable that is
    /// unset or fails to parse.
    #[must_use]
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_attempts: std::env::var("CFS_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_attempts),
            initial_backoff: std::env::var("CFS_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(default.initial_backoff, Duration::from_millis),
            max_backoff: std::env::var("CFS_MAX_BACKOFF_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(default.max_backoff, Duration::from_secs),
            multiplier: std::env::var("CFS_BACKOFF_MULTIPLIER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.multiplier),
            jitter: std::env::var("CFS_RETRY_JITTER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.jitter),
        }
    }

    /// Run `f`, retrying while the error reports
    /// [`BackendError::should_retry`] and attempts remain.
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.should_retry() || attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "retrying after transient failure");

                    let mut delay = backoff;
                    if self.jitter {
                        let jitter_fraction = rand::rng().random_range(0.0..0.3);
                        #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
                        let jitter_ms = (delay.as_millis() as f64 * jitter_fraction) as u64;
                        delay += Duration::from_millis(jitter_ms);
                    }
                    tokio::time::sleep(delay).await;

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );
                }
            }
        }
    }
}
