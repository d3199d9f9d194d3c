//! Transient failure retries
//!
//! Network and server-side failures are retried with exponential backoff.
//! Once the retries are spent the failure is logged and the operation
//! contributes its empty value, so one bad batch never aborts a channel.
//! A shutdown request ends a backoff wait early with the same empty value.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::config::{calculate_backoff, HarvestConfig};
use super::rate_limit::Throttle;
use crate::fetcher::retry_formatter::RetryContext;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::shutdown::SharedShutdown;

/// Retries transient failures with backoff
#[derive(Clone)]
pub struct TransientRetrier {
    max_retries: u32,
    backoff_base: Duration,
    throttle: Arc<dyn Throttle>,
    shutdown: Option<SharedShutdown>,
}

impl TransientRetrier {
    /// Create a retrier
    pub fn new(max_retries: u32, backoff_base: Duration, throttle: Arc<dyn Throttle>) -> Self {
        Self {
            max_retries,
            backoff_base,
            throttle,
            shutdown: None,
        }
    }

    /// Abandon backoff waits once shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Create a retrier from run configuration
    pub fn from_config(config: &HarvestConfig, throttle: Arc<dyn Throttle>) -> Self {
        Self::new(config.max_retries, config.backoff_base, throttle)
    }

    /// Retries allowed after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `op`, retrying transient failures
    ///
    /// Returns `T::default()` when every attempt failed transiently. Quota,
    /// not-found and unclassified errors are returned immediately.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> FetcherResult<T>
    where
        T: Default,
        F: FnMut() -> Fut,
        Fut: Future<Output = FetcherResult<T>>,
    {
        let max_attempts = self.max_retries + 1;
        let mut attempt = 1;
        let mut last_context: Option<RetryContext> = None;

        loop {
            match op().await {
                Ok(value) => {
                    if let Some(ctx) = last_context {
                        info!("{}", ctx.format_success());
                    }
                    return Ok(value);
                }
                Err(FetcherError::Transient { kind, message }) => {
                    if attempt >= max_attempts {
                        let ctx = RetryContext::new(
                            attempt,
                            max_attempts,
                            kind,
                            Duration::ZERO,
                            operation,
                            message,
                        );
                        warn!("{}", ctx.format_failure());
                        crate::metrics::record_transient_failure(operation);
                        return Ok(T::default());
                    }

                    let backoff = calculate_backoff(self.backoff_base, attempt);
                    attempt += 1;
                    let ctx =
                        RetryContext::new(attempt, max_attempts, kind, backoff, operation, message);
                    warn!("{}", ctx.format_retry());
                    crate::metrics::record_retry(operation, backoff);

                    if !self.wait_backoff(backoff).await {
                        info!(operation, "Shutdown requested; abandoning retries");
                        return Ok(T::default());
                    }
                    last_context = Some(ctx);
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Sleep for `backoff`; `false` when shutdown cut the wait short
    async fn wait_backoff(&self, backoff: Duration) -> bool {
        let Some(shutdown) = &self.shutdown else {
            self.throttle.pause(backoff).await;
            return true;
        };
        if shutdown.is_shutdown_requested() {
            return false;
        }
        tokio::select! {
            _ = self.throttle.pause(backoff) => true,
            _ = shutdown.wait_for_shutdown() => false,
        }
    }
}
