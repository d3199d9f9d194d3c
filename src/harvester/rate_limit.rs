//! Delays between remote calls
//!
//! Two kinds of waiting happen during a run and they must stay separate:
//! the fixed politeness delay between consecutive pages or batches, paid on
//! the success path, and the failure backoff applied by the retrier. Both go
//! through a [`Throttle`] so tests can observe them without sleeping.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

/// Something that can wait
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Wait for `delay`
    async fn pause(&self, delay: Duration);
}

/// Throttle backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioThrottle;

#[async_trait]
impl Throttle for TokioThrottle {
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

/// Fixed delay paid between consecutive requests of one sequence
#[derive(Clone)]
pub struct PolitenessDelay {
    delay: Duration,
    throttle: Arc<dyn Throttle>,
}

impl PolitenessDelay {
    /// Create a politeness delay
    pub fn new(delay: Duration, throttle: Arc<dyn Throttle>) -> Self {
        Self { delay, throttle }
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait before the next request of the sequence
    pub async fn between_requests(&self) {
        trace!("Politeness delay {:?}", self.delay);
        self.throttle.pause(self.delay).await;
    }
}
