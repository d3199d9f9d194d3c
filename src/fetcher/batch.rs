//! Batched detail lookups

use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::fetcher::FetcherResult;
use crate::harvester::config::HarvestConfig;
use crate::harvester::rate_limit::{PolitenessDelay, Throttle};
use crate::harvester::session::ApiSession;

/// Splits an id list into fixed-size batches and fetches them in order
#[derive(Clone)]
pub struct BatchFetcher {
    batch_size: usize,
    delay: PolitenessDelay,
}

impl BatchFetcher {
    /// Create a batch fetcher; a size of zero is treated as one
    pub fn new(batch_size: usize, delay: PolitenessDelay) -> Self {
        Self {
            batch_size: batch_size.max(1),
            delay,
        }
    }

    /// Create a batch fetcher from run configuration
    pub fn from_config(config: &HarvestConfig, throttle: Arc<dyn Throttle>) -> Self {
        Self::new(
            config.batch_size,
            PolitenessDelay::new(config.batch_delay, throttle),
        )
    }

    /// Ids per remote call
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of remote calls needed for `count` ids
    pub fn batch_count(&self, count: usize) -> usize {
        count.div_ceil(self.batch_size)
    }

    /// Fetch details for `ids`, one session call per batch
    ///
    /// Results keep batch order. A batch whose retries were spent contributes
    /// nothing and the remaining batches still run.
    ///
    /// # Errors
    /// Returns quota exhaustion and unclassified errors immediately
    pub async fn fetch<C, T, F, Fut>(
        &self,
        session: &ApiSession<C>,
        operation: &str,
        ids: &[String],
        fetch_batch: F,
    ) -> FetcherResult<Vec<T>>
    where
        F: Fn(Arc<C>, Vec<String>) -> Fut,
        Fut: Future<Output = FetcherResult<Vec<T>>>,
    {
        let total = self.batch_count(ids.len());
        let mut results = Vec::with_capacity(ids.len());

        for (index, chunk) in ids.chunks(self.batch_size).enumerate() {
            if index > 0 {
                self.delay.between_requests().await;
            }

            let label = format!("{operation} batch {}/{total}", index + 1);
            let batch = session
                .call(&label, |client| fetch_batch(client, chunk.to_vec()))
                .await?;

            debug!(
                operation,
                batch = index + 1,
                requested = chunk.len(),
                received = batch.len(),
                "Batch fetched"
            );
            results.extend(batch);
        }

        Ok(results)
    }
}
