//! API session: credential pool, quota rotation and retries in one handle

use std::future::Future;
use std::sync::Arc;

use super::config::HarvestConfig;
use super::credentials::CredentialPool;
use super::executor::QuotaAwareExecutor;
use super::rate_limit::Throttle;
use super::retry::TransientRetrier;
use crate::fetcher::FetcherResult;
use crate::shutdown::SharedShutdown;

/// Handle every remote call of a run goes through
pub struct ApiSession<C> {
    executor: QuotaAwareExecutor<C>,
    retrier: TransientRetrier,
}

impl<C> ApiSession<C> {
    /// Create a session
    pub fn new(pool: Arc<CredentialPool<C>>, retrier: TransientRetrier) -> Self {
        Self {
            executor: QuotaAwareExecutor::new(pool),
            retrier,
        }
    }

    /// Create a session with retry settings taken from `config`
    pub fn from_config(
        pool: Arc<CredentialPool<C>>,
        config: &HarvestConfig,
        throttle: Arc<dyn Throttle>,
    ) -> Self {
        Self::new(pool, TransientRetrier::from_config(config, throttle))
    }

    /// Cut retry backoff short once shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.retrier = self.retrier.with_shutdown(shutdown);
        self
    }

    /// The credential pool
    pub fn pool(&self) -> &Arc<CredentialPool<C>> {
        self.executor.pool()
    }

    /// Run `op` with quota rotation inside transient retries
    ///
    /// A rotation does not consume a retry attempt; once retries are spent
    /// the call yields `T::default()`.
    pub async fn call<T, F, Fut>(&self, operation: &str, op: F) -> FetcherResult<T>
    where
        T: Default,
        F: Fn(Arc<C>) -> Fut,
        Fut: Future<Output = FetcherResult<T>>,
    {
        self.retrier
            .run(operation, || self.executor.execute(operation, &op))
            .await
    }
}
