//! Quota-aware execution
//!
//! Runs a remote operation against the active credential. A quota rejection
//! advances the pool and re-issues the same operation; any other outcome is
//! returned unchanged.

use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use super::credentials::CredentialPool;
use crate::fetcher::{FetcherError, FetcherResult};

/// Executes operations against the active credential of a pool
pub struct QuotaAwareExecutor<C> {
    pool: Arc<CredentialPool<C>>,
}

impl<C> Clone for QuotaAwareExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<C> QuotaAwareExecutor<C> {
    /// Create an executor over `pool`
    pub fn new(pool: Arc<CredentialPool<C>>) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &Arc<CredentialPool<C>> {
        &self.pool
    }

    /// Run `op` until it succeeds or fails for a reason other than quota
    ///
    /// # Errors
    /// Returns [`FetcherError::QuotaExhausted`] once the last credential is
    /// rejected; other errors from `op` are passed through.
    pub async fn execute<T, F, Fut>(&self, operation: &str, op: F) -> FetcherResult<T>
    where
        F: Fn(Arc<C>) -> Fut,
        Fut: Future<Output = FetcherResult<T>>,
    {
        loop {
            let (index, client) = self.pool.current_with_index();

            match op(client).await {
                Err(FetcherError::QuotaExceeded { reason }) => {
                    warn!(
                        operation,
                        credential = index + 1,
                        reason = %reason,
                        "Quota exceeded on active credential"
                    );

                    if !self.pool.advance_from(index) {
                        return Err(FetcherError::QuotaExhausted {
                            credentials: self.pool.len(),
                        });
                    }
                }
                outcome => return outcome,
            }
        }
    }
}
