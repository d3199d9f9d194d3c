//! Cursor pagination
//!
//! Collects every page of a listing by following continuation tokens, with
//! a politeness delay between pages and a hard ceiling on the number of pages.
//!
//! Safety mechanisms:
//! - Page ceiling: reaching it truncates the listing without an error
//! - Shutdown checks before every page
//! - A page whose retries were spent arrives as an empty terminal page and
//!   ends the listing with what was collected so far

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::fetcher::{FetcherResult, Page};
use crate::harvester::config::HarvestConfig;
use crate::harvester::rate_limit::{PolitenessDelay, Throttle};
use crate::harvester::session::ApiSession;
use crate::shutdown::SharedShutdown;

/// Collects all pages of a cursor-based listing
#[derive(Clone)]
pub struct PaginatedCollector {
    max_pages: usize,
    delay: PolitenessDelay,
    shutdown: Option<SharedShutdown>,
}

impl PaginatedCollector {
    /// Create a collector; a ceiling of zero is treated as one page
    pub fn new(max_pages: usize, delay: PolitenessDelay) -> Self {
        Self {
            max_pages: max_pages.max(1),
            delay,
            shutdown: None,
        }
    }

    /// Create a collector from run configuration
    pub fn from_config(config: &HarvestConfig, throttle: Arc<dyn Throttle>) -> Self {
        Self::new(
            config.max_pages,
            PolitenessDelay::new(config.page_delay, throttle),
        )
    }

    /// Stop fetching further pages once shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Page ceiling
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
    }

    /// Collect items from `fetch_page` until the cursor runs out
    ///
    /// `fetch_page` receives the previous page's cursor (`None` first).
    /// Items are returned in page order. K fetched pages incur K-1 delays.
    ///
    /// # Errors
    /// Returns the first error produced by `fetch_page`
    pub async fn collect<T, F, Fut>(&self, operation: &str, mut fetch_page: F) -> FetcherResult<Vec<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = FetcherResult<Page<T>>>,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if self.shutdown_requested() {
                info!(operation, pages, "Shutdown requested, stopping pagination");
                break;
            }

            debug!(operation, page = pages + 1, "Fetching page");
            let page = fetch_page(cursor.take()).await?;
            pages += 1;

            debug!(
                operation,
                page = pages,
                received = page.items.len(),
                "Page received"
            );
            items.extend(page.items);

            match page.cursor {
                None => break,
                Some(_) if pages >= self.max_pages => {
                    warn!(
                        operation,
                        max_pages = self.max_pages,
                        collected = items.len(),
                        "Page ceiling reached, listing truncated"
                    );
                    break;
                }
                Some(next) => {
                    cursor = Some(next);
                    self.delay.between_requests().await;
                }
            }
        }

        debug!(
            operation,
            pages,
            total = items.len(),
            "Pagination complete"
        );
        Ok(items)
    }

    /// Collect a listing with every page issued through `session`
    ///
    /// Each page gets quota rotation and transient retries of its own.
    pub async fn collect_with<C, T, F, Fut>(
        &self,
        session: &ApiSession<C>,
        operation: &str,
        fetch_page: F,
    ) -> FetcherResult<Vec<T>>
    where
        F: Fn(Arc<C>, Option<String>) -> Fut,
        Fut: Future<Output = FetcherResult<Page<T>>>,
    {
        let fetch_page = &fetch_page;
        self.collect(operation, move |cursor: Option<String>| async move {
            session
                .call(operation, |client| fetch_page(client, cursor.clone()))
                .await
        })
        .await
    }
}
