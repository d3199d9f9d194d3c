//! Unit tests for PaginatedCollector

use std::sync::{Arc, Mutex};
use std::time::Duration;

use channel_stats_harvester::fetcher::pagination::PaginatedCollector;
use channel_stats_harvester::fetcher::retry_formatter::RetryErrorType;
use channel_stats_harvester::fetcher::{ChannelApi, FetcherError, FetcherResult, Page, UploadQuery};
use channel_stats_harvester::harvester::config::HarvestConfig;
use channel_stats_harvester::harvester::rate_limit::PolitenessDelay;
use channel_stats_harvester::harvester::session::ApiSession;
use channel_stats_harvester::shutdown::ShutdownCoordinator;
use chrono::{Duration as ChronoDuration, Utc};

use crate::support::{stub_pool, RecordingThrottle, World};

/// Helper struct to track fetch calls
#[derive(Clone)]
struct FetchTracker {
    cursors: Arc<Mutex<Vec<Option<String>>>>,
}

impl FetchTracker {
    fn new() -> Self {
        Self {
            cursors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, cursor: &Option<String>) {
        self.cursors.lock().unwrap().push(cursor.clone());
    }

    fn get_count(&self) -> usize {
        self.cursors.lock().unwrap().len()
    }

    fn cursors(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }
}

fn collector(max_pages: usize, throttle: Arc<RecordingThrottle>) -> PaginatedCollector {
    PaginatedCollector::new(
        max_pages,
        PolitenessDelay::new(Duration::from_millis(150), throttle),
    )
}

/// Page `n` of a listing with `total` pages, two items each
fn numbered_page(cursor: Option<String>, total: usize) -> Page<String> {
    let n: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
    let items = vec![format!("item-{n}-a"), format!("item-{n}-b")];
    let next = (n + 1 < total).then(|| (n + 1).to_string());
    Page::new(items, next)
}

#[tokio::test]
async fn test_collects_all_pages_in_order_with_k_minus_one_delays() {
    let throttle = RecordingThrottle::new();
    let tracker = FetchTracker::new();

    let items = collector(50, throttle.clone())
        .collect("listing", |cursor| {
            tracker.record(&cursor);
            async move { Ok::<_, FetcherError>(numbered_page(cursor, 3)) }
        })
        .await
        .unwrap();

    assert_eq!(
        items,
        vec!["item-0-a", "item-0-b", "item-1-a", "item-1-b", "item-2-a", "item-2-b"]
    );
    assert_eq!(tracker.get_count(), 3);
    assert_eq!(
        tracker.cursors(),
        vec![None, Some("1".to_string()), Some("2".to_string())]
    );
    assert_eq!(throttle.delays(), vec![Duration::from_millis(150); 2]);
}

#[tokio::test]
async fn test_single_page_has_no_delay() {
    let throttle = RecordingThrottle::new();

    let items = collector(50, throttle.clone())
        .collect("listing", |cursor| async move {
            Ok::<_, FetcherError>(numbered_page(cursor, 1))
        })
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(throttle.count(), 0);
}

#[tokio::test]
async fn test_page_ceiling_truncates_without_error() {
    let throttle = RecordingThrottle::new();
    let tracker = FetchTracker::new();

    let items = collector(5, throttle.clone())
        .collect("endless", |cursor| {
            tracker.record(&cursor);
            async move { Ok::<_, FetcherError>(numbered_page(cursor, usize::MAX)) }
        })
        .await
        .unwrap();

    assert_eq!(tracker.get_count(), 5);
    assert_eq!(items.len(), 10);
    assert_eq!(items.last().unwrap(), "item-4-b");
    assert_eq!(throttle.count(), 4);
}

#[tokio::test]
async fn test_error_on_later_page_propagates() {
    let throttle = RecordingThrottle::new();

    let result: FetcherResult<Vec<String>> = collector(50, throttle)
        .collect("listing", |cursor| async move {
            match cursor {
                None => Ok(numbered_page(None, 3)),
                Some(_) => Err(FetcherError::ParseError("bad page".to_string())),
            }
        })
        .await;

    assert!(matches!(result, Err(FetcherError::ParseError(_))));
}

#[tokio::test]
async fn test_shutdown_stops_before_next_page() {
    let throttle = RecordingThrottle::new();
    let shutdown = ShutdownCoordinator::shared();
    let tracker = FetchTracker::new();

    let paginator = collector(50, throttle).with_shutdown(shutdown.clone());
    let items = paginator
        .collect("listing", |cursor| {
            tracker.record(&cursor);
            // stop requested while the first page is in flight
            shutdown.request_shutdown();
            async move { Ok::<_, FetcherError>(numbered_page(cursor, 3)) }
        })
        .await
        .unwrap();

    assert_eq!(tracker.get_count(), 1);
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn test_collect_with_session_keeps_pages_before_spent_retries() {
    let world = World::new()
        .with_upload_pages("UCchannel", vec![vec!["v1", "v2"], vec!["v3"]])
        .shared();
    let pool = stub_pool(&["key-a"], world.clone());
    let throttle = RecordingThrottle::new();
    let config = HarvestConfig {
        max_retries: 1,
        ..HarvestConfig::default()
    };
    let session = ApiSession::from_config(pool, &config, throttle.clone());
    let query = UploadQuery {
        channel_id: "UCchannel".to_string(),
        published_after: Utc::now() - ChronoDuration::days(7),
        published_before: Utc::now(),
    };
    let query = &query;

    let items = collector(50, throttle.clone())
        .collect_with(&session, "search.list uploads", |client, cursor| async move {
            if cursor.is_some() {
                return Err(FetcherError::Transient {
                    kind: RetryErrorType::NetworkTimeout,
                    message: "timed out".to_string(),
                });
            }
            client.search_uploads(query, cursor.as_deref()).await
        })
        .await
        .unwrap();

    // second page failed twice, listing ends with the first page
    assert_eq!(items, vec!["v1", "v2"]);
    assert_eq!(world.calls_to("search_uploads").len(), 1);
    // one politeness delay plus one backoff
    assert_eq!(throttle.count(), 2);
}
