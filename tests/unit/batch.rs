//! Unit tests for BatchFetcher

use std::time::Duration;

use channel_stats_harvester::fetcher::batch::BatchFetcher;
use channel_stats_harvester::fetcher::ChannelApi;
use channel_stats_harvester::harvester::config::HarvestConfig;
use channel_stats_harvester::harvester::session::ApiSession;
use chrono::Utc;

use crate::support::{stub_pool, video, RecordingThrottle, World};

fn ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("vid{i:03}")).collect()
}

fn world_with_videos(count: usize) -> World {
    let now = Utc::now();
    ids(count).iter().fold(World::new(), |world, id| {
        world.with_video(video(id, now, 1, Some(10), Some(1), Some(0)))
    })
}

#[tokio::test]
async fn test_splits_ids_into_ordered_batches() {
    let world = world_with_videos(120).shared();
    let pool = stub_pool(&["key-a"], world.clone());
    let throttle = RecordingThrottle::new();
    let config = HarvestConfig::default();
    let session = ApiSession::from_config(pool, &config, throttle.clone());
    let fetcher = BatchFetcher::from_config(&config, throttle.clone());

    let requested = ids(120);
    let details = fetcher
        .fetch(&session, "videos.list", &requested, |client, chunk| async move {
            client.video_details(&chunk).await
        })
        .await
        .unwrap();

    let calls = world.calls_to("video_details");
    let sizes: Vec<usize> = calls
        .iter()
        .map(|c| c.argument.split(',').count())
        .collect();
    assert_eq!(sizes, vec![50, 50, 20]);

    let returned: Vec<String> = details.into_iter().map(|d| d.id).collect();
    assert_eq!(returned, requested, "batch order is preserved");
    assert_eq!(throttle.delays(), vec![Duration::from_millis(150); 2]);
}

#[tokio::test]
async fn test_exact_multiple_has_no_trailing_batch() {
    let world = world_with_videos(100).shared();
    let pool = stub_pool(&["key-a"], world.clone());
    let throttle = RecordingThrottle::new();
    let config = HarvestConfig::default();
    let session = ApiSession::from_config(pool, &config, throttle.clone());
    let fetcher = BatchFetcher::from_config(&config, throttle);

    let details = fetcher
        .fetch(&session, "videos.list", &ids(100), |client, chunk| async move {
            client.video_details(&chunk).await
        })
        .await
        .unwrap();

    assert_eq!(details.len(), 100);
    assert_eq!(world.calls_to("video_details").len(), 2);
    assert_eq!(fetcher.batch_count(100), 2);
}

#[tokio::test]
async fn test_batch_with_spent_retries_contributes_nothing() {
    // Four failures exhaust the first batch (one attempt plus three retries)
    let world = world_with_videos(120)
        .with_transient_failures("video_details", 4)
        .shared();
    let pool = stub_pool(&["key-a"], world.clone());
    let throttle = RecordingThrottle::new();
    let config = HarvestConfig::default();
    let session = ApiSession::from_config(pool, &config, throttle.clone());
    let fetcher = BatchFetcher::from_config(&config, throttle.clone());

    let details = fetcher
        .fetch(&session, "videos.list", &ids(120), |client, chunk| async move {
            client.video_details(&chunk).await
        })
        .await
        .unwrap();

    assert_eq!(details.len(), 70);
    assert_eq!(details.first().unwrap().id, "vid050");
    assert_eq!(world.calls_to("video_details").len(), 6);
    assert_eq!(
        throttle.delays(),
        vec![
            Duration::from_millis(1000),
            Duration::from_millis(2000),
            Duration::from_millis(4000),
            Duration::from_millis(150),
            Duration::from_millis(150),
        ]
    );
}

#[tokio::test]
async fn test_empty_id_list_makes_no_calls() {
    let world = World::new().shared();
    let pool = stub_pool(&["key-a"], world.clone());
    let throttle = RecordingThrottle::new();
    let config = HarvestConfig::default();
    let session = ApiSession::from_config(pool, &config, throttle.clone());
    let fetcher = BatchFetcher::from_config(&config, throttle);

    let details = fetcher
        .fetch(&session, "videos.list", &[], |client, chunk| async move {
            client.video_details(&chunk).await
        })
        .await
        .unwrap();

    assert!(details.is_empty());
    assert!(world.calls().is_empty());
}
