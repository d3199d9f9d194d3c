//! Unit tests for credential rotation on quota errors

use channel_stats_harvester::fetcher::{ChannelApi, FetcherError};
use channel_stats_harvester::harvester::config::HarvestConfig;
use channel_stats_harvester::harvester::executor::QuotaAwareExecutor;
use channel_stats_harvester::harvester::session::ApiSession;

use crate::support::{stub_pool, RecordingThrottle, World};

fn credentials_used(world: &World) -> Vec<String> {
    world.calls().into_iter().map(|c| c.credential).collect()
}

#[tokio::test]
async fn test_rotates_past_exhausted_credentials_in_order() {
    let world = World::new()
        .with_channel("UCchannel", "Channel", Some(10))
        .with_budget("key-a", 0)
        .with_budget("key-b", 0)
        .shared();
    let pool = stub_pool(&["key-a", "key-b", "key-c"], world.clone());
    let executor = QuotaAwareExecutor::new(pool.clone());

    let info = executor
        .execute("channels.list", |client| async move {
            client.channel_info("UCchannel").await
        })
        .await
        .unwrap();

    assert_eq!(info.unwrap().title, "Channel");
    assert_eq!(credentials_used(&world), vec!["key-a", "key-b", "key-c"]);
    assert_eq!(pool.active_index(), 2);
}

#[tokio::test]
async fn test_rotation_sticks_for_later_calls() {
    let world = World::new()
        .with_channel("UCchannel", "Channel", Some(10))
        .with_budget("key-a", 1)
        .shared();
    let pool = stub_pool(&["key-a", "key-b"], world.clone());
    let executor = QuotaAwareExecutor::new(pool);

    for _ in 0..3 {
        executor
            .execute("channels.list", |client| async move {
                client.channel_info("UCchannel").await
            })
            .await
            .unwrap();
    }

    // second call hits the spent key once, then key-b serves everything
    assert_eq!(
        credentials_used(&world),
        vec!["key-a", "key-a", "key-b", "key-b"]
    );
}

#[tokio::test]
async fn test_every_credential_tried_once_before_exhaustion() {
    let world = World::new()
        .with_budget("key-a", 0)
        .with_budget("key-b", 0)
        .with_budget("key-c", 0)
        .shared();
    let pool = stub_pool(&["key-a", "key-b", "key-c"], world.clone());
    let executor = QuotaAwareExecutor::new(pool);

    let err = executor
        .execute("channels.list", |client| async move {
            client.channel_info("UCchannel").await
        })
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::QuotaExhausted { credentials: 3 }));
    assert_eq!(credentials_used(&world), vec!["key-a", "key-b", "key-c"]);
}

#[tokio::test]
async fn test_other_errors_do_not_rotate() {
    let world = World::new()
        .with_broken("channel_info", "UCbroken")
        .shared();
    let pool = stub_pool(&["key-a", "key-b"], world.clone());
    let executor = QuotaAwareExecutor::new(pool.clone());

    let err = executor
        .execute("channels.list", |client| async move {
            client.channel_info("UCbroken").await
        })
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::ApiError { status: 400, .. }));
    assert_eq!(pool.active_index(), 0);
    assert_eq!(world.calls().len(), 1);
}

#[tokio::test]
async fn test_rotation_does_not_consume_retries() {
    // key-a is spent, key-b fails transiently once; one retry is enough
    let world = World::new()
        .with_channel("UCchannel", "Channel", None)
        .with_budget("key-a", 0)
        .with_transient_failures("channel_info", 1)
        .shared();
    let pool = stub_pool(&["key-a", "key-b"], world.clone());
    let throttle = RecordingThrottle::new();
    let config = HarvestConfig {
        max_retries: 1,
        ..HarvestConfig::default()
    };
    let session = ApiSession::from_config(pool, &config, throttle.clone());

    let info = session
        .call("channels.list", |client| async move {
            client.channel_info("UCchannel").await
        })
        .await
        .unwrap();

    assert_eq!(info.unwrap().subscriber_count, None);
    assert_eq!(credentials_used(&world), vec!["key-a", "key-b", "key-b"]);
    assert_eq!(throttle.count(), 1, "one backoff, none for the rotation");
}

#[tokio::test]
async fn test_session_surfaces_exhaustion_without_retrying() {
    let world = World::new()
        .with_budget("key-a", 0)
        .with_budget("key-b", 0)
        .shared();
    let pool = stub_pool(&["key-a", "key-b"], world.clone());
    let throttle = RecordingThrottle::new();
    let session = ApiSession::from_config(pool, &HarvestConfig::default(), throttle.clone());

    let err = session
        .call("channels.list", |client| async move {
            client.channel_info("UCchannel").await
        })
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::QuotaExhausted { credentials: 2 }));
    assert_eq!(world.calls().len(), 2);
    assert_eq!(throttle.count(), 0);
}
