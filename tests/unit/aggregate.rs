//! Unit tests for rolling window aggregation

use channel_stats_harvester::aggregate::{aggregate, TimeWindowAggregator, WindowSpec};
use channel_stats_harvester::{VideoDetail, COMMENT_COUNT, LIKE_COUNT};
use chrono::{Duration, FixedOffset, TimeZone, Utc};

use crate::support::video;

fn tokyo() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

fn default_windows() -> Vec<WindowSpec> {
    vec![WindowSpec::months(1), WindowSpec::months(2)]
}

#[test]
fn test_windows_nest() {
    let now = Utc.with_ymd_and_hms(2025, 10, 7, 3, 0, 0).unwrap();
    let items = vec![
        video("a", now, 10, None, Some(100), Some(10)),
        video("b", now, 40, None, Some(300), Some(30)),
        video("c", now, 70, None, Some(900), Some(90)),
    ];

    let windows = aggregate(&items, now, tokyo(), &default_windows(), &[LIKE_COUNT, COMMENT_COUNT]);

    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0].label, "1m");
    assert_eq!(windows[0].count, 1);
    assert_eq!(windows[0].mean(LIKE_COUNT), 100.0);
    assert_eq!(windows[1].label, "2m");
    assert_eq!(windows[1].count, 2);
    assert_eq!(windows[1].mean(LIKE_COUNT), 200.0);
    assert_eq!(windows[1].mean(COMMENT_COUNT), 20.0);
}

#[test]
fn test_means_use_only_items_carrying_the_field() {
    let now = Utc.with_ymd_and_hms(2025, 10, 7, 3, 0, 0).unwrap();
    let items = vec![
        video("a", now, 1, None, Some(10), None),
        video("b", now, 2, None, Some(20), Some(4)),
        video("c", now, 3, None, None, None),
    ];

    let windows = aggregate(&items, now, tokyo(), &default_windows(), &[LIKE_COUNT, COMMENT_COUNT]);

    assert_eq!(windows[0].count, 3);
    assert_eq!(windows[0].mean(LIKE_COUNT), 15.0);
    assert_eq!(windows[0].mean(COMMENT_COUNT), 4.0);
}

#[test]
fn test_empty_window_reports_zero() {
    let now = Utc.with_ymd_and_hms(2025, 10, 7, 3, 0, 0).unwrap();
    let items = vec![video("old", now, 45, None, Some(10), Some(1))];

    let windows = aggregate(&items, now, tokyo(), &default_windows(), &[LIKE_COUNT, COMMENT_COUNT]);

    assert_eq!(windows[0].count, 0);
    assert_eq!(windows[0].mean(LIKE_COUNT), 0.0);
    assert_eq!(windows[0].mean(COMMENT_COUNT), 0.0);
    assert_eq!(windows[1].count, 1);
}

#[test]
fn test_window_bounds_are_inclusive() {
    let now = Utc.with_ymd_and_hms(2025, 10, 7, 3, 0, 0).unwrap();
    let at_start = VideoDetail {
        id: "edge".to_string(),
        published_at: Some(now - Duration::days(30)),
        like_count: Some(7),
        ..Default::default()
    };
    let at_end = VideoDetail {
        id: "now".to_string(),
        published_at: Some(now),
        like_count: Some(3),
        ..Default::default()
    };
    let just_outside = VideoDetail {
        id: "outside".to_string(),
        published_at: Some(now - Duration::days(30) - Duration::seconds(1)),
        like_count: Some(1000),
        ..Default::default()
    };
    let future = VideoDetail {
        id: "future".to_string(),
        published_at: Some(now + Duration::seconds(1)),
        like_count: Some(1000),
        ..Default::default()
    };

    let windows = aggregate(
        &[at_start, at_end, just_outside, future],
        now,
        tokyo(),
        &[WindowSpec::months(1)],
        &[LIKE_COUNT],
    );

    assert_eq!(windows[0].count, 2);
    assert_eq!(windows[0].mean(LIKE_COUNT), 5.0);
}

#[test]
fn test_items_without_timestamp_are_skipped() {
    let now = Utc.with_ymd_and_hms(2025, 10, 7, 3, 0, 0).unwrap();
    let undated = VideoDetail {
        id: "undated".to_string(),
        like_count: Some(50),
        ..Default::default()
    };
    let dated = video("dated", now, 5, None, Some(10), Some(2));

    let mut aggregator =
        TimeWindowAggregator::new(now, tokyo(), &default_windows(), &[LIKE_COUNT]);
    assert!(!aggregator.push(&undated));
    assert!(aggregator.push(&dated));
    assert_eq!(aggregator.skipped(), 1);

    let windows = aggregator.finish();
    assert_eq!(windows[0].count, 1);
    assert_eq!(windows[0].mean(LIKE_COUNT), 10.0);
}

#[test]
fn test_reference_offset_does_not_shift_the_instant() {
    let now = Utc.with_ymd_and_hms(2025, 10, 7, 3, 0, 0).unwrap();
    let aggregator = TimeWindowAggregator::new(now, tokyo(), &default_windows(), &[LIKE_COUNT]);

    let reference = aggregator.reference_now();
    assert_eq!(reference.with_timezone(&Utc), now);
    assert_eq!(reference.format("%Y-%m-%d %H:%M").to_string(), "2025-10-07 12:00");
}

#[test]
fn test_custom_day_window_label() {
    let now = Utc.with_ymd_and_hms(2025, 10, 7, 3, 0, 0).unwrap();
    let items = vec![video("a", now, 44, None, Some(1), Some(1))];

    let windows = aggregate(&items, now, tokyo(), &[WindowSpec::days(45)], &[LIKE_COUNT]);

    assert_eq!(windows[0].label, "45d");
    assert_eq!(windows[0].count, 1);
    // unconfigured fields read as zero
    assert_eq!(windows[0].mean(COMMENT_COUNT), 0.0);
}

#[test]
fn test_window_longer_than_the_calendar_takes_every_dated_item() {
    let now = Utc.with_ymd_and_hms(2025, 10, 7, 3, 0, 0).unwrap();
    let items = vec![
        video("a", now, 5, None, Some(10), Some(1)),
        video("b", now, 5000, None, Some(30), Some(1)),
    ];
    let windows = [WindowSpec::months(4_000_000), WindowSpec::days(i64::MAX)];

    let result = aggregate(&items, now, tokyo(), &windows, &[LIKE_COUNT]);

    assert_eq!(result[0].count, 2);
    assert_eq!(result[1].count, 2);
    assert_eq!(result[1].mean(LIKE_COUNT), 20.0);
}
