//! Unit tests for the summary CSV writer

use std::collections::BTreeMap;

use channel_stats_harvester::aggregate::{AggregationWindow, WindowSpec};
use channel_stats_harvester::harvester::job::ChannelSummary;
use channel_stats_harvester::output::csv::CsvSummaryWriter;
use channel_stats_harvester::output::{summary_header, OutputWriter, SummaryWriter};
use channel_stats_harvester::{COMMENT_COUNT, LIKE_COUNT};
use tempfile::TempDir;

const HEADER: &str = "channel_url,channel_id,channel_title,subscriber_count,uploads,\
avg_view_count,avg_comment_count,restricted_uploads,\
members_only_1m,avg_like_1m,avg_comment_1m,members_only_2m,avg_like_2m,avg_comment_2m";

fn windows() -> Vec<WindowSpec> {
    vec![WindowSpec::months(1), WindowSpec::months(2)]
}

fn window(spec: &WindowSpec, count: usize, likes: f64, comments: f64) -> AggregationWindow {
    let mut field_means = BTreeMap::new();
    field_means.insert(LIKE_COUNT.to_string(), likes);
    field_means.insert(COMMENT_COUNT.to_string(), comments);
    AggregationWindow {
        length_days: spec.length_days,
        label: spec.label.clone(),
        count,
        field_means,
    }
}

fn summary(reference: &str, subscribers: Option<u64>) -> ChannelSummary {
    let specs = windows();
    ChannelSummary {
        reference: reference.to_string(),
        channel_id: "UCMPyGnBgm6l0KiLoxPI8x3A".to_string(),
        title: "Creator, Official".to_string(),
        subscriber_count: subscribers,
        uploads: 3,
        avg_view_count: 1234.5678,
        avg_comment_count: 1.0 / 3.0,
        restricted_uploads: 1,
        windows: vec![
            window(&specs[0], 2, 150.0, 12.25),
            window(&specs[1], 0, 0.0, 0.0),
        ],
    }
}

#[test]
fn test_header_columns_follow_windows() {
    assert_eq!(summary_header(&windows()).join(","), HEADER);
    assert_eq!(summary_header(&[WindowSpec::days(45)]).len(), 11);
}

#[test]
fn test_writes_bom_header_and_rows() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("stats.csv");

    let mut writer = CsvSummaryWriter::new(&path, &windows()).unwrap();
    writer
        .write_summary(&summary("https://www.youtube.com/@creator", Some(98765)))
        .unwrap();
    writer.write_summary(&summary("@hidden", None)).unwrap();
    assert_eq!(writer.summaries_written(), 2);
    writer.close().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));

    let content = String::from_utf8(bytes[3..].to_vec()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER);
    assert_eq!(
        lines[1],
        "https://www.youtube.com/@creator,UCMPyGnBgm6l0KiLoxPI8x3A,\"Creator, Official\",98765,3,\
1234.57,0.33,1,2,150.00,12.25,0,0.00,0.00"
    );
    assert!(
        lines[2].starts_with("@hidden,UCMPyGnBgm6l0KiLoxPI8x3A,\"Creator, Official\",,3,"),
        "hidden subscriber count is left empty"
    );
}

#[test]
fn test_rows_are_on_disk_before_close() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stats.csv");

    let mut writer = CsvSummaryWriter::new(&path, &windows()).unwrap();
    let header_only = std::fs::read_to_string(&path).unwrap();
    assert_eq!(header_only.lines().count(), 1);

    writer.write_summary(&summary("@one", Some(1))).unwrap();
    let after_one = std::fs::read_to_string(&path).unwrap();
    assert_eq!(after_one.lines().count(), 2);

    writer.close().unwrap();
}

#[test]
fn test_mismatched_window_count_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stats.csv");

    let mut writer = CsvSummaryWriter::new(&path, &[WindowSpec::months(1)]).unwrap();
    assert!(writer.write_summary(&summary("@two-windows", Some(1))).is_err());
    assert_eq!(writer.summaries_written(), 0);
}
