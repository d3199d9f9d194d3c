//! Summary output writers

use crate::aggregate::WindowSpec;
use crate::harvester::job::ChannelSummary;

pub mod csv;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Sink for per-channel summary records
///
/// Implementations must make each record durable before returning so an
/// interrupted run still leaves a usable artifact.
pub trait SummaryWriter: OutputWriter {
    /// Append one record
    fn write_summary(&mut self, summary: &ChannelSummary) -> OutputResult<()>;

    /// Records written so far
    fn summaries_written(&self) -> u64;
}

/// Column names for a summary table with the given trailing windows
pub fn summary_header(windows: &[WindowSpec]) -> Vec<String> {
    let mut header: Vec<String> = [
        "channel_url",
        "channel_id",
        "channel_title",
        "subscriber_count",
        "uploads",
        "avg_view_count",
        "avg_comment_count",
        "restricted_uploads",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();

    for window in windows {
        header.push(format!("members_only_{}", window.label));
        header.push(format!("avg_like_{}", window.label));
        header.push(format!("avg_comment_{}", window.label));
    }
    header
}

/// Field values of one summary, in [`summary_header`] order
pub fn summary_row(summary: &ChannelSummary) -> Vec<String> {
    let mut row = vec![
        summary.reference.clone(),
        summary.channel_id.clone(),
        summary.title.clone(),
        summary
            .subscriber_count
            .map(|c| c.to_string())
            .unwrap_or_default(),
        summary.uploads.to_string(),
        format!("{:.2}", summary.avg_view_count),
        format!("{:.2}", summary.avg_comment_count),
        summary.restricted_uploads.to_string(),
    ];

    for window in &summary.windows {
        row.push(window.count.to_string());
        row.push(format!("{:.2}", window.mean(crate::LIKE_COUNT)));
        row.push(format!("{:.2}", window.mean(crate::COMMENT_COUNT)));
    }
    row
}

/// Keeps records in memory; for callers that post-process results themselves
#[derive(Debug, Default)]
pub struct MemorySummaryWriter {
    summaries: Vec<ChannelSummary>,
}

impl MemorySummaryWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written so far
    pub fn summaries(&self) -> &[ChannelSummary] {
        &self.summaries
    }

}

impl OutputWriter for MemorySummaryWriter {
    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }

    fn close(self) -> OutputResult<()> {
        Ok(())
    }
}

impl SummaryWriter for MemorySummaryWriter {
    fn write_summary(&mut self, summary: &ChannelSummary) -> OutputResult<()> {
        self.summaries.push(summary.clone());
        Ok(())
    }

    fn summaries_written(&self) -> u64 {
        self.summaries.len() as u64
    }
}
