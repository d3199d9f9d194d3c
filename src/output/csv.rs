//! CSV summary writer
//!
//! Writes a UTF-8 file with a byte-order mark so spreadsheet tools pick the
//! right encoding. The header is written at creation and every record is
//! flushed as soon as it is written.

use csv::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{summary_header, summary_row, OutputError, OutputResult, OutputWriter, SummaryWriter};
use crate::aggregate::WindowSpec;
use crate::harvester::job::ChannelSummary;

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV writer for channel summaries
pub struct CsvSummaryWriter {
    writer: Writer<BufWriter<File>>,
    columns: usize,
    summaries_written: u64,
}

impl CsvSummaryWriter {
    /// Create the file and write the header for `windows`
    ///
    /// # Arguments
    /// * `path` - Output file path; parent directories are created
    /// * `windows` - Trailing windows, one column group each
    pub fn new<P: AsRef<Path>>(path: P, windows: &[WindowSpec]) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV summary writer: path={}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;

        let mut buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        buf_writer
            .write_all(UTF8_BOM)
            .map_err(|e| OutputError::IoError(format!("Failed to write BOM: {e}")))?;

        let mut writer = Writer::from_writer(buf_writer);
        let header = summary_header(windows);
        writer
            .write_record(&header)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;

        let mut this = Self {
            writer,
            columns: header.len(),
            summaries_written: 0,
        };
        this.flush()?;
        debug!("CSV header written with {} columns", this.columns);
        Ok(this)
    }
}

impl SummaryWriter for CsvSummaryWriter {
    fn write_summary(&mut self, summary: &ChannelSummary) -> OutputResult<()> {
        let row = summary_row(summary);
        if row.len() != self.columns {
            return Err(OutputError::CsvError(format!(
                "record for {} has {} fields, header has {}",
                summary.reference,
                row.len(),
                self.columns
            )));
        }

        self.writer
            .write_record(&row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write summary: {e}")))?;
        self.flush()?;

        self.summaries_written += 1;
        debug!(
            channel_id = %summary.channel_id,
            "Summary written ({} so far)",
            self.summaries_written
        );
        Ok(())
    }

    fn summaries_written(&self) -> u64 {
        self.summaries_written
    }
}

impl OutputWriter for CsvSummaryWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))?;

        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {e}")))?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

        info!(
            "CSV writer closed successfully: {} summaries written",
            self.summaries_written
        );
        Ok(())
    }
}
