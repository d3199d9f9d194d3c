//! Channel list input
//!
//! Reads channel references from a CSV file. The `channel_url` column is used
//! when present, the first column otherwise. The first row is always read
//! as a header. Blank and malformed entries are skipped.

use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::identifier::ChannelRef;

/// Column holding channel references
pub const CHANNEL_COLUMN: &str = "channel_url";

/// Input errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// File could not be opened
    #[error("failed to open channel list {path}: {message}")]
    Open {
        /// Path as given
        path: String,
        /// Underlying error
        message: String,
    },

    /// File is not readable as CSV
    #[error("failed to read channel list: {0}")]
    Csv(String),

    /// File has no header row
    #[error("channel list has no header row")]
    MissingHeader,
}

/// Read channel references from `path`
pub fn read_channel_list(path: &Path) -> Result<Vec<ChannelRef>, InputError> {
    let file = std::fs::File::open(path).map_err(|e| InputError::Open {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let refs = read_channel_refs(file)?;
    info!(
        "Loaded {} channel reference(s) from {}",
        refs.len(),
        path.display()
    );
    Ok(refs)
}

/// Read channel references from any CSV source
///
/// The first row is always a header. Rows that are not valid UTF-8 or not
/// parseable as CSV are skipped with a warning; only an unreadable header
/// fails the read.
pub fn read_channel_refs<R: Read>(source: R) -> Result<Vec<ChannelRef>, InputError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(source);

    let headers = reader
        .byte_headers()
        .map_err(|e| InputError::Csv(e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Err(InputError::MissingHeader);
    }

    let column = match headers.iter().position(|h| {
        String::from_utf8_lossy(h).trim_start_matches('\u{feff}').trim() == CHANNEL_COLUMN
    }) {
        Some(column) => column,
        None => {
            warn!(
                header = %String::from_utf8_lossy(headers.get(0).unwrap_or_default()),
                "No '{}' column; reading the first column and treating row 1 as its header",
                CHANNEL_COLUMN
            );
            0
        }
    };
    debug!(column, "Reading channel references");

    let mut refs = Vec::new();
    let mut malformed = 0usize;
    for (line, record) in reader.byte_records().enumerate() {
        let row = line + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(row, error = %e, "Skipping malformed channel entry");
                malformed += 1;
                continue;
            }
        };
        let field = match record.get(column).map(std::str::from_utf8) {
            Some(Ok(field)) => field,
            Some(Err(_)) => {
                warn!(row, "Skipping channel entry that is not valid UTF-8");
                malformed += 1;
                continue;
            }
            None => {
                debug!(row, "Skipping blank channel entry");
                continue;
            }
        };
        match ChannelRef::parse(field) {
            Ok(reference) => refs.push(reference),
            Err(_) => debug!(row, "Skipping blank channel entry"),
        }
    }

    if malformed > 0 {
        warn!(malformed, "Skipped malformed rows in channel list");
    }
    Ok(refs)
}
