//! Harvest configuration constants

use std::time::Duration;

/// Page size and id-batch size accepted by the remote list endpoints.
pub const PAGE_SIZE: usize = 50;

/// Detail lookups per call.
pub const BATCH_SIZE: usize = 50;

/// Hard ceiling on pages collected per listing; reaching it truncates silently.
pub const MAX_PAGES: usize = 50;

/// Politeness delay between consecutive pages of one listing (milliseconds).
pub const PAGE_DELAY_MS: u64 = 150;

/// Politeness delay between consecutive detail batches (milliseconds).
pub const BATCH_DELAY_MS: u64 = 150;

/// Retries after the first attempt for transient failures.
pub const MAX_RETRIES: u32 = 3;

/// Backoff base in milliseconds; retry `n` waits `base * 2^n`.
pub const INITIAL_BACKOFF_MS: u64 = 500;

/// Backoff cap in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Reference time zone offset for rolling windows (hours east of UTC).
pub const REFERENCE_OFFSET_HOURS: i32 = 9;

/// Trailing windows reported per channel, in months.
pub const WINDOW_MONTHS: &[u32] = &[1, 2];

/// Longest accepted trailing window, in months.
pub const MAX_WINDOW_MONTHS: u32 = 1200;

/// Accepted reference offsets, in whole hours east of UTC.
pub const REFERENCE_OFFSET_RANGE: std::ops::RangeInclusive<i32> = -12..=14;

/// Days per month in window arithmetic (fixed multiplier, not calendar months).
pub const DAYS_PER_MONTH: i64 = 30;

/// Calculate exponential backoff delay before retry `retry` (1-based)
pub fn calculate_backoff(base: Duration, retry: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry);
    base.saturating_mul(factor).min(Duration::from_millis(MAX_BACKOFF_MS))
}

/// Tunables for one harvest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Hard ceiling on pages per listing
    pub max_pages: usize,
    /// Delay between pages of one listing
    pub page_delay: Duration,
    /// Ids per detail call
    pub batch_size: usize,
    /// Delay between detail batches
    pub batch_delay: Duration,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// Backoff base
    pub backoff_base: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
            page_delay: Duration::from_millis(PAGE_DELAY_MS),
            batch_size: BATCH_SIZE,
            batch_delay: Duration::from_millis(BATCH_DELAY_MS),
            max_retries: MAX_RETRIES,
            backoff_base: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}
