//! Harvest job structures and per-channel result records

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

use super::config::{
    HarvestConfig, MAX_WINDOW_MONTHS, REFERENCE_OFFSET_HOURS, REFERENCE_OFFSET_RANGE, WINDOW_MONTHS,
};
use super::{HarvestError, HarvestResult};
use crate::aggregate::{AggregationWindow, WindowSpec};
use crate::fetcher::UploadQuery;
use crate::MembersCategory;

/// Calendar period, both dates inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl HarvestPeriod {
    /// Create a period from inclusive calendar dates
    ///
    /// # Errors
    /// Returns a configuration error if `end` is before `start`
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> HarvestResult<Self> {
        if end < start {
            return Err(HarvestError::Configuration(format!(
                "period end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` dates
    pub fn parse(start: &str, end: &str) -> HarvestResult<Self> {
        Self::from_dates(parse_date(start)?, parse_date(end)?)
    }

    /// First day
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive lower bound: start date at 00:00 UTC
    pub fn published_after(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Exclusive upper bound: the day after the end date at 00:00 UTC
    pub fn published_before(&self) -> DateTime<Utc> {
        (self.end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
    }

    /// Upload listing filter for `channel_id`
    pub fn upload_query(&self, channel_id: &str) -> UploadQuery {
        UploadQuery {
            channel_id: channel_id.to_string(),
            published_after: self.published_after(),
            published_before: self.published_before(),
        }
    }
}

fn parse_date(raw: &str) -> HarvestResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
        HarvestError::Configuration(format!("invalid date '{raw}' (expected YYYY-MM-DD): {e}"))
    })
}

/// Reference offset from whole hours east of UTC
pub fn reference_offset(hours: i32) -> HarvestResult<FixedOffset> {
    Some(hours)
        .filter(|h| REFERENCE_OFFSET_RANGE.contains(h))
        .and_then(|h| h.checked_mul(3600))
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            HarvestError::Configuration(format!(
                "reference offset {hours}h is outside {}..={} hours",
                REFERENCE_OFFSET_RANGE.start(),
                REFERENCE_OFFSET_RANGE.end()
            ))
        })
}

/// Everything a run needs besides credentials and channels
#[derive(Debug, Clone)]
pub struct HarvestJob {
    /// Upload period
    pub period: HarvestPeriod,
    /// Trailing windows for members-only statistics
    pub windows: Vec<WindowSpec>,
    /// Members-only playlist category
    pub members_category: MembersCategory,
    /// Time zone the windows are evaluated in
    pub reference_offset: FixedOffset,
    /// Fixed end of the windows; the wall clock at run start when `None`
    pub reference_now: Option<DateTime<Utc>>,
    /// Paging, batching and retry tunables
    pub config: HarvestConfig,
}

impl HarvestJob {
    /// Job with default windows, category, offset and tunables
    pub fn new(period: HarvestPeriod) -> Self {
        Self {
            period,
            windows: WINDOW_MONTHS.iter().map(|m| WindowSpec::months(*m)).collect(),
            members_category: MembersCategory::default(),
            reference_offset: FixedOffset::east_opt(REFERENCE_OFFSET_HOURS * 3600)
                .unwrap_or(Utc.fix()),
            reference_now: None,
            config: HarvestConfig::default(),
        }
    }

    /// Replace the trailing windows
    pub fn with_window_months(mut self, months: &[u32]) -> HarvestResult<Self> {
        if months.contains(&0) {
            return Err(HarvestError::Configuration(
                "window length must be at least one month".to_string(),
            ));
        }
        if let Some(too_long) = months.iter().find(|m| **m > MAX_WINDOW_MONTHS) {
            return Err(HarvestError::Configuration(format!(
                "window length {too_long} exceeds {MAX_WINDOW_MONTHS} months"
            )));
        }
        self.windows = months.iter().map(|m| WindowSpec::months(*m)).collect();
        Ok(self)
    }

    /// Set the members-only category
    pub fn with_members_category(mut self, category: MembersCategory) -> Self {
        self.members_category = category;
        self
    }

    /// Set the reference offset
    pub fn with_reference_offset(mut self, offset: FixedOffset) -> Self {
        self.reference_offset = offset;
        self
    }

    /// Pin the end of the windows
    pub fn with_reference_now(mut self, now: DateTime<Utc>) -> Self {
        self.reference_now = Some(now);
        self
    }

    /// Replace the tunables
    pub fn with_config(mut self, config: HarvestConfig) -> Self {
        self.config = config;
        self
    }
}

/// One output record per successfully processed channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    /// Reference exactly as given in the input
    pub reference: String,
    /// Canonical channel id
    pub channel_id: String,
    /// Display name
    pub title: String,
    /// `None` when the channel hides it
    pub subscriber_count: Option<u64>,
    /// Uploads inside the period
    pub uploads: usize,
    /// Mean view count over in-period uploads that expose one
    pub avg_view_count: f64,
    /// Mean comment count over in-period uploads that expose one
    pub avg_comment_count: f64,
    /// In-period uploads that look members-only
    pub restricted_uploads: usize,
    /// Members-only statistics per trailing window
    pub windows: Vec<AggregationWindow>,
}
