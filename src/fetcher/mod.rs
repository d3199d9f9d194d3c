//! Remote API access
//!
//! The [`ChannelApi`] trait is the consumed capability: one method per remote
//! call, one instance bound to exactly one credential. Failures are classified
//! into [`FetcherError`] variants so callers can tell quota exhaustion apart
//! from transient and unclassified failures.

use crate::{ChannelInfo, VideoDetail};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

pub mod batch;
pub mod pagination;
pub mod retry_formatter;
pub mod youtube_config;
pub mod youtube_http;
pub mod youtube_parser;

use retry_formatter::RetryErrorType;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// The active credential's usage allowance is depleted
    #[error("quota exceeded: {reason}")]
    QuotaExceeded {
        /// Vendor reason code (e.g., "quotaExceeded")
        reason: String,
    },

    /// Every credential in the pool was rejected for quota reasons
    #[error("all {credentials} credential(s) exhausted their quota")]
    QuotaExhausted {
        /// Number of credentials tried
        credentials: usize,
    },

    /// Network or server-side failure worth retrying
    #[error("transient error ({}): {message}", .kind.description())]
    Transient {
        /// Failure classification
        kind: RetryErrorType,
        /// Original error message
        message: String,
    },

    /// Requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other API error response
    #[error("API error {status} ({reason}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Vendor reason code, empty when missing
        reason: String,
        /// Error message from the response body
        message: String,
    },

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl FetcherError {
    /// Whether this is a per-credential quota rejection
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, FetcherError::QuotaExceeded { .. })
    }

    /// Whether the failure is worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, FetcherError::Transient { .. })
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// One page of a cursor-based listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Continuation token, `None` on the last page
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    /// Create a page
    pub fn new(items: Vec<T>, cursor: Option<String>) -> Self {
        Self { items, cursor }
    }

}

// Empty terminal page; what a page fetch contributes once retries are spent.
impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
        }
    }
}

/// Filter for listing a channel's uploads inside a publish-time range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadQuery {
    /// Canonical channel id
    pub channel_id: String,
    /// Inclusive lower bound
    pub published_after: DateTime<Utc>,
    /// Exclusive upper bound
    pub published_before: DateTime<Utc>,
}

impl UploadQuery {
    /// RFC3339 lower bound with a `Z` suffix
    pub fn after_rfc3339(&self) -> String {
        self.published_after.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// RFC3339 upper bound with a `Z` suffix
    pub fn before_rfc3339(&self) -> String {
        self.published_before.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Remote API capability bound to a single credential
#[async_trait]
pub trait ChannelApi: Send + Sync {
    /// Look up a channel id by `@handle`
    async fn channel_id_for_handle(&self, handle: &str) -> FetcherResult<Option<String>>;

    /// Look up a channel id by legacy username
    async fn channel_id_for_username(&self, username: &str) -> FetcherResult<Option<String>>;

    /// Free-text channel search, first result only
    async fn search_channel(&self, query: &str) -> FetcherResult<Option<String>>;

    /// Fetch title and subscriber count of a channel
    async fn channel_info(&self, channel_id: &str) -> FetcherResult<Option<ChannelInfo>>;

    /// One page of video ids uploaded by a channel inside the query's range
    async fn search_uploads(
        &self,
        query: &UploadQuery,
        cursor: Option<&str>,
    ) -> FetcherResult<Page<String>>;

    /// One page of video ids from a playlist
    async fn playlist_items(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> FetcherResult<Page<String>>;

    /// Detail records for up to one batch of video ids
    async fn video_details(&self, ids: &[String]) -> FetcherResult<Vec<VideoDetail>>;
}
