//! # Channel Stats Harvester Library
//!
//! Harvests per-channel engagement statistics from a paginated, quota-limited
//! video platform API and condenses them into period and rolling-window
//! summaries, one record per channel.
//!
//! ## Features
//!
//! - **Credential Rotation**: An ordered pool of API keys, advanced when the
//!   active key reports quota exhaustion
//! - **Transient Retries**: Exponential backoff for network and server-side
//!   failures, best-effort per batch
//! - **Cursor Pagination**: Generic page collection with a politeness delay and
//!   a hard page ceiling
//! - **Batched Details**: Detail lookups in fixed-size id batches
//! - **Channel Resolution**: URL, handle, username and free-text references
//!   mapped to canonical channel ids, memoized per run
//! - **Rolling Windows**: Count and mean statistics over trailing windows in a
//!   fixed reference time zone
//!
//! ## Quick Start
//!
//! ```no_run
//! use channel_stats_harvester::fetcher::youtube_http::{build_http_client, YouTubeHttpClient};
//! use channel_stats_harvester::harvester::credentials::{Credential, CredentialPool};
//! use channel_stats_harvester::harvester::job::{HarvestJob, HarvestPeriod};
//! use channel_stats_harvester::harvester::runner::HarvestRunner;
//! use channel_stats_harvester::output::MemorySummaryWriter;
//! use channel_stats_harvester::ChannelRef;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = build_http_client()?;
//! let credentials = vec![Credential::new("key-1")?, Credential::new("key-2")?];
//! let pool = CredentialPool::new(credentials, move |c: &Credential| {
//!     YouTubeHttpClient::new(http.clone(), c.clone())
//! })?;
//!
//! let job = HarvestJob::new(HarvestPeriod::parse("2025-09-30", "2025-10-06")?);
//! let runner = HarvestRunner::new(Arc::new(pool), job);
//!
//! let channels = vec![ChannelRef::parse("https://www.youtube.com/@SomeCreator")?];
//! let mut sink = MemorySummaryWriter::new();
//! let report = runner.run(&channels, &mut sink).await?;
//! println!("{} channel(s) written", report.processed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`identifier`] - Channel reference classification (id, handle, username, vanity, search)
//! - [`resolver`] - Memoized resolution of references to canonical channel ids
//! - [`fetcher`] - Remote API capability, pagination and batching
//! - [`harvester`] - Credential pool, quota-aware execution, retries and the run loop
//! - [`aggregate`] - Rolling time-window aggregation
//! - [`input`] / [`output`] - Channel list reader and summary CSV writer

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Rolling time-window aggregation
pub mod aggregate;

/// CLI command implementations
pub mod cli;

/// Remote API access
pub mod fetcher;

/// Credential rotation, retries and run orchestration
pub mod harvester;

/// Channel reference classification
pub mod identifier;

/// Channel list input
pub mod input;

/// Observability metrics
pub mod metrics;

/// Summary output writers
pub mod output;

/// Channel reference resolution with a per-run cache
pub mod resolver;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use identifier::ChannelRef;

/// Field name of the view counter in video statistics
pub const VIEW_COUNT: &str = "viewCount";
/// Field name of the like counter in video statistics
pub const LIKE_COUNT: &str = "likeCount";
/// Field name of the comment counter in video statistics
pub const COMMENT_COUNT: &str = "commentCount";

/// Basic channel metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Canonical channel id (e.g., "UCxxxxxxxxxxxxxxxxxxxxxx")
    pub id: String,
    /// Display name
    pub title: String,
    /// Subscriber count, `None` when the channel hides it
    pub subscriber_count: Option<u64>,
}

/// Detail record of a single video
///
/// Every metric is optional: absence carries meaning (comments disabled,
/// restricted content without a public view count).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoDetail {
    /// Video id
    pub id: String,
    /// Publish instant (UTC)
    pub published_at: Option<DateTime<Utc>>,
    /// Privacy status as reported by the API ("public", "unlisted", ...)
    pub privacy_status: Option<String>,
    /// View count
    pub view_count: Option<u64>,
    /// Like count
    pub like_count: Option<u64>,
    /// Comment count
    pub comment_count: Option<u64>,
}

impl VideoDetail {
    /// Look up a numeric statistic by its API field name
    pub fn metric(&self, field: &str) -> Option<u64> {
        match field {
            VIEW_COUNT => self.view_count,
            LIKE_COUNT => self.like_count,
            COMMENT_COUNT => self.comment_count,
            _ => None,
        }
    }

    /// Members-only signal: listed as public, yet no view count is exposed
    pub fn is_restricted(&self) -> bool {
        self.privacy_status.as_deref() == Some("public") && self.view_count.is_none()
    }
}

/// Members-only playlist category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembersCategory {
    /// Every members-only upload
    #[default]
    #[serde(rename = "all")]
    All,
    /// Regular videos only
    #[serde(rename = "videos")]
    Videos,
    /// Shorts only
    #[serde(rename = "shorts")]
    Shorts,
    /// Live streams only
    #[serde(rename = "live")]
    Live,
}

impl MembersCategory {
    /// Playlist id prefix replacing the `UC` channel prefix
    pub fn playlist_prefix(&self) -> &'static str {
        match self {
            MembersCategory::All => "UUMO",
            MembersCategory::Videos => "UUMF",
            MembersCategory::Shorts => "UUMS",
            MembersCategory::Live => "UUMV",
        }
    }

    /// Derive the members-only playlist id for a canonical channel id
    ///
    /// # Errors
    /// Returns an error if the channel id does not start with `UC`
    pub fn playlist_id(&self, channel_id: &str) -> Result<String, String> {
        let core = channel_id
            .strip_prefix("UC")
            .ok_or_else(|| format!("channel id must start with 'UC', got {channel_id}"))?;
        Ok(format!("{}{core}", self.playlist_prefix()))
    }
}

impl std::fmt::Display for MembersCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MembersCategory::All => "all",
            MembersCategory::Videos => "videos",
            MembersCategory::Shorts => "shorts",
            MembersCategory::Live => "live",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MembersCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(MembersCategory::All),
            "videos" => Ok(MembersCategory::Videos),
            "shorts" => Ok(MembersCategory::Shorts),
            "live" => Ok(MembersCategory::Live),
            _ => Err(format!(
                "Invalid members category: {s}. Valid options: all, videos, shorts, live"
            )),
        }
    }
}
