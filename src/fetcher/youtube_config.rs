//! Video platform endpoint configuration
//!
//! Endpoint paths, request parts and quota costs for the Data API v3.
//! Every call is charged against the calling key's daily allowance; search
//! calls are by far the most expensive.

/// A single API endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Path appended to the base URL (e.g., "/channels")
    pub path: &'static str,
    /// Short name used in logs and metrics (e.g., "channels.list")
    pub name: &'static str,
    /// Quota units charged per call
    pub quota_cost: u64,
}

/// Configuration of the remote API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL for API (e.g., <https://www.googleapis.com/youtube/v3>)
    pub base_url: &'static str,

    /// channels.list
    pub channels: Endpoint,

    /// search.list
    pub search: Endpoint,

    /// playlistItems.list
    pub playlist_items: Endpoint,

    /// videos.list
    pub videos: Endpoint,

    /// Maximum page size / id-list length accepted by list endpoints
    pub max_results: usize,
}

/// Data API v3 configuration
pub const YOUTUBE_API_CONFIG: ApiConfig = ApiConfig {
    base_url: "https://www.googleapis.com/youtube/v3",
    channels: Endpoint {
        path: "/channels",
        name: "channels.list",
        quota_cost: 1,
    },
    search: Endpoint {
        path: "/search",
        name: "search.list",
        quota_cost: 100,
    },
    playlist_items: Endpoint {
        path: "/playlistItems",
        name: "playlistItems.list",
        quota_cost: 1,
    },
    videos: Endpoint {
        path: "/videos",
        name: "videos.list",
        quota_cost: 1,
    },
    max_results: 50,
};
