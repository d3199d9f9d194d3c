//! Response parser for the video platform API
//!
//! Stateless functions converting JSON responses into typed records. List
//! responses share one envelope: `{"items": [...], "nextPageToken": "..."}`.
//! Statistics arrive as decimal strings; a counter that is missing or not a
//! valid integer is treated as absent.

use crate::fetcher::{FetcherError, FetcherResult, Page};
use crate::{ChannelInfo, VideoDetail};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Stateless parser for API responses
pub struct YouTubeParser;

impl YouTubeParser {
    /// Items array of a list response; a missing array is an empty page
    fn items(response: &Value) -> FetcherResult<&[Value]> {
        match response.get("items") {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(FetcherError::ParseError(format!(
                "items is not an array: {other}"
            ))),
        }
    }

    fn next_cursor(response: &Value) -> Option<String> {
        response
            .get("nextPageToken")
            .and_then(|v| v.as_str())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }

    /// Parse the first channel id of a `channels.list` (forHandle/forUsername) response
    pub fn parse_first_channel_id(response: &Value) -> FetcherResult<Option<String>> {
        let Some(first) = Self::items(response)?.first() else {
            return Ok(None);
        };

        let id = first
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetcherError::ParseError("Missing or invalid channel id".to_string()))?;

        Ok(Some(id.to_string()))
    }

    /// Parse the first result of a channel `search.list` response
    pub fn parse_search_channel(response: &Value) -> FetcherResult<Option<String>> {
        let Some(first) = Self::items(response)?.first() else {
            return Ok(None);
        };

        let channel_id = first
            .pointer("/snippet/channelId")
            .or_else(|| first.pointer("/id/channelId"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                FetcherError::ParseError("Missing channelId in search result".to_string())
            })?;

        Ok(Some(channel_id.to_string()))
    }

    /// Parse a `channels.list` response with snippet and statistics parts
    pub fn parse_channel_info(response: &Value) -> FetcherResult<Option<ChannelInfo>> {
        let Some(item) = Self::items(response)?.first() else {
            return Ok(None);
        };

        let id = item
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetcherError::ParseError("Missing or invalid channel id".to_string()))?
            .to_string();

        let title = item
            .pointer("/snippet/title")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetcherError::ParseError("Missing or invalid title".to_string()))?
            .to_string();

        let statistics = item.get("statistics");
        let hidden = statistics
            .and_then(|s| s.get("hiddenSubscriberCount"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let subscriber_count = if hidden {
            None
        } else {
            Some(
                statistics
                    .and_then(|s| Self::parse_count(s.get("subscriberCount")))
                    .unwrap_or(0),
            )
        };

        Ok(Some(ChannelInfo {
            id,
            title,
            subscriber_count,
        }))
    }

    /// Parse a video `search.list` page into video ids
    ///
    /// Results without a `videoId` (channels, playlists) are skipped.
    pub fn parse_search_video_page(response: &Value) -> FetcherResult<Page<String>> {
        let ids = Self::items(response)?
            .iter()
            .filter_map(|item| item.pointer("/id/videoId").and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect();

        Ok(Page::new(ids, Self::next_cursor(response)))
    }

    /// Parse a `playlistItems.list` page into video ids
    pub fn parse_playlist_page(response: &Value) -> FetcherResult<Page<String>> {
        let ids = Self::items(response)?
            .iter()
            .filter_map(|item| {
                item.pointer("/contentDetails/videoId")
                    .or_else(|| item.pointer("/snippet/resourceId/videoId"))
                    .and_then(|v| v.as_str())
            })
            .map(str::to_string)
            .collect();

        Ok(Page::new(ids, Self::next_cursor(response)))
    }

    /// Parse a `videos.list` response into detail records
    pub fn parse_video_details(response: &Value) -> FetcherResult<Vec<VideoDetail>> {
        let items = Self::items(response)?;
        let mut videos = Vec::with_capacity(items.len());

        for item in items {
            let id = item
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| FetcherError::ParseError("Missing or invalid video id".to_string()))?
                .to_string();

            let published_at = match item.pointer("/snippet/publishedAt").and_then(|v| v.as_str())
            {
                Some(raw) => Some(Self::parse_timestamp(raw)?),
                None => None,
            };

            let privacy_status = item
                .pointer("/status/privacyStatus")
                .and_then(|v| v.as_str())
                .map(str::to_string);

            let statistics = item.get("statistics");
            let stat = |field: &str| statistics.and_then(|s| Self::parse_count(s.get(field)));

            videos.push(VideoDetail {
                id,
                published_at,
                privacy_status,
                view_count: stat("viewCount"),
                like_count: stat("likeCount"),
                comment_count: stat("commentCount"),
            });
        }

        Ok(videos)
    }

    /// Parse a counter that may be a decimal string or a JSON number
    pub fn parse_count(value: Option<&Value>) -> Option<u64> {
        match value? {
            Value::String(s) => s.trim().parse::<u64>().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Parse an RFC3339 publish timestamp into UTC
    pub fn parse_timestamp(raw: &str) -> FetcherResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| FetcherError::ParseError(format!("Invalid publishedAt '{raw}': {e}")))
    }

    /// Extract `(reason, message)` from an API error body
    ///
    /// Error bodies look like
    /// `{"error": {"code": 403, "message": "...", "errors": [{"reason": "quotaExceeded"}]}}`.
    pub fn parse_error_body(body: &str) -> (Option<String>, String) {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return (None, body.trim().to_string());
        };

        let reason = value
            .pointer("/error/errors/0/reason")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| body.trim())
            .to_string();

        (reason, message)
    }
}
