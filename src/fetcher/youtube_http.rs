//! HTTP implementation of [`ChannelApi`]
//!
//! One [`YouTubeHttpClient`] is bound to one API key. Requests are issued
//! exactly once: retries and key rotation live in the harvester layer, so this
//! client only has to classify what went wrong.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::fetcher::retry_formatter::{classify_status, classify_transport, FailureClass};
use crate::fetcher::youtube_config::{ApiConfig, Endpoint, YOUTUBE_API_CONFIG};
use crate::fetcher::youtube_parser::YouTubeParser;
use crate::fetcher::{ChannelApi, FetcherError, FetcherResult, Page, UploadQuery};
use crate::harvester::credentials::Credential;
use crate::{ChannelInfo, VideoDetail};

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds) - overall time for the entire request
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Build the HTTP client shared by every per-key API client
///
/// Explicit timeouts keep a stalled connection from hanging the run.
pub fn build_http_client() -> FetcherResult<Arc<Client>> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .build()
        .map(Arc::new)
        .map_err(|e| {
            FetcherError::HttpClient(format!(
                "Failed to build HTTP client: {e}. Check system TLS configuration."
            ))
        })
}

/// API client bound to a single credential
pub struct YouTubeHttpClient {
    client: Arc<Client>,
    base_url: String,
    credential: Credential,
    config: &'static ApiConfig,
}

impl YouTubeHttpClient {
    /// Create a client against the production base URL
    pub fn new(client: Arc<Client>, credential: Credential) -> Self {
        Self::new_with_base_url(client, YOUTUBE_API_CONFIG.base_url, credential)
    }

    /// Create a client against a custom base URL (for testing)
    pub fn new_with_base_url(
        client: Arc<Client>,
        base_url: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credential,
            config: &YOUTUBE_API_CONFIG,
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Masked form of the bound credential, safe for logs
    pub fn credential_hint(&self) -> String {
        self.credential.masked()
    }

    /// Execute a GET request and return the decoded JSON body
    async fn get(&self, endpoint: Endpoint, params: &[(&str, String)]) -> FetcherResult<Value> {
        let url = format!("{}{}", self.base_url, endpoint.path);
        debug!(
            endpoint = endpoint.name,
            key = %self.credential.masked(),
            "GET {} with {} params",
            url,
            params.len()
        );

        let started = Instant::now();
        let result = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.credential.expose())])
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let e = e.without_url();
                crate::metrics::record_api_request(
                    endpoint.name,
                    endpoint.quota_cost,
                    None,
                    started.elapsed(),
                );
                return Err(FetcherError::Transient {
                    kind: classify_transport(&e),
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        crate::metrics::record_api_request(
            endpoint.name,
            endpoint.quota_cost,
            Some(status.as_u16()),
            started.elapsed(),
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        response.json::<Value>().await.map_err(|e| {
            FetcherError::ParseError(format!(
                "Failed to deserialize {} response: {}",
                endpoint.name,
                e.without_url()
            ))
        })
    }
}

/// Map a non-success response onto the error taxonomy
pub fn classify_failure(status: StatusCode, body: &str) -> FetcherError {
    let (reason, message) = YouTubeParser::parse_error_body(body);

    match classify_status(status, reason.as_deref()) {
        FailureClass::Quota => FetcherError::QuotaExceeded {
            reason: reason.unwrap_or_default(),
        },
        FailureClass::Transient(kind) => FetcherError::Transient {
            kind,
            message: format!("{status}: {message}"),
        },
        FailureClass::NotFound => FetcherError::NotFound(message),
        FailureClass::Unclassified => FetcherError::ApiError {
            status: status.as_u16(),
            reason: reason.unwrap_or_default(),
            message,
        },
    }
}

#[async_trait]
impl ChannelApi for YouTubeHttpClient {
    async fn channel_id_for_handle(&self, handle: &str) -> FetcherResult<Option<String>> {
        let handle = if handle.starts_with('@') {
            handle.to_string()
        } else {
            format!("@{handle}")
        };
        let params = [("part", "id".to_string()), ("forHandle", handle)];
        let response = self.get(self.config.channels, &params).await?;
        YouTubeParser::parse_first_channel_id(&response)
    }

    async fn channel_id_for_username(&self, username: &str) -> FetcherResult<Option<String>> {
        let params = [
            ("part", "id".to_string()),
            ("forUsername", username.to_string()),
        ];
        let response = self.get(self.config.channels, &params).await?;
        YouTubeParser::parse_first_channel_id(&response)
    }

    async fn search_channel(&self, query: &str) -> FetcherResult<Option<String>> {
        let params = [
            ("part", "snippet".to_string()),
            ("q", query.to_string()),
            ("type", "channel".to_string()),
            ("maxResults", "1".to_string()),
        ];
        let response = self.get(self.config.search, &params).await?;
        YouTubeParser::parse_search_channel(&response)
    }

    async fn channel_info(&self, channel_id: &str) -> FetcherResult<Option<ChannelInfo>> {
        let params = [
            ("part", "snippet,statistics".to_string()),
            ("id", channel_id.to_string()),
            ("maxResults", "1".to_string()),
        ];
        let response = self.get(self.config.channels, &params).await?;
        YouTubeParser::parse_channel_info(&response)
    }

    async fn search_uploads(
        &self,
        query: &UploadQuery,
        cursor: Option<&str>,
    ) -> FetcherResult<Page<String>> {
        let mut params = vec![
            ("part", "id".to_string()),
            ("channelId", query.channel_id.clone()),
            ("type", "video".to_string()),
            ("order", "date".to_string()),
            ("publishedAfter", query.after_rfc3339()),
            ("publishedBefore", query.before_rfc3339()),
            ("maxResults", self.config.max_results.to_string()),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token.to_string()));
        }

        let response = self.get(self.config.search, &params).await?;
        YouTubeParser::parse_search_video_page(&response)
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> FetcherResult<Page<String>> {
        let mut params = vec![
            ("part", "contentDetails".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", self.config.max_results.to_string()),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token.to_string()));
        }

        let response = self.get(self.config.playlist_items, &params).await?;
        YouTubeParser::parse_playlist_page(&response)
    }

    async fn video_details(&self, ids: &[String]) -> FetcherResult<Vec<VideoDetail>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > self.config.max_results {
            return Err(FetcherError::ApiError {
                status: 400,
                reason: "tooManyIds".to_string(),
                message: format!(
                    "{} ids requested, at most {} allowed per call",
                    ids.len(),
                    self.config.max_results
                ),
            });
        }

        let params = [
            ("part", "snippet,statistics,status".to_string()),
            ("id", ids.join(",")),
            ("maxResults", self.config.max_results.to_string()),
        ];
        let response = self.get(self.config.videos, &params).await?;
        YouTubeParser::parse_video_details(&response)
    }
}
