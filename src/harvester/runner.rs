//! Sequential harvest run
//!
//! Channels are processed one at a time in input order. Each finished
//! channel is appended to the sink before the next one starts, so the output
//! always holds exactly the channels completed so far. Quota exhaustion and
//! interruption end the run; every other per-channel failure skips that
//! channel only.

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::credentials::CredentialPool;
use super::job::{ChannelSummary, HarvestJob};
use super::rate_limit::{Throttle, TokioThrottle};
use super::session::ApiSession;
use super::{HarvestError, HarvestResult};
use crate::aggregate::{MeanAccumulator, TimeWindowAggregator};
use crate::fetcher::batch::BatchFetcher;
use crate::fetcher::pagination::PaginatedCollector;
use crate::fetcher::{ChannelApi, FetcherError};
use crate::identifier::ChannelRef;
use crate::output::SummaryWriter;
use crate::resolver::ChannelResolver;
use crate::shutdown::{SharedShutdown, StopReason};
use crate::{VideoDetail, COMMENT_COUNT, LIKE_COUNT};

/// A channel left out of the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedChannel {
    /// Reference as given in the input
    pub reference: String,
    /// Human-readable cause
    pub reason: String,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// References in the input
    pub total: usize,
    /// Channels written to the output
    pub processed: usize,
    /// Channels skipped, in input order
    pub skipped: Vec<SkippedChannel>,
    /// Set when the run ended before the input did
    pub stop_reason: Option<StopReason>,
}

impl RunReport {
    /// References neither written nor skipped
    pub fn unprocessed(&self) -> usize {
        self.total
            .saturating_sub(self.processed + self.skipped.len())
    }

    /// Whether every reference was handled
    pub fn is_complete(&self) -> bool {
        self.stop_reason.is_none()
    }
}

fn skip_label(err: &HarvestError) -> &'static str {
    match err {
        HarvestError::Resolution(_) => "unresolved",
        HarvestError::ChannelUnavailable(_) => "unavailable",
        _ => "api_error",
    }
}

/// Drives the per-channel pipeline over a list of references
pub struct HarvestRunner<C> {
    session: ApiSession<C>,
    resolver: ChannelResolver,
    paginator: PaginatedCollector,
    batcher: BatchFetcher,
    job: HarvestJob,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
}

impl<C: ChannelApi> HarvestRunner<C> {
    /// Create a runner that waits on the tokio timer
    pub fn new(pool: Arc<CredentialPool<C>>, job: HarvestJob) -> Self {
        Self::with_throttle(pool, job, Arc::new(TokioThrottle))
    }

    /// Create a runner with a custom throttle for every delay and backoff
    pub fn with_throttle(
        pool: Arc<CredentialPool<C>>,
        job: HarvestJob,
        throttle: Arc<dyn Throttle>,
    ) -> Self {
        Self {
            session: ApiSession::from_config(pool, &job.config, throttle.clone()),
            resolver: ChannelResolver::new(),
            paginator: PaginatedCollector::from_config(&job.config, throttle.clone()),
            batcher: BatchFetcher::from_config(&job.config, throttle),
            job,
            shutdown: None,
            progress: None,
        }
    }

    /// Stop between channels and between pages once shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.paginator = self.paginator.with_shutdown(shutdown.clone());
        self.session = self.session.with_shutdown(shutdown.clone());
        self.shutdown = Some(shutdown);
        self
    }

    /// Advance `progress` once per handled reference
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// API session shared by every call of the run
    pub fn session(&self) -> &ApiSession<C> {
        &self.session
    }

    /// Resolution cache
    pub fn resolver(&self) -> &ChannelResolver {
        &self.resolver
    }

    /// Job settings
    pub fn job(&self) -> &HarvestJob {
        &self.job
    }

    fn ensure_running(&self) -> HarvestResult<()> {
        match &self.shutdown {
            Some(s) if s.is_shutdown_requested() => Err(HarvestError::Interrupted),
            _ => Ok(()),
        }
    }

    /// Run the pipeline for one channel
    ///
    /// `now` is the end of every trailing window.
    pub async fn harvest_channel(
        &self,
        reference: &ChannelRef,
        now: DateTime<Utc>,
    ) -> HarvestResult<ChannelSummary> {
        let channel_id = self
            .resolver
            .resolve(&self.session, reference)
            .await?
            .ok_or_else(|| HarvestError::Resolution(reference.raw().to_string()))?;
        self.ensure_running()?;

        let id = channel_id.as_str();
        let info = match self
            .session
            .call("channels.list", |client| async move {
                client.channel_info(id).await
            })
            .await
        {
            Ok(Some(info)) => info,
            Ok(None) | Err(FetcherError::NotFound(_)) => {
                return Err(HarvestError::ChannelUnavailable(channel_id.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            reference = %reference,
            channel_id = %channel_id,
            title = %info.title,
            "Harvesting channel"
        );

        let uploads = self.collect_uploads(&channel_id).await?;
        self.ensure_running()?;
        let details = self.fetch_details("videos.list", &uploads).await?;
        self.ensure_running()?;

        let views: MeanAccumulator = details
            .iter()
            .filter_map(|v| v.view_count)
            .map(|v| v as f64)
            .collect();
        let comments: MeanAccumulator = details
            .iter()
            .filter_map(|v| v.comment_count)
            .map(|v| v as f64)
            .collect();
        let restricted_uploads = details.iter().filter(|v| v.is_restricted()).count();

        let members_only = self.collect_members_only(&channel_id).await?;
        self.ensure_running()?;
        let members_details = self
            .fetch_details("videos.list members", &members_only)
            .await?;
        self.ensure_running()?;

        let mut aggregator = TimeWindowAggregator::new(
            now,
            self.job.reference_offset,
            &self.job.windows,
            &[LIKE_COUNT, COMMENT_COUNT],
        );
        aggregator.extend(&members_details);
        if aggregator.skipped() > 0 {
            debug!(
                channel_id = %channel_id,
                skipped = aggregator.skipped(),
                "Members-only items without publish time skipped"
            );
        }

        Ok(ChannelSummary {
            reference: reference.raw().to_string(),
            channel_id,
            title: info.title,
            subscriber_count: info.subscriber_count,
            uploads: uploads.len(),
            avg_view_count: views.mean(),
            avg_comment_count: comments.mean(),
            restricted_uploads,
            windows: aggregator.finish(),
        })
    }

    async fn collect_uploads(&self, channel_id: &str) -> HarvestResult<Vec<String>> {
        let query = self.job.period.upload_query(channel_id);
        let query = &query;

        let ids = self
            .paginator
            .collect_with(&self.session, "search.list uploads", |client, cursor| async move {
                client.search_uploads(query, cursor.as_deref()).await
            })
            .await?;

        debug!(channel_id, uploads = ids.len(), "In-period uploads collected");
        Ok(ids)
    }

    async fn collect_members_only(&self, channel_id: &str) -> HarvestResult<Vec<String>> {
        let playlist_id = match self.job.members_category.playlist_id(channel_id) {
            Ok(id) => id,
            Err(reason) => {
                debug!(channel_id, "No members-only playlist: {}", reason);
                return Ok(Vec::new());
            }
        };
        let playlist = playlist_id.as_str();

        let ids = match self
            .paginator
            .collect_with(&self.session, "playlistItems.list", |client, cursor| async move {
                client.playlist_items(playlist, cursor.as_deref()).await
            })
            .await
        {
            Ok(ids) => ids,
            Err(FetcherError::NotFound(_)) => {
                debug!(channel_id, playlist, "Members-only playlist not found");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let mut seen = HashSet::new();
        let unique: Vec<String> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        debug!(
            channel_id,
            members_only = unique.len(),
            "Members-only uploads collected"
        );
        Ok(unique)
    }

    async fn fetch_details(
        &self,
        operation: &str,
        ids: &[String],
    ) -> HarvestResult<Vec<VideoDetail>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let details = self
            .batcher
            .fetch(&self.session, operation, ids, |client, chunk| async move {
                client.video_details(&chunk).await
            })
            .await?;
        Ok(details)
    }

    /// Process `references` in order, appending each summary to `sink`
    ///
    /// # Errors
    /// Output failures abort the run. Quota exhaustion and interruption end
    /// it early with `Ok`, recorded in [`RunReport::stop_reason`].
    pub async fn run<W: SummaryWriter>(
        &self,
        references: &[ChannelRef],
        sink: &mut W,
    ) -> HarvestResult<RunReport> {
        let now = self.job.reference_now.unwrap_or_else(Utc::now);
        let mut report = RunReport {
            total: references.len(),
            ..RunReport::default()
        };

        info!(
            channels = references.len(),
            from = %self.job.period.start(),
            to = %self.job.period.end(),
            credentials = self.session.pool().len(),
            "Starting harvest"
        );

        for (position, reference) in references.iter().enumerate() {
            if self.ensure_running().is_err() {
                warn!(
                    remaining = references.len() - position,
                    "Shutdown requested, stopping before next channel"
                );
                report.stop_reason = Some(StopReason::Interrupted);
                break;
            }

            if let Some(pb) = &self.progress {
                pb.set_message(reference.raw().to_string());
            }

            match self.harvest_channel(reference, now).await {
                Ok(summary) => {
                    sink.write_summary(&summary)?;
                    report.processed += 1;
                    crate::metrics::record_channel_processed();
                    info!(
                        reference = %reference,
                        uploads = summary.uploads,
                        "Channel written ({}/{})",
                        position + 1,
                        references.len()
                    );
                }
                Err(HarvestError::QuotaExhausted { credentials }) => {
                    error!(
                        reference = %reference,
                        credentials,
                        "All credentials exhausted their quota, stopping run"
                    );
                    report.stop_reason = Some(StopReason::QuotaExhausted);
                    break;
                }
                Err(HarvestError::Interrupted) => {
                    warn!(reference = %reference, "Interrupted, channel not written");
                    report.stop_reason = Some(StopReason::Interrupted);
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(reference = %reference, error = %e, "Skipping channel");
                    crate::metrics::record_channel_skipped(skip_label(&e));
                    report.skipped.push(SkippedChannel {
                        reference: reference.raw().to_string(),
                        reason: e.to_string(),
                    });
                }
            }

            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        info!(
            processed = report.processed,
            skipped = report.skipped.len(),
            stop_reason = ?report.stop_reason,
            "Harvest finished"
        );
        Ok(report)
    }
}
