//! Channel reference resolution
//!
//! Maps classified references to canonical channel ids with one remote
//! lookup per strategy. Outcomes, including failures, are cached by the raw
//! reference string for the lifetime of the resolver, so a reference that
//! appears twice in the input costs one lookup.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::fetcher::{ChannelApi, FetcherError};
use crate::harvester::session::ApiSession;
use crate::harvester::{HarvestError, HarvestResult};
use crate::identifier::{ChannelRef, ChannelRefKind};

/// Memoizing resolver from channel references to canonical ids
#[derive(Debug, Default)]
pub struct ChannelResolver {
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl ChannelResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Option<String>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of cached outcomes
    pub fn cached(&self) -> usize {
        self.lock().len()
    }

    /// Cached outcome for `raw`, if any
    pub fn cached_outcome(&self, raw: &str) -> Option<Option<String>> {
        self.lock().get(raw).cloned()
    }

    /// Resolve `reference` to a canonical channel id
    ///
    /// Returns `Ok(None)` when the reference cannot be resolved; that outcome
    /// is cached like a success.
    ///
    /// # Errors
    /// Returns [`HarvestError::QuotaExhausted`] when every credential is spent.
    /// Nothing is cached in that case.
    pub async fn resolve<C>(
        &self,
        session: &ApiSession<C>,
        reference: &ChannelRef,
    ) -> HarvestResult<Option<String>>
    where
        C: ChannelApi,
    {
        if let Some(outcome) = self.cached_outcome(reference.raw()) {
            debug!(reference = %reference, "Resolution cache hit");
            return Ok(outcome);
        }

        let outcome = match lookup(session, reference.kind()).await {
            Ok(outcome) => outcome,
            Err(FetcherError::QuotaExhausted { credentials }) => {
                return Err(HarvestError::QuotaExhausted { credentials });
            }
            Err(e) => {
                warn!(
                    reference = %reference,
                    strategy = reference.kind().strategy(),
                    error = %e,
                    "Channel lookup failed, treating as unresolved"
                );
                None
            }
        };

        match &outcome {
            Some(id) => info!(
                reference = %reference,
                strategy = reference.kind().strategy(),
                channel_id = %id,
                "Resolved channel reference"
            ),
            None => warn!(
                reference = %reference,
                strategy = reference.kind().strategy(),
                "Channel reference did not resolve"
            ),
        }

        self.lock()
            .insert(reference.raw().to_string(), outcome.clone());
        Ok(outcome)
    }
}

/// One remote lookup per strategy; canonical ids need none
async fn lookup<C>(
    session: &ApiSession<C>,
    kind: &ChannelRefKind,
) -> Result<Option<String>, FetcherError>
where
    C: ChannelApi,
{
    match kind {
        ChannelRefKind::CanonicalId(id) => Ok(Some(id.clone())),
        ChannelRefKind::Handle(handle) => {
            session
                .call("channels.list forHandle", |client| async move {
                    client.channel_id_for_handle(handle).await
                })
                .await
        }
        ChannelRefKind::Username(username) => {
            session
                .call("channels.list forUsername", |client| async move {
                    client.channel_id_for_username(username).await
                })
                .await
        }
        ChannelRefKind::VanityPath(name) | ChannelRefKind::FreeText(name) => {
            session
                .call("search.list channel", |client| async move {
                    client.search_channel(name).await
                })
                .await
        }
    }
}
