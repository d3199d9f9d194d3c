//! Harvest orchestration
//!
//! Everything between a list of channel references and a summary file:
//! the credential pool, quota-aware execution, transient retries and the
//! sequential per-channel run loop.

pub mod config;
pub mod credentials;
pub mod executor;
pub mod job;
pub mod rate_limit;
pub mod retry;
pub mod runner;
pub mod session;

use crate::fetcher::FetcherError;
use crate::input::InputError;
use crate::output::OutputError;

/// Harvest errors
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Invalid or missing configuration (credentials, dates, windows)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every credential was rejected for quota reasons; the run cannot continue
    #[error("all {credentials} credential(s) exhausted their quota")]
    QuotaExhausted {
        /// Number of credentials in the pool
        credentials: usize,
    },

    /// A channel reference could not be mapped to a canonical id
    #[error("could not resolve channel reference: {0}")]
    Resolution(String),

    /// The channel id resolved but the channel itself is unavailable
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// Shutdown was requested while the channel was in flight
    #[error("interrupted")]
    Interrupted,

    /// Unrecoverable remote failure
    #[error("fetch failed: {0}")]
    Fetcher(FetcherError),

    /// Summary output failure
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Channel list failure
    #[error(transparent)]
    Input(#[from] InputError),
}

impl HarvestError {
    /// Whether the error ends the whole run rather than one channel
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarvestError::QuotaExhausted { .. }
                | HarvestError::Interrupted
                | HarvestError::Configuration(_)
                | HarvestError::Output(_)
                | HarvestError::Input(_)
        )
    }
}

// Pool exhaustion surfaces as its own variant so callers can stop the run.
impl From<FetcherError> for HarvestError {
    fn from(err: FetcherError) -> Self {
        match err {
            FetcherError::QuotaExhausted { credentials } => {
                HarvestError::QuotaExhausted { credentials }
            }
            other => HarvestError::Fetcher(other),
        }
    }
}

/// Result type for harvest operations
pub type HarvestResult<T> = Result<T, HarvestError>;
