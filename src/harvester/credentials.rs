//! Credential pool
//!
//! An ordered list of API keys and the client bound to the active one. The
//! active index only moves forward; once the last key is rejected the pool is
//! exhausted for the rest of the run.

use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use super::{HarvestError, HarvestResult};

/// An opaque API key
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key, rejecting blank input
    pub fn new(key: impl Into<String>) -> HarvestResult<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(HarvestError::Configuration(
                "credential cannot be empty".to_string(),
            ));
        }
        Ok(Self(key))
    }

    /// The raw key, for request signing only
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First and last characters only
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}…{tail}")
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// Parse a comma-separated key list (e.g., from `HARVEST_API_KEYS`)
pub fn parse_key_list(raw: &str) -> HarvestResult<Vec<Credential>> {
    raw.split(',').map(Credential::new).collect()
}

/// Load keys from a JSON document under `key`
///
/// The entry may hold a single string or an array of strings.
pub fn load_from_json(path: &Path, key: &str) -> HarvestResult<Vec<Credential>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        HarvestError::Configuration(format!(
            "Failed to read credentials file {}: {e}",
            path.display()
        ))
    })?;

    let document: Value = serde_json::from_str(&raw).map_err(|e| {
        HarvestError::Configuration(format!(
            "Invalid JSON in credentials file {}: {e}",
            path.display()
        ))
    })?;

    match document.get(key) {
        Some(Value::String(single)) => Ok(vec![Credential::new(single.as_str())?]),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .ok_or_else(|| {
                        HarvestError::Configuration(format!(
                            "credential entries under '{key}' must be strings"
                        ))
                    })
                    .and_then(Credential::new)
            })
            .collect(),
        Some(_) => Err(HarvestError::Configuration(format!(
            "'{key}' must be a string or an array of strings"
        ))),
        None => Err(HarvestError::Configuration(format!(
            "credentials file {} has no '{key}' entry",
            path.display()
        ))),
    }
}

type ClientFactory<C> = dyn Fn(&Credential) -> C + Send + Sync;

struct PoolState<C> {
    active_index: usize,
    client: Arc<C>,
}

/// Ordered credentials plus the client bound to the active one
pub struct CredentialPool<C> {
    credentials: Vec<Credential>,
    factory: Box<ClientFactory<C>>,
    state: Mutex<PoolState<C>>,
}

impl<C> CredentialPool<C> {
    /// Create a pool bound to the first credential
    ///
    /// # Errors
    /// Returns a configuration error if `credentials` is empty
    pub fn new<F>(credentials: Vec<Credential>, factory: F) -> HarvestResult<Self>
    where
        F: Fn(&Credential) -> C + Send + Sync + 'static,
    {
        let first = credentials.first().ok_or_else(|| {
            HarvestError::Configuration("credential list is empty".to_string())
        })?;

        let client = Arc::new(factory(first));
        info!("Credential pool ready with {} key(s)", credentials.len());

        Ok(Self {
            state: Mutex::new(PoolState {
                active_index: 0,
                client,
            }),
            credentials,
            factory: Box::new(factory),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        // The state is a plain index and handle, valid even after a panic elsewhere.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of credentials in the pool
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false; an empty pool cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Client bound to the active credential
    pub fn current(&self) -> Arc<C> {
        self.lock().client.clone()
    }

    /// Active index together with its client
    pub fn current_with_index(&self) -> (usize, Arc<C>) {
        let state = self.lock();
        (state.active_index, state.client.clone())
    }

    /// Index of the active credential
    pub fn active_index(&self) -> usize {
        self.lock().active_index
    }

    /// Move to the next credential
    ///
    /// Returns `false` and leaves the pool untouched when already on the last one.
    pub fn advance(&self) -> bool {
        let observed = self.active_index();
        self.advance_from(observed)
    }

    /// Move past `observed` unless another caller already did
    ///
    /// Callers that saw the same credential fail advance the pool once.
    pub fn advance_from(&self, observed: usize) -> bool {
        let mut state = self.lock();

        if state.active_index > observed {
            return true;
        }

        let next = state.active_index + 1;
        let Some(credential) = self.credentials.get(next) else {
            warn!(
                "Credential pool exhausted: all {} key(s) rejected",
                self.credentials.len()
            );
            return false;
        };

        state.client = Arc::new((self.factory)(credential));
        state.active_index = next;
        crate::metrics::record_credential_rotation(next);
        info!(
            "Rotated to credential {}/{} ({})",
            next + 1,
            self.credentials.len(),
            credential.masked()
        );
        true
    }
}
