//! Process-lifetime map from wiki host to resolved endpoint.
//!
//! The map is never edited in place. Each [`WikiRegistry::rebuild`]
//! resolves the configured URLs into a fresh [`RegistrySnapshot`] and
//! swaps it in whole, so readers see either the old map or the new one.
//! Rebuilds are numbered; a rebuild that finishes after a newer one has
//! already been installed is discarded.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::stream::{self, StreamExt};

use crate::error::WikiSearchError;
use crate::http::Fetcher;
use crate::resolver::url_parse::parse_raw_url;
use crate::resolver::EndpointResolver;
use crate::types::ResolvedEndpoint;

/// One immutable generation of the registry.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    generation: u64,
    endpoints: BTreeMap<String, Arc<ResolvedEndpoint>>,
}

impl RegistrySnapshot {
    /// Generation number; 0 is the empty registry before any rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Endpoint registered for `host`.
    pub fn get(&self, host: &str) -> Option<&Arc<ResolvedEndpoint>> {
        self.endpoints.get(&host.to_ascii_lowercase())
    }

    /// All endpoints, ordered by host.
    pub fn endpoints(&self) -> impl Iterator<Item = &Arc<ResolvedEndpoint>> {
        self.endpoints.values()
    }

    /// Registered hosts, sorted.
    pub fn hosts(&self) -> Vec<&str> {
        self.endpoints.keys().map(String::as_str).collect()
    }

    /// Number of registered wikis.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no wiki is registered.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// A configured URL that could not be resolved.
#[derive(Debug)]
pub struct ResolutionFailure {
    /// The token as configured.
    pub raw_url: String,
    /// Why it failed.
    pub error: WikiSearchError,
}

/// Outcome of a rebuild.
#[derive(Debug)]
pub struct ResolutionSummary {
    /// Distinct wikis in the resulting map.
    pub resolved: usize,
    /// URL tokens in the configuration.
    pub total: usize,
    /// Generation this rebuild was issued as.
    pub generation: u64,
    /// Whether the result was installed (`false` if a newer rebuild won).
    pub applied: bool,
    /// Tokens that failed to resolve.
    pub failures: Vec<ResolutionFailure>,
}

/// Split a configured URL list on `|` and whitespace, dropping empties.
pub fn split_urls(raw: &str) -> Vec<&str> {
    raw.split(|c: char| c == '|' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Owned tokens from `raw`, keeping only the first one per parsed host.
///
/// Tokens that do not parse are all kept so each is reported as a failure.
fn distinct_by_host(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    split_urls(raw)
        .into_iter()
        .filter(|token| match parse_raw_url(token) {
            Ok(candidate) => seen.insert(candidate.host),
            Err(_) => true,
        })
        .map(str::to_owned)
        .collect()
}

/// Host → endpoint registry with atomic rebuilds.
#[derive(Debug)]
pub struct WikiRegistry<F> {
    resolver: EndpointResolver<F>,
    concurrency: usize,
    issued: AtomicU64,
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl<F: Fetcher> WikiRegistry<F> {
    /// Create an empty registry resolving at most `concurrency` URLs at once.
    pub fn new(fetcher: Arc<F>, concurrency: usize) -> Self {
        Self {
            resolver: EndpointResolver::new(fetcher),
            concurrency: concurrency.max(1),
            issued: AtomicU64::new(0),
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
        }
    }

    /// The currently installed map.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Resolve every URL in `raw_list` and install the result.
    ///
    /// Hosts already registered keep their existing endpoint (and its
    /// loaded site info) instead of being resolved again; hosts no longer
    /// listed are dropped. Individual failures are logged and reported in
    /// the summary, never returned as an error. When the same host is
    /// listed twice, the first occurrence wins and the later ones are
    /// never fetched.
    pub async fn rebuild(&self, raw_list: &str) -> ResolutionSummary {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let total = split_urls(raw_list).len();
        let pending = distinct_by_host(raw_list);
        let previous = self.snapshot();

        tracing::debug!(generation, count = total, "rebuilding wiki registry");

        let outcomes: Vec<(String, Result<Arc<ResolvedEndpoint>, WikiSearchError>)> =
            stream::iter(pending)
                .map(|token| {
                    let previous = Arc::clone(&previous);
                    async move {
                        let outcome = self.resolve_or_reuse(&token, &previous).await;
                        (token, outcome)
                    }
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut endpoints: BTreeMap<String, Arc<ResolvedEndpoint>> = BTreeMap::new();
        let mut failures = Vec::new();
        for (token, outcome) in outcomes {
            match outcome {
                Ok(endpoint) => {
                    endpoints
                        .entry(endpoint.host().to_owned())
                        .or_insert(endpoint);
                }
                Err(error) => {
                    tracing::warn!(url = %token, error = %error, "wiki could not be resolved");
                    failures.push(ResolutionFailure {
                        raw_url: token,
                        error,
                    });
                }
            }
        }

        let resolved = endpoints.len();
        let applied = self.install(RegistrySnapshot {
            generation,
            endpoints,
        });

        if applied {
            tracing::info!(generation, resolved, total, "wiki registry rebuilt");
        } else {
            tracing::debug!(generation, "rebuild superseded, result discarded");
        }

        ResolutionSummary {
            resolved,
            total,
            generation,
            applied,
            failures,
        }
    }

    async fn resolve_or_reuse(
        &self,
        token: &str,
        previous: &RegistrySnapshot,
    ) -> Result<Arc<ResolvedEndpoint>, WikiSearchError> {
        if let Some(existing) = parse_raw_url(token)
            .ok()
            .and_then(|candidate| previous.get(&candidate.host).cloned())
        {
            tracing::trace!(host = existing.host(), "reusing resolved endpoint");
            return Ok(existing);
        }
        self.resolver.resolve(token).await.map(Arc::new)
    }

    /// Swap in `snapshot` unless a newer generation is already installed.
    fn install(&self, snapshot: RegistrySnapshot) -> bool {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.generation > snapshot.generation {
            return false;
        }
        *guard = Arc::new(snapshot);
        true
    }
}
