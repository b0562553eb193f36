//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] holds the tuning knobs (score threshold, result caps,
//! timeouts, resolver concurrency, cache size). [`Preferences`] holds the
//! values a host's settings screen supplies and that may change at runtime.

use serde::{Deserialize, Serialize};

use crate::error::WikiSearchError;

/// User agent sent with every request, naming the tool and a contact URL.
pub const DEFAULT_USER_AGENT: &str =
    "wiki-search/0.1 (https://crates.io/crates/wiki-search)";

/// Tuning for endpoint resolution and search.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum fuzzy score (0-100) a page needs to be kept.
    pub min_score: u8,
    /// Maximum number of ranked results returned per search.
    pub max_results: usize,
    /// Number of candidate pages requested from each wiki.
    pub per_wiki_limit: usize,
    /// Maximum length of the plain-text extract requested per page.
    pub extract_chars: usize,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// How many URLs are resolved at the same time during a rebuild.
    pub resolve_concurrency: usize,
    /// Maximum number of cached query answers.
    pub cache_entries: u64,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_score: 60,
            max_results: 8,
            per_wiki_limit: 5,
            extract_chars: 50,
            timeout_seconds: 5,
            resolve_concurrency: 4,
            cache_entries: 100,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `min_score` must be at most 100
    /// - `max_results`, `per_wiki_limit` and `resolve_concurrency` must be greater than 0
    /// - `timeout_seconds` must be greater than 0
    pub fn validate(&self) -> Result<(), WikiSearchError> {
        if self.min_score > 100 {
            return Err(WikiSearchError::Config(
                "min_score must be between 0 and 100".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(WikiSearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.per_wiki_limit == 0 {
            return Err(WikiSearchError::Config(
                "per_wiki_limit must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(WikiSearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.resolve_concurrency == 0 {
            return Err(WikiSearchError::Config(
                "resolve_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Settings supplied by the host, already converted to typed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Pipe- or whitespace-separated list of wiki URLs or hostnames.
    pub wiki_urls: String,
    /// Rewrite display titles for readability (`:` and `/` spacing).
    pub improved_titles: bool,
    /// Restrict searches to each wiki's content namespaces.
    pub improved_filters: bool,
}

impl Preferences {
    /// Preferences for the given URL list with both feature flags off.
    pub fn with_urls(wiki_urls: impl Into<String>) -> Self {
        Self {
            wiki_urls: wiki_urls.into(),
            ..Default::default()
        }
    }
}
