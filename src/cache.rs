//! In-memory LRU cache of ranked search answers.
//!
//! Caches the final ranked results keyed by the normalised query, the
//! registry generation they were computed against, and the feature flags
//! that shaped them. Uses [`moka`] for async-friendly caching with a fixed
//! entry bound and automatic eviction.
//!
//! Keying by generation means an answer computed against a superseded
//! registry can never be served, even if it is inserted after the rebuild
//! that cleared the cache.

use moka::future::Cache;

use crate::types::RankedItem;

/// Cache key: normalised query plus everything the answer depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Lowercased, trimmed query string.
    query: String,
    /// Registry generation the answer was computed against.
    generation: u64,
    /// Whether display titles were rewritten.
    improved_titles: bool,
    /// Whether the search was restricted to content namespaces.
    improved_filters: bool,
}

impl CacheKey {
    /// Build a cache key. The query is lowercased and trimmed.
    pub fn new(query: &str, generation: u64, improved_titles: bool, improved_filters: bool) -> Self {
        Self {
            query: normalise_query(query),
            generation,
            improved_titles,
            improved_filters,
        }
    }

    /// The normalised query text.
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Lowercase and trim a query for use as a cache key.
pub fn normalise_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Bounded cache of ranked answers, owned by one [`WikiSearch`](crate::WikiSearch).
#[derive(Debug, Clone)]
pub struct QueryCache {
    inner: Cache<CacheKey, Vec<RankedItem>>,
}

impl QueryCache {
    /// Create a cache holding at most `max_entries` answers.
    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    /// Look up a cached answer.
    ///
    /// Returns `Some(results)` on cache hit, `None` on miss.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<RankedItem>> {
        self.inner.get(key).await
    }

    /// Store an answer.
    pub async fn insert(&self, key: CacheKey, results: Vec<RankedItem>) {
        self.inner.insert(key, results).await;
    }

    /// Drop every cached answer.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}
