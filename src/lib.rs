//! # wiki-search
//!
//! Search across any number of MediaWiki sites from one query box.
//!
//! The host hands over a list of wiki URLs. Each one is resolved to the
//! wiki's `api.php` endpoint, and every search is fanned out to all
//! resolved wikis concurrently. Hits are merged into one fuzzy-ranked,
//! bounded result list.
//!
//! ## Design
//!
//! - Endpoint discovery from bare domains, scheme-less or full URLs
//! - MediaWiki detection from the home page HTML, then a known-host table
//!   or probing of common API locations
//! - Atomic registry rebuilds: readers see the old map or the new one
//! - Fuzzy scoring with a minimum threshold and a fixed result cap
//! - In-memory cache of ranked answers, cleared on every rebuild
//! - Graceful degradation: failing wikis are logged and skipped
//!
//! ## Security
//!
//! - No credentials: every request is an anonymous GET
//! - No network listeners; this is a library, not a server
//! - Search queries are logged only at trace level

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod http;
pub mod orchestrator;
pub mod ranked;
pub mod registry;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use config::{Preferences, SearchConfig};
pub use error::{Result, WikiSearchError};
pub use http::{FetchResponse, Fetcher, HttpFetcher};
pub use orchestrator::search::WikiSearch;
pub use ranked::{BoundedRankedCollection, Ranked, Scorable};
pub use registry::{ResolutionSummary, WikiRegistry};
pub use resolver::EndpointResolver;
pub use types::{RankedItem, ResolvedEndpoint, SiteInfo, WikiPage};

/// Resolve a single wiki URL over HTTP with default configuration.
///
/// Convenience wrapper around [`EndpointResolver::resolve`] for one-off
/// lookups outside a [`WikiSearch`].
///
/// # Errors
///
/// Same as [`EndpointResolver::resolve`], plus [`WikiSearchError::Http`]
/// if the HTTP client cannot be built.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> wiki_search::Result<()> {
/// let endpoint = wiki_search::resolve_endpoint("en.wikipedia.org").await?;
/// println!("{}", endpoint.api_url()?);
/// # Ok(())
/// # }
/// ```
pub async fn resolve_endpoint(raw_url: &str) -> Result<ResolvedEndpoint> {
    let fetcher = HttpFetcher::new(&SearchConfig::default())?;
    EndpointResolver::new(std::sync::Arc::new(fetcher))
        .resolve(raw_url)
        .await
}
