//! Error types for the wiki-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. Resolution and query errors are per-URL or
//! per-endpoint; nothing here is fatal to the host process.

/// Errors that can occur while resolving wikis or searching them.
#[derive(Debug, thiserror::Error)]
pub enum WikiSearchError {
    /// Input is neither a valid URL nor a valid domain.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport failure, non-2xx status, or non-HTML page after both schemes.
    #[error("site unreachable: {0}")]
    Unreachable(String),

    /// The page was fetched but carries no MediaWiki signature.
    #[error("not a MediaWiki site: {0}")]
    NotMediaWiki(String),

    /// The site looks like MediaWiki but no candidate path answered as an API.
    #[error("MediaWiki API not found: {0}")]
    ApiNotFound(String),

    /// A registered wiki returned an unusable response to a query.
    #[error("wiki query failed: {0}")]
    QueryFailed(String),

    /// An HTTP request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for wiki-search results.
pub type Result<T> = std::result::Result<T, WikiSearchError>;
