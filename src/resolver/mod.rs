//! Endpoint resolution: from a raw URL or hostname to a MediaWiki API base.
//!
//! # Pipeline
//!
//! 1. Parse and validate the input ([`url_parse`])
//! 2. Fetch the page over `http` (or the given scheme), retrying once over `https`
//! 3. Adopt the scheme of the final, post-redirect URL
//! 4. Fingerprint the HTML as MediaWiki ([`detect`])
//! 5. Pick the API path from the known-farm table ([`known`]) or by probing
//!    `/`, `/w/` and `/wiki/` for a working `api.php`
//!
//! Every request is a GET, so a failed resolution can be retried from
//! scratch with no cleanup.

pub mod detect;
pub mod known;
pub mod url_parse;

use std::sync::Arc;

use url::Url;

use crate::api::probe_api;
use crate::error::WikiSearchError;
use crate::http::{FetchResponse, Fetcher};
use crate::types::ResolvedEndpoint;

use self::detect::detect_mediawiki;
use self::known::known_api_path;
use self::url_parse::{parse_raw_url, EndpointCandidate};

/// Candidate API directories, most common first.
pub const COMMON_API_PATHS: &[&str] = &["/", "/w/", "/wiki/"];

/// Resolves user-supplied wiki locations into [`ResolvedEndpoint`]s.
#[derive(Debug)]
pub struct EndpointResolver<F> {
    fetcher: Arc<F>,
}

impl<F> Clone for EndpointResolver<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<F: Fetcher> EndpointResolver<F> {
    /// Create a resolver issuing requests through `fetcher`.
    pub fn new(fetcher: Arc<F>) -> Self {
        Self { fetcher }
    }

    /// Resolve `raw_url` to a MediaWiki API endpoint.
    ///
    /// # Errors
    ///
    /// - [`WikiSearchError::InvalidUrl`] if the input is not a URL or domain
    /// - [`WikiSearchError::Unreachable`] if no scheme yields a 2xx HTML page
    /// - [`WikiSearchError::NotMediaWiki`] if the page has no MediaWiki signature
    /// - [`WikiSearchError::ApiNotFound`] if no candidate path hosts `api.php`
    pub async fn resolve(&self, raw_url: &str) -> Result<ResolvedEndpoint, WikiSearchError> {
        tracing::trace!(raw_url, "resolving wiki endpoint");

        let candidate = parse_raw_url(raw_url)?;
        let page = self.fetch_home(&candidate).await?;

        // Sites that redirect to HTTPS resolve to the HTTPS origin.
        let scheme = page.final_url.scheme().to_owned();

        let signal = detect_mediawiki(&page.body)?
            .ok_or_else(|| WikiSearchError::NotMediaWiki(candidate.host.clone()))?;
        tracing::debug!(host = %candidate.host, ?signal, "MediaWiki detected");

        let api_path = self.find_api_path(&candidate, &scheme).await?;
        let endpoint = ResolvedEndpoint::new(&candidate.host, &scheme, &api_path);
        tracing::debug!(%endpoint, "wiki endpoint resolved");
        Ok(endpoint)
    }

    /// Fetch the page the user pointed at, retrying once over `https`.
    ///
    /// The retry also applies to explicit `https` input, so a single
    /// transient failure does not drop the wiki.
    async fn fetch_home(
        &self,
        candidate: &EndpointCandidate,
    ) -> Result<FetchResponse, WikiSearchError> {
        let first_scheme = candidate.scheme.as_deref().unwrap_or("http");
        let mut outcome = self.fetch_with_scheme(candidate, first_scheme).await;

        // Some sites never redirect http to https on their own.
        if !outcome.as_ref().is_ok_and(FetchResponse::is_success) {
            tracing::debug!(host = %candidate.host, "retrying over https");
            outcome = self.fetch_with_scheme(candidate, "https").await;
        }

        match outcome {
            Ok(page) if page.is_success() && page.is_html() => Ok(page),
            Ok(page) => Err(WikiSearchError::Unreachable(format!(
                "{}: HTTP {} ({})",
                candidate.host,
                page.status,
                page.content_type.as_deref().unwrap_or("no content type")
            ))),
            Err(err) => Err(WikiSearchError::Unreachable(format!("{}: {err}", candidate.host))),
        }
    }

    async fn fetch_with_scheme(
        &self,
        candidate: &EndpointCandidate,
        scheme: &str,
    ) -> Result<FetchResponse, WikiSearchError> {
        let url = candidate.url_with_scheme(scheme)?;
        self.fetcher.get(&url, &[]).await
    }

    /// Known-farm table first, then common-path probing.
    async fn find_api_path(
        &self,
        candidate: &EndpointCandidate,
        scheme: &str,
    ) -> Result<String, WikiSearchError> {
        if let Some(path) = known_api_path(hostname(&candidate.host)) {
            tracing::debug!(host = %candidate.host, path, "known wiki farm");
            return Ok(path.to_owned());
        }

        for path in COMMON_API_PATHS {
            let raw = format!("{scheme}://{}{path}", candidate.host);
            let base = Url::parse(&raw)
                .map_err(|e| WikiSearchError::InvalidUrl(format!("{raw}: {e}")))?;
            if probe_api(self.fetcher.as_ref(), &base).await {
                return Ok((*path).to_owned());
            }
            tracing::trace!(host = %candidate.host, path, "no API at path");
        }

        Err(WikiSearchError::ApiNotFound(candidate.host.clone()))
    }
}

/// Host without a trailing `:port`.
fn hostname(authority: &str) -> &str {
    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    }
}
