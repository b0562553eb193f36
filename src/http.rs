//! HTTP fetch capability used by the resolver and the wiki API client.
//!
//! [`Fetcher`] is the seam between the crate and the network: every probe,
//! site-info load and search request goes through it. [`HttpFetcher`] is the
//! production implementation over a shared [`reqwest::Client`].

use std::future::Future;
use std::time::Duration;

use url::Url;

use crate::config::SearchConfig;
use crate::error::WikiSearchError;

/// Maximum number of redirects followed for a single request.
const MAX_REDIRECTS: usize = 10;

/// Response to a GET request.
///
/// Non-2xx statuses are reported here rather than as errors so callers
/// can decide on their own fallbacks.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// URL of the final response after redirects.
    pub final_url: Url,
    /// Response body decoded as text.
    pub body: String,
}

impl FetchResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the response declares an HTML body.
    pub fn is_html(&self) -> bool {
        self.content_type_contains("text/html")
    }

    /// Whether the response declares a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type_contains("application/json")
    }

    fn content_type_contains(&self, needle: &str) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains(needle))
    }
}

/// A GET-only HTTP capability.
///
/// All implementations must be `Send + Sync` so resolutions and wiki
/// queries can run concurrently against one shared fetcher.
pub trait Fetcher: Send + Sync {
    /// Issue a GET request for `url` with `params` appended to its query string.
    ///
    /// # Errors
    ///
    /// Returns [`WikiSearchError::Http`] on transport failure or timeout.
    fn get(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> impl Future<Output = Result<FetchResponse, WikiSearchError>> + Send;
}

/// [`Fetcher`] backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher using the timeout and User-Agent from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`WikiSearchError::Http`] if the client cannot be constructed.
    pub fn new(config: &SearchConfig) -> Result<Self, WikiSearchError> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

impl Fetcher for HttpFetcher {
    async fn get(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<FetchResponse, WikiSearchError> {
        tracing::trace!(%url, "GET");

        let mut request = self.client.get(url.clone());
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request
            .send()
            .await
            .map_err(|e| WikiSearchError::Http(format!("request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response
            .text()
            .await
            .map_err(|e| WikiSearchError::Http(format!("reading {url} failed: {e}")))?;

        tracing::trace!(%final_url, status, bytes = body.len(), "response received");

        Ok(FetchResponse {
            status,
            content_type,
            final_url,
            body,
        })
    }
}

/// Build a [`reqwest::Client`] configured for polite wiki access.
///
/// The client has:
/// - Timeout from config
/// - The configured identifying User-Agent
/// - Redirect following (limited), so the final URL reflects HTTPS upgrades
/// - Brotli and gzip decompression
///
/// # Errors
///
/// Returns [`WikiSearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, WikiSearchError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| WikiSearchError::Http(format!("failed to build HTTP client: {e}")))
}
