//! Core types: resolved endpoints, site metadata, pages and ranked results.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use url::Url;

use crate::error::WikiSearchError;
use crate::ranked::{Ranked, Scorable};

/// Name of the API entry script under an endpoint's path.
pub const API_SCRIPT: &str = "api.php";

/// A wiki namespace as reported by site info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiNamespace {
    /// Numeric namespace id (0 is the main article namespace).
    pub id: i64,
    /// Localised namespace name; empty for the main namespace.
    pub name: String,
    /// Whether the wiki counts pages in this namespace as content.
    pub has_content: bool,
}

/// Site metadata loaded once per endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    /// Human-readable site name, e.g. `"Wikipedia"`.
    pub site_name: String,
    /// Title of the main/home page.
    pub main_page: String,
    /// Article path template containing `$1`, e.g. `"/wiki/$1"`.
    pub article_path: String,
    /// MediaWiki generator string, e.g. `"MediaWiki 1.41.0"`.
    pub generator: String,
    /// All namespaces of the wiki.
    pub namespaces: Vec<WikiNamespace>,
    /// Name the API sees us as (an IP or anonymous marker when logged out).
    pub user_name: String,
    /// Groups of that user.
    pub groups: Vec<String>,
    /// Rights of that user.
    pub rights: Vec<String>,
}

impl SiteInfo {
    /// Ids of the namespaces the wiki flags as content, main namespace first.
    ///
    /// Falls back to `[0]` when the wiki flags none.
    pub fn content_namespace_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .namespaces
            .iter()
            .filter(|ns| ns.has_content)
            .map(|ns| ns.id)
            .collect();
        if ids.is_empty() {
            ids.push(0);
        }
        ids.sort_unstable();
        ids
    }
}

/// A validated MediaWiki API location.
///
/// Identity is the host. Site metadata is filled in lazily by the first
/// API call that needs it and never changes afterwards.
#[derive(Debug)]
pub struct ResolvedEndpoint {
    host: String,
    scheme: String,
    api_path: String,
    site: OnceCell<SiteInfo>,
}

impl ResolvedEndpoint {
    /// Create an endpoint with no site metadata loaded yet.
    ///
    /// `host` is lowercased. `api_path` is normalised to start and end with `/`.
    pub fn new(host: &str, scheme: &str, api_path: &str) -> Self {
        Self {
            host: host.to_ascii_lowercase(),
            scheme: scheme.to_owned(),
            api_path: normalise_path(api_path),
            site: OnceCell::new(),
        }
    }

    /// Hostname (with `:port` when non-default). This is the identity key.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `http` or `https`, taken from the final URL after redirects.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Directory containing `api.php`, with leading and trailing slash.
    pub fn api_path(&self) -> &str {
        &self.api_path
    }

    /// Origin of the wiki, e.g. `https://en.wikipedia.org`.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Absolute URL of `api.php`.
    ///
    /// # Errors
    ///
    /// Returns [`WikiSearchError::InvalidUrl`] if the parts do not form a URL.
    pub fn api_url(&self) -> Result<Url, WikiSearchError> {
        let raw = format!("{}{}{API_SCRIPT}", self.origin(), self.api_path);
        Url::parse(&raw).map_err(|e| WikiSearchError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Site metadata, if already loaded.
    pub fn site_info(&self) -> Option<&SiteInfo> {
        self.site.get()
    }

    pub(crate) fn site_cell(&self) -> &OnceCell<SiteInfo> {
        &self.site
    }
}

impl PartialEq for ResolvedEndpoint {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.scheme == other.scheme && self.api_path == other.api_path
    }
}

impl Eq for ResolvedEndpoint {}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin(), self.api_path)
    }
}

fn normalise_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{trimmed}/")
    }
}

/// A raw search hit from one wiki.
#[derive(Debug, Clone)]
pub struct WikiPage {
    /// The wiki that produced this hit. Read only.
    pub endpoint: Arc<ResolvedEndpoint>,
    /// Page id on that wiki.
    pub id: u64,
    /// Canonical page title.
    pub title: String,
    /// Title shown to the user (markup stripped, optionally rewritten).
    pub display_title: String,
    /// Short plain-text extract.
    pub extract: String,
    /// Canonical page URL if the API supplied one.
    pub full_url: Option<String>,
}

impl Scorable for WikiPage {
    fn score_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("title", self.display_title.as_str()),
            ("description", self.extract.as_str()),
        ]
    }
}

/// A page admitted into the ranking of one query, with its score.
pub type RankedItem = Ranked<WikiPage>;

impl Ranked<WikiPage> {
    /// Result name shown to the user.
    pub fn name(&self) -> &str {
        &self.item.display_title
    }

    /// `"<site name> - <extract>"`; the host name stands in for an unloaded site name.
    pub fn description(&self) -> String {
        let endpoint = &self.item.endpoint;
        let site = endpoint
            .site_info()
            .map_or(endpoint.host(), |info| info.site_name.as_str());
        format!("{site} - {}", self.item.extract)
    }

    /// Link to the page on its wiki.
    ///
    /// Prefers the URL reported by the API. Otherwise substitutes the
    /// title into the wiki's article path with spaces as underscores and
    /// each path segment percent-encoded.
    pub fn url(&self) -> String {
        if let Some(url) = &self.item.full_url {
            return url.clone();
        }
        let endpoint = &self.item.endpoint;
        let article_path = endpoint
            .site_info()
            .map_or("/wiki/$1", |info| info.article_path.as_str());
        let title = encode_title(&self.item.title);
        format!("{}{}", endpoint.origin(), article_path.replace("$1", &title))
    }
}

/// Encode a page title for use in an article path.
pub fn encode_title(title: &str) -> String {
    title
        .replace(' ', "_")
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
