//! MediaWiki action API client.
//!
//! Three calls are used:
//!
//! - a `siteinfo` probe, to confirm that a path hosts a working `api.php`
//! - a one-time `siteinfo|userinfo` load per endpoint (site name, main
//!   page, article path, namespaces, user rights)
//! - a `generator=search` query returning page records with extracts
//!
//! Responses use the default JSON format (version 1), where `query.pages`
//! maps page ids to page objects.

use std::collections::HashMap;
use std::sync::Arc;

use scraper::Html;
use serde::Deserialize;
use url::Url;

use crate::error::WikiSearchError;
use crate::http::Fetcher;
use crate::resolver::detect::generator_version;
use crate::types::{ResolvedEndpoint, SiteInfo, WikiNamespace, WikiPage};

/// Oldest MediaWiki release whose API answers the calls made here.
pub const MIN_MEDIAWIKI_VERSION: (u32, u32) = (1, 16);

/// Options for one search request against one wiki.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Maximum pages requested.
    pub limit: usize,
    /// Maximum extract length in characters.
    pub extract_chars: usize,
    /// Namespaces searched.
    pub namespaces: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct SiteInfoResponse {
    query: SiteInfoQuery,
}

#[derive(Debug, Deserialize)]
struct SiteInfoQuery {
    general: RawGeneral,
    #[serde(default)]
    namespaces: HashMap<String, RawNamespace>,
    #[serde(default)]
    userinfo: Option<RawUserInfo>,
}

#[derive(Debug, Deserialize)]
struct RawGeneral {
    sitename: String,
    #[serde(default)]
    mainpage: String,
    #[serde(default)]
    articlepath: Option<String>,
    #[serde(default)]
    generator: String,
}

#[derive(Debug, Deserialize)]
struct RawNamespace {
    id: i64,
    #[serde(rename = "*", alias = "name", default)]
    name: String,
    /// Format 1 marks content namespaces with an empty-string key,
    /// format 2 with a boolean.
    #[serde(default)]
    content: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawUserInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    rights: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    pages: Option<HashMap<String, RawPage>>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    pageid: Option<u64>,
    title: String,
    #[serde(default)]
    displaytitle: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    fullurl: Option<String>,
    /// Rank assigned by the search generator.
    #[serde(default)]
    index: Option<u32>,
}

/// Whether `api.php` under `base` answers a `siteinfo` query.
///
/// Accepts a 2xx JSON response without an `error` member. Transport
/// failures count as "no".
pub async fn probe_api<F: Fetcher>(fetcher: &F, base: &Url) -> bool {
    let Ok(api_url) = base.join(crate::types::API_SCRIPT) else {
        return false;
    };
    let params = [
        ("format", "json"),
        ("action", "query"),
        ("meta", "siteinfo"),
        ("siprop", "general"),
    ];
    let response = match fetcher.get(&api_url, &params).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(url = %api_url, error = %err, "API probe failed");
            return false;
        }
    };
    if !response.is_success() || !response.is_json() {
        return false;
    }
    serde_json::from_str::<serde_json::Value>(&response.body)
        .map(|json| json.get("error").is_none())
        .unwrap_or(false)
}

/// Site metadata for `endpoint`, loading it on first use.
///
/// Concurrent callers share one in-flight load. A failed load is not
/// cached, so the next call retries.
///
/// # Errors
///
/// Returns [`WikiSearchError::QueryFailed`] if the wiki does not answer
/// with well-formed site info.
pub async fn site_info<'a, F: Fetcher>(
    fetcher: &F,
    endpoint: &'a ResolvedEndpoint,
) -> Result<&'a SiteInfo, WikiSearchError> {
    endpoint
        .site_cell()
        .get_or_try_init(|| load_site_info(fetcher, endpoint))
        .await
}

async fn load_site_info<F: Fetcher>(
    fetcher: &F,
    endpoint: &ResolvedEndpoint,
) -> Result<SiteInfo, WikiSearchError> {
    let api_url = endpoint.api_url()?;
    let params = [
        ("format", "json"),
        ("action", "query"),
        ("meta", "siteinfo|userinfo"),
        ("siprop", "general|namespaces"),
        ("uiprop", "groups|rights"),
    ];
    let response = fetcher.get(&api_url, &params).await?;
    if !response.is_success() {
        return Err(WikiSearchError::QueryFailed(format!(
            "{}: site info returned HTTP {}",
            endpoint.host(),
            response.status
        )));
    }
    let parsed = parse_site_info(&response.body)
        .map_err(|e| WikiSearchError::QueryFailed(format!("{}: {e}", endpoint.host())))?;
    if !is_supported_generator(&parsed.generator) {
        let (major, minor) = MIN_MEDIAWIKI_VERSION;
        return Err(WikiSearchError::QueryFailed(format!(
            "{}: {} is older than MediaWiki {major}.{minor}",
            endpoint.host(),
            parsed.generator
        )));
    }
    tracing::debug!(
        host = endpoint.host(),
        site = %parsed.site_name,
        generator = %parsed.generator,
        "site info loaded"
    );
    Ok(parsed)
}

/// `(major, minor)` of a generator string such as `"MediaWiki 1.41.0-wmf.3"`.
pub fn mediawiki_version(generator: &str) -> Option<(u32, u32)> {
    let version = generator_version(generator)?;
    let mut parts = version.split('.').map(|part| {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u32>().ok()
    });
    let major = parts.next()??;
    let minor = parts.next()??;
    Some((major, minor))
}

/// Whether `generator` meets [`MIN_MEDIAWIKI_VERSION`].
///
/// A missing or unparseable generator is given the benefit of the doubt.
fn is_supported_generator(generator: &str) -> bool {
    mediawiki_version(generator).is_none_or(|version| version >= MIN_MEDIAWIKI_VERSION)
}

fn parse_site_info(body: &str) -> Result<SiteInfo, WikiSearchError> {
    let response: SiteInfoResponse = serde_json::from_str(body)
        .map_err(|e| WikiSearchError::Parse(format!("malformed site info: {e}")))?;
    let query = response.query;

    let mut namespaces: Vec<WikiNamespace> = query
        .namespaces
        .into_values()
        .map(|ns| WikiNamespace {
            id: ns.id,
            name: ns.name,
            has_content: match ns.content {
                Some(serde_json::Value::Bool(flag)) => flag,
                Some(_) => true,
                None => false,
            },
        })
        .collect();
    namespaces.sort_by_key(|ns| ns.id);

    let user = query.userinfo.unwrap_or(RawUserInfo {
        name: String::new(),
        groups: Vec::new(),
        rights: Vec::new(),
    });

    Ok(SiteInfo {
        site_name: query.general.sitename,
        main_page: query.general.mainpage,
        article_path: query
            .general
            .articlepath
            .unwrap_or_else(|| "/wiki/$1".to_owned()),
        generator: query.general.generator,
        namespaces,
        user_name: user.name,
        groups: user.groups,
        rights: user.rights,
    })
}

/// Run a full-text search on one wiki.
///
/// Pages come back in the wiki's own relevance order. A response without
/// `query` or `query.pages` means no hits.
///
/// # Errors
///
/// Returns [`WikiSearchError::QueryFailed`] on a non-2xx status, a body
/// that is not JSON of the expected shape, or an API `error` member.
/// Transport failures surface as [`WikiSearchError::Http`].
pub async fn search_pages<F: Fetcher>(
    fetcher: &F,
    endpoint: &Arc<ResolvedEndpoint>,
    query: &str,
    request: &SearchRequest,
) -> Result<Vec<WikiPage>, WikiSearchError> {
    let api_url = endpoint.api_url()?;
    let limit = request.limit.to_string();
    let extract_chars = request.extract_chars.to_string();
    let namespaces = request
        .namespaces
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join("|");
    let params = [
        ("format", "json"),
        ("action", "query"),
        ("generator", "search"),
        ("gsrsearch", query),
        ("gsrlimit", limit.as_str()),
        ("gsrnamespace", namespaces.as_str()),
        ("prop", "info|extracts"),
        ("inprop", "url|displaytitle"),
        ("exintro", "1"),
        ("explaintext", "1"),
        ("exchars", extract_chars.as_str()),
        ("exlimit", "max"),
    ];

    let response = fetcher.get(&api_url, &params).await?;
    if !response.is_success() {
        return Err(WikiSearchError::QueryFailed(format!(
            "{}: search returned HTTP {}",
            endpoint.host(),
            response.status
        )));
    }

    parse_search_response(endpoint, &response.body)
}

fn parse_search_response(
    endpoint: &Arc<ResolvedEndpoint>,
    body: &str,
) -> Result<Vec<WikiPage>, WikiSearchError> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| {
        WikiSearchError::QueryFailed(format!("{}: malformed response: {e}", endpoint.host()))
    })?;

    if let Some(error) = response.error {
        return Err(WikiSearchError::QueryFailed(format!(
            "{}: API error {error}",
            endpoint.host()
        )));
    }

    let Some(pages) = response.query.and_then(|q| q.pages) else {
        return Ok(Vec::new());
    };

    let mut raw: Vec<RawPage> = pages.into_values().collect();
    raw.sort_by_key(|p| (p.index.unwrap_or(u32::MAX), p.pageid.unwrap_or(0)));

    Ok(raw
        .into_iter()
        .map(|page| {
            let display_title = page
                .displaytitle
                .as_deref()
                .map(strip_markup)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| page.title.clone());
            WikiPage {
                endpoint: Arc::clone(endpoint),
                id: page.pageid.unwrap_or(0),
                title: page.title,
                display_title,
                extract: page.extract.unwrap_or_default().trim().to_owned(),
                full_url: page.fullurl,
            }
        })
        .collect())
}

/// Plain text of an HTML fragment such as a `displaytitle`.
pub fn strip_markup(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_owned()
}
