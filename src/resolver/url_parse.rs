//! Parsing of user-supplied wiki locations.
//!
//! Accepts full `http(s)` URLs, network-path references (`//host/path`,
//! RFC 1808) and bare domain names. Anything else is rejected before any
//! network traffic happens.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::WikiSearchError;

/// Maximum length of a domain name in presentation form.
const MAX_DOMAIN_LEN: usize = 253;

static DOMAIN_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+(?:[a-z]{2,63}|xn--[a-z0-9-]{1,59})$",
    )
    .ok()
});

/// A location being resolved: scheme (if the user gave one), host and path.
///
/// Owned by a single resolution attempt. The resolver fills in the scheme
/// and later swaps the path while it probes for the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    /// `http` or `https`, or `None` for schemeless input.
    pub scheme: Option<String>,
    /// Lowercased host, with `:port` when a non-default port was given.
    pub host: String,
    /// Path plus query string; always starts with `/`.
    pub path: String,
}

impl EndpointCandidate {
    /// Build the absolute URL for this candidate using `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`WikiSearchError::InvalidUrl`] if the pieces do not form a URL.
    pub fn url_with_scheme(&self, scheme: &str) -> Result<Url, WikiSearchError> {
        let raw = format!("{scheme}://{}{}", self.host, self.path);
        Url::parse(&raw).map_err(|e| WikiSearchError::InvalidUrl(format!("{raw}: {e}")))
    }
}

/// Parse and validate a raw URL or hostname.
///
/// # Errors
///
/// Returns [`WikiSearchError::InvalidUrl`] if `raw` is neither an
/// `http`/`https` URL nor a valid domain name.
///
/// # Examples
///
/// ```
/// use wiki_search::resolver::url_parse::parse_raw_url;
///
/// let candidate = parse_raw_url("en.wikipedia.org").unwrap();
/// assert_eq!(candidate.scheme, None);
/// assert_eq!(candidate.host, "en.wikipedia.org");
/// assert_eq!(candidate.path, "/");
/// ```
pub fn parse_raw_url(raw: &str) -> Result<EndpointCandidate, WikiSearchError> {
    let raw = raw.trim();

    // Network-path references get a throwaway scheme so they can be validated.
    let network_path = raw.starts_with("//");
    let probe = if network_path {
        format!("http:{raw}")
    } else {
        raw.to_owned()
    };

    if let Some(candidate) = parse_url(&probe) {
        return Ok(EndpointCandidate {
            scheme: if network_path { None } else { candidate.scheme },
            ..candidate
        });
    }

    if is_valid_domain(raw) {
        return Ok(EndpointCandidate {
            scheme: None,
            host: raw.to_ascii_lowercase(),
            path: "/".to_owned(),
        });
    }

    Err(WikiSearchError::InvalidUrl(raw.to_owned()))
}

fn parse_url(raw: &str) -> Option<EndpointCandidate> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str().filter(|h| !h.is_empty())?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    let path = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    };
    Some(EndpointCandidate {
        scheme: Some(url.scheme().to_owned()),
        host,
        path,
    })
}

/// Whether `raw` is a syntactically valid domain name with a real TLD shape.
pub fn is_valid_domain(raw: &str) -> bool {
    if raw.is_empty() || raw.len() > MAX_DOMAIN_LEN {
        return false;
    }
    DOMAIN_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(raw))
}
