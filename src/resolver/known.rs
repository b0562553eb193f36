//! Static table of wiki farms whose API location is fixed.
//!
//! Large farms host thousands of wikis under one domain with the same
//! layout, so their API path is known without probing. Rules are checked
//! in table order and the first match wins.

use std::sync::LazyLock;

use regex::Regex;

/// Maps a hostname pattern to the API path used by every host it matches.
#[derive(Debug)]
pub struct KnownEndpointRule {
    host_pattern: Regex,
    excluded_prefix: Option<&'static str>,
    path: &'static str,
}

impl KnownEndpointRule {
    fn new(pattern: &str, excluded_prefix: Option<&'static str>, path: &'static str) -> Option<Self> {
        Regex::new(pattern).ok().map(|host_pattern| Self {
            host_pattern,
            excluded_prefix,
            path,
        })
    }

    /// Whether this rule applies to `host`.
    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if self
            .excluded_prefix
            .is_some_and(|prefix| host.starts_with(prefix))
        {
            return false;
        }
        self.host_pattern.is_match(&host)
    }

    /// API path (with leading and trailing slash) for matching hosts.
    pub fn path(&self) -> &'static str {
        self.path
    }
}

/// Known farms. The `www` portal hosts of Fandom and Wikipedia are not wikis.
static KNOWN_ENDPOINTS: LazyLock<Vec<KnownEndpointRule>> = LazyLock::new(|| {
    [
        KnownEndpointRule::new(r"^.+\.fandom\.com$", Some("www"), "/"),
        KnownEndpointRule::new(r"^.+\.wikipedia\.org$", Some("www"), "/w/"),
        KnownEndpointRule::new(r"^.+\.mediawiki\.org$", None, "/w/"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// The known rules, in match order.
pub fn known_endpoints() -> &'static [KnownEndpointRule] {
    &KNOWN_ENDPOINTS
}

/// API path of the first known rule matching `host`, if any.
pub fn known_api_path(host: &str) -> Option<&'static str> {
    known_endpoints()
        .iter()
        .find(|rule| rule.matches(host))
        .map(KnownEndpointRule::path)
}
