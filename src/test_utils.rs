//! Shared test utilities used across multiple test modules.
//!
//! [`ScriptedFetcher`] answers GET requests from a fixed route table and
//! records every request, so tests can assert exactly which URLs were hit.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use url::Url;

use crate::error::WikiSearchError;
use crate::http::{FetchResponse, Fetcher};

#[derive(Debug, Clone)]
struct Route {
    url: String,
    when: Option<(String, String)>,
    status: u16,
    content_type: Option<String>,
    final_url: Option<String>,
    body: String,
}

/// A recorded request: URL without query plus its parameters.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub params: HashMap<String, String>,
}

/// In-memory [`Fetcher`] with canned responses.
///
/// Requests to URLs without a route fail with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    routes: Vec<Route>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(
        mut self,
        url: &str,
        when: Option<(&str, &str)>,
        status: u16,
        content_type: Option<&str>,
        body: &str,
    ) -> Self {
        self.routes.push(Route {
            url: url.to_owned(),
            when: when.map(|(k, v)| (k.to_owned(), v.to_owned())),
            status,
            content_type: content_type.map(str::to_owned),
            final_url: None,
            body: body.to_owned(),
        });
        self
    }

    /// Serve `body` as `text/html` at `url`.
    pub fn html(self, url: &str, body: &str) -> Self {
        self.route(url, None, 200, Some("text/html; charset=UTF-8"), body)
    }

    /// Serve `body` as HTML at `url`, reporting `final_url` as the post-redirect URL.
    pub fn redirect_html(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self = self.html(url, body);
        if let Some(route) = self.routes.last_mut() {
            route.final_url = Some(final_url.to_owned());
        }
        self
    }

    /// Serve `body` as JSON at `url`.
    pub fn json(self, url: &str, body: &str) -> Self {
        self.route(url, None, 200, Some("application/json; charset=utf-8"), body)
    }

    /// Serve `body` as JSON at `url` only when the request carries `param`.
    pub fn json_when(self, url: &str, param: (&str, &str), body: &str) -> Self {
        self.route(url, Some(param), 200, Some("application/json; charset=utf-8"), body)
    }

    /// Answer `url` with a bare status code.
    pub fn status(self, url: &str, status: u16) -> Self {
        self.route(url, None, status, Some("text/plain"), "")
    }

    /// Hold every answer for `url` back by `delay`.
    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_owned(), delay);
        self
    }

    /// Number of requests made to `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.url == url).count()
    }

    /// Total number of requests made.
    pub fn total_requests(&self) -> usize {
        self.requests().len()
    }

    /// Parameters of the most recent request to `url`.
    pub fn last_params(&self, url: &str) -> Option<HashMap<String, String>> {
        self.requests()
            .iter()
            .rev()
            .find(|r| r.url == url)
            .map(|r| r.params.clone())
    }

    /// All recorded requests in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn find(&self, url: &str, params: &HashMap<String, String>) -> Option<&Route> {
        let for_url = || self.routes.iter().filter(move |r| r.url == url);
        for_url()
            .find(|r| {
                r.when
                    .as_ref()
                    .is_some_and(|(k, v)| params.get(k) == Some(v))
            })
            .or_else(|| for_url().find(|r| r.when.is_none()))
    }
}

impl Fetcher for ScriptedFetcher {
    async fn get(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<FetchResponse, WikiSearchError> {
        let params: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedRequest {
                url: url.as_str().to_owned(),
                params: params.clone(),
            });

        if let Some(delay) = self.delays.get(url.as_str()) {
            tokio::time::sleep(*delay).await;
        }

        let route = self
            .find(url.as_str(), &params)
            .ok_or_else(|| WikiSearchError::Http(format!("connection refused: {url}")))?;

        let final_url = match &route.final_url {
            Some(raw) => Url::parse(raw).map_err(|e| WikiSearchError::Http(e.to_string()))?,
            None => url.clone(),
        };
        Ok(FetchResponse {
            status: route.status,
            content_type: route.content_type.clone(),
            final_url,
            body: route.body.clone(),
        })
    }
}

/// A MediaWiki-looking home page.
pub const MEDIAWIKI_HOME: &str = r#"<!DOCTYPE html><html><head>
<meta name="generator" content="MediaWiki 1.41.0"><title>Main Page</title></head>
<body class="mediawiki ltr"><div id="content">Welcome</div></body></html>"#;

/// A plain, non-wiki home page.
pub const PLAIN_HOME: &str =
    "<!DOCTYPE html><html><head><title>Example Domain</title></head><body><p>Example</p></body></html>";

/// Minimal `siteinfo|userinfo` answer for a wiki called `name`.
pub fn site_info_json(name: &str) -> String {
    format!(
        r#"{{"query": {{"general": {{"sitename": "{name}", "mainpage": "Main Page",
            "articlepath": "/wiki/$1", "generator": "MediaWiki 1.41.0"}},
            "namespaces": {{"0": {{"id": 0, "content": "", "*": ""}},
                            "1": {{"id": 1, "*": "Talk"}},
                            "3000": {{"id": 3000, "content": "", "*": "Lore"}}}},
            "userinfo": {{"id": 0, "name": "127.0.0.1", "groups": ["*"], "rights": ["read"]}}}}}}"#
    )
}

/// `generator=search` answer containing `(page id, title, extract)` entries in rank order.
pub fn search_json(pages: &[(u64, &str, &str)]) -> String {
    let entries: Vec<String> = pages
        .iter()
        .enumerate()
        .map(|(index, (id, title, extract))| {
            format!(
                r#""{id}": {{"pageid": {id}, "ns": 0, "title": "{title}", "index": {}, "extract": "{extract}"}}"#,
                index + 1
            )
        })
        .collect();
    format!(r#"{{"query": {{"pages": {{{}}}}}}}"#, entries.join(", "))
}
