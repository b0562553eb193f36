//! MediaWiki fingerprinting of fetched HTML pages.
//!
//! A page counts as MediaWiki-powered when any one signal is present:
//!
//! - `<body>` carries the `mediawiki` class
//! - a "Powered by MediaWiki" footer link or badge
//! - a link into `Special:WhatLinksHere/`
//! - `<meta name="generator" content="MediaWiki ...">`

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::WikiSearchError;

const POWERED_BY: &str = "powered by mediawiki";

static GENERATOR_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^MediaWiki ?(.*)$").ok());

/// Which signal identified the page as MediaWiki.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaWikiSignal {
    /// `<body class="mediawiki ...">`.
    BodyClass,
    /// "Powered by MediaWiki" link text or image alt text.
    PoweredBy,
    /// A link to `Special:WhatLinksHere/`.
    WhatLinksHere,
    /// Generator meta tag; carries the version suffix (may be empty).
    Generator(String),
}

fn selector(css: &str) -> Result<Selector, WikiSearchError> {
    Selector::parse(css).map_err(|e| WikiSearchError::Parse(format!("invalid selector {css}: {e:?}")))
}

/// Look for a MediaWiki signature in `html`.
///
/// Returns the first signal found, checking the cheap structural
/// signals before the generator meta tag.
///
/// # Errors
///
/// Returns [`WikiSearchError::Parse`] only if a built-in selector is invalid.
pub fn detect_mediawiki(html: &str) -> Result<Option<MediaWikiSignal>, WikiSearchError> {
    let document = Html::parse_document(html);

    let body_sel = selector("body.mediawiki")?;
    if document.select(&body_sel).next().is_some() {
        return Ok(Some(MediaWikiSignal::BodyClass));
    }

    let anchor_sel = selector("a")?;
    let img_sel = selector("img[alt]")?;
    let powered_by_link = document.select(&anchor_sel).any(|a| is_powered_by_text(&text_of(a)));
    let powered_by_badge = document
        .select(&img_sel)
        .any(|img| img.value().attr("alt").is_some_and(is_powered_by_text));
    if powered_by_link || powered_by_badge {
        return Ok(Some(MediaWikiSignal::PoweredBy));
    }

    let what_links_sel = selector(r#"a[href*="/Special:WhatLinksHere/"]"#)?;
    if document.select(&what_links_sel).next().is_some() {
        return Ok(Some(MediaWikiSignal::WhatLinksHere));
    }

    let generator_sel = selector(r#"meta[name="generator"]"#)?;
    let version = document
        .select(&generator_sel)
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(generator_version);
    Ok(version.map(MediaWikiSignal::Generator))
}

/// Version suffix of a MediaWiki generator string, e.g. `"1.41.0"`.
///
/// Returns `None` when `content` is not a MediaWiki generator.
pub fn generator_version(content: &str) -> Option<String> {
    let pattern = GENERATOR_PATTERN.as_ref()?;
    pattern
        .captures(content.trim())
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()).trim().to_owned())
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn is_powered_by_text(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(POWERED_BY)
}
