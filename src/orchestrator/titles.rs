//! Readability rewriting of wiki display titles.
//!
//! Subpage and namespace separators are spaced out so titles read like
//! prose: `"Lists/Characters:Dragon"` becomes `"Lists - Characters: Dragon"`.

/// Substitutions applied in order. The order is part of the contract:
/// later rules see the output of earlier ones.
pub const TITLE_REWRITES: &[(&str, &str)] = &[(":", ": "), ("/", " - ")];

/// Apply [`TITLE_REWRITES`] to `title`.
///
/// # Examples
///
/// ```
/// use wiki_search::orchestrator::titles::improve_title;
///
/// assert_eq!(improve_title("Lists/Characters:Dragon"), "Lists - Characters: Dragon");
/// ```
pub fn improve_title(title: &str) -> String {
    TITLE_REWRITES
        .iter()
        .fold(title.to_owned(), |acc, (from, to)| acc.replace(from, to))
}
