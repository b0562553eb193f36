//! Fuzzy string similarity on a 0-100 scale.
//!
//! The base score is the normalised Levenshtein similarity of the
//! lowercased, trimmed strings. Matches at a word boundary earn a larger
//! bonus than matches in the middle of a word, so "dragon" ranks
//! "Red Dragon" above "Snapdragon".

use strsim::normalized_levenshtein;

/// Highest possible score.
pub const MAX_SCORE: u8 = 100;

/// Bonus when the text has a word starting with the query.
const WORD_PREFIX_BONUS: f64 = 30.0;

/// Bonus when the text contains the query anywhere else.
const SUBSTRING_BONUS: f64 = 15.0;

/// Score how well `text` matches `query`, from 0 (unrelated) to 100.
///
/// Either side being empty after trimming scores 0, so an empty query
/// never admits any item into a ranked collection with a positive
/// minimum score.
///
/// # Examples
///
/// ```
/// use wiki_search::fuzzy::fuzzy_score;
///
/// assert_eq!(fuzzy_score("dragon", "Dragon"), 100);
/// assert_eq!(fuzzy_score("", "Dragon"), 0);
/// assert!(fuzzy_score("dragon", "Red Dragon") > fuzzy_score("dragon", "Snapdragon"));
/// ```
pub fn fuzzy_score(query: &str, text: &str) -> u8 {
    let query = query.trim().to_lowercase();
    let text = text.trim().to_lowercase();
    if query.is_empty() || text.is_empty() {
        return 0;
    }

    let mut score = normalized_levenshtein(&query, &text) * 100.0;

    if starts_word(&text, &query) {
        score += WORD_PREFIX_BONUS;
    } else if text.contains(&query) {
        score += SUBSTRING_BONUS;
    }

    score.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
}

/// Whether `needle` occurs in `haystack` at the start of a word.
fn starts_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}
