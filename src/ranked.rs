//! Capacity-bounded, score-ordered result collection.
//!
//! [`BoundedRankedCollection`] ingests candidates from any number of
//! sources and keeps only the best `capacity` of them by fuzzy score
//! against one query. Items are kept in a [`BTreeMap`] keyed by
//! `(descending score, insertion sequence)`, so each insertion and each
//! eviction is `O(log n)` and equal scores keep their arrival order.
//!
//! The collection is not synchronised. A search that queries several
//! wikis concurrently must funnel all appends through a single owner.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::fuzzy::fuzzy_score;

/// An item that can be scored against a query.
pub trait Scorable {
    /// The named text fields the item is scored on.
    ///
    /// The item's score is the best score of any single field.
    fn score_fields(&self) -> Vec<(&'static str, &str)>;
}

/// An item together with the score it was admitted with.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    /// The ranked item.
    pub item: T,
    /// Score against the collection's query, 0-100.
    pub score: u8,
}

/// Ordering key: best score first, then earliest insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    score: Reverse<u8>,
    seq: u64,
}

/// Signature of the default scoring callback.
pub type ScoreFn = fn(&str, &str) -> u8;

/// Keeps the best `capacity` items seen so far for one query.
///
/// Invariants after every [`append`](Self::append):
/// - `len() <= capacity()`
/// - every retained item scored at least `min_score()`
#[derive(Debug)]
pub struct BoundedRankedCollection<T, S = ScoreFn> {
    query: String,
    min_score: u8,
    capacity: usize,
    scorer: S,
    items: BTreeMap<RankKey, Ranked<T>>,
    next_seq: u64,
}

impl<T: Scorable> BoundedRankedCollection<T> {
    /// Create a collection scored with [`fuzzy_score`].
    pub fn new(query: &str, min_score: u8, capacity: usize) -> Self {
        Self::with_scorer(query, min_score, capacity, fuzzy_score)
    }
}

impl<T, S> BoundedRankedCollection<T, S>
where
    T: Scorable,
    S: Fn(&str, &str) -> u8,
{
    /// Create a collection with a caller-supplied scoring callback.
    ///
    /// The query is lowercased and trimmed once here; the scorer receives
    /// the normalised query and the raw field text.
    pub fn with_scorer(query: &str, min_score: u8, capacity: usize, scorer: S) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            min_score,
            capacity,
            scorer,
            items: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Score `item` and insert it if it qualifies.
    ///
    /// Items scoring strictly below the minimum are dropped. When the
    /// insertion pushes the collection over capacity, the lowest-ranked
    /// item is evicted (which may be `item` itself). Returns whether
    /// `item` is still held once the call returns.
    pub fn append(&mut self, item: T) -> bool {
        let score = self.score(&item);
        if score < self.min_score {
            return false;
        }

        let key = RankKey {
            score: Reverse(score),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.items.insert(key, Ranked { item, score });

        if self.items.len() > self.capacity {
            if let Some((evicted, _)) = self.items.pop_last() {
                return evicted != key;
            }
        }
        true
    }

    /// Append every item from `items`.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            self.append(item);
        }
    }

    /// Best score of any of the item's fields.
    ///
    /// An empty query scores every item 0.
    pub fn score(&self, item: &T) -> u8 {
        if self.query.is_empty() {
            return 0;
        }
        item.score_fields()
            .into_iter()
            .map(|(_, text)| (self.scorer)(&self.query, text))
            .max()
            .unwrap_or(0)
    }
}

impl<T, S> BoundedRankedCollection<T, S> {
    /// The normalised query this collection ranks against.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Minimum score an item needs to be admitted.
    pub fn min_score(&self) -> u8 {
        self.min_score
    }

    /// Maximum number of retained items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no item has been retained.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Retained items, best first.
    pub fn iter(&self) -> impl Iterator<Item = &Ranked<T>> {
        self.items.values()
    }

    /// Consume the collection, returning retained items best first.
    pub fn into_vec(self) -> Vec<Ranked<T>> {
        self.items.into_values().collect()
    }
}
