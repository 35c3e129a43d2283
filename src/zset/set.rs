//! SortedSet implementation
//!
//! BTreeSet order index paired with a HashMap member index.

use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

use bytes::Bytes;
use ordered_float::OrderedFloat;

use super::Score;

/// A set of unique members ordered by `(score, member)`.
///
/// Ties in score are broken by byte-wise member comparison, so the order
/// is total and query results are deterministic.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    /// Order index, ascending by (score, member)
    order: BTreeSet<(Score, Bytes)>,

    /// Member index, member → current score
    scores: HashMap<Bytes, Score>,
}

impl SortedSet {
    /// Create an empty sorted set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member or update its score.
    ///
    /// Returns `true` if the member was newly inserted, `false` if it
    /// already existed (its score is updated and it is repositioned).
    pub fn add(&mut self, member: Bytes, score: f64) -> bool {
        let score = OrderedFloat(score);

        match self.scores.get_key_value(member.as_ref()) {
            Some((name, &old)) => {
                if old == score {
                    return false;
                }
                let name = name.clone();
                self.order.remove(&(old, name.clone()));
                self.order.insert((score, name.clone()));
                self.scores.insert(name, score);
                false
            }
            None => {
                self.order.insert((score, member.clone()));
                self.scores.insert(member, score);
                true
            }
        }
    }

    /// Get a member's score
    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).map(|s| s.0)
    }

    /// Remove a member from both indexes. Returns `true` if it existed.
    pub fn remove(&mut self, member: &[u8]) -> bool {
        match self.scores.remove_entry(member) {
            Some((name, score)) => {
                let removed = self.order.remove(&(score, name));
                debug_assert!(removed, "order index out of sync with member index");
                true
            }
            None => false,
        }
    }

    /// Range query.
    ///
    /// Seeks to the first entry `>= (score, member)`, moves `offset`
    /// entries from there (backwards when negative) and returns up to
    /// `limit` entries in ascending order. The seek pair does not need to
    /// name an existing member.
    ///
    /// The seek is `O(log n)`; moving by `offset` walks entries one at a
    /// time, so a call costs `O(log n + min(|offset|, n) + limit)`. An
    /// offset whose magnitude reaches the set size can never land on an
    /// entry and returns empty without walking.
    pub fn query(&self, score: f64, member: &[u8], offset: i64, limit: usize) -> Vec<(Bytes, f64)> {
        if limit == 0 || offset.unsigned_abs() >= self.len() as u64 {
            return Vec::new();
        }

        let seek = (OrderedFloat(score), Bytes::copy_from_slice(member));

        // Nothing at or after the seek point: empty, whatever the offset
        let Some(first) = self.order.range(seek.clone()..).next() else {
            return Vec::new();
        };

        let start = if offset >= 0 {
            Bound::Included(first)
        } else {
            let back = offset.unsigned_abs() as usize;
            match self.order.range(..seek).rev().nth(back - 1) {
                Some(entry) => Bound::Included(entry),
                None => return Vec::new(),
            }
        };
        let skip = if offset > 0 { offset as usize } else { 0 };

        self.order
            .range((start, Bound::Unbounded))
            .skip(skip)
            .take(limit)
            .map(|(s, m)| (m.clone(), s.0))
            .collect()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterate over (member, score) in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, f64)> {
        self.order.iter().map(|(s, m)| (m, s.0))
    }
}
