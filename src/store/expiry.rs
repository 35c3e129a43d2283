//! Expiry index
//!
//! Time-ordered set of `(deadline, key)` records. The reaper walks it
//! from the front, so a sweep costs O(expired keys · log n) no matter how
//! many keys live in the keyspace.

use std::collections::BTreeSet;
use std::time::Instant;

use bytes::Bytes;

/// Deadline-ordered index of TTL-bearing keys
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    records: BTreeSet<(Instant, Bytes)>,
}

impl ExpiryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. The caller removes any previous record for the key first.
    pub fn insert(&mut self, key: Bytes, at: Instant) {
        self.records.insert((at, key));
    }

    /// Remove a record. Returns `false` if it was not present.
    pub fn remove(&mut self, key: &Bytes, at: Instant) -> bool {
        self.records.remove(&(at, key.clone()))
    }

    /// Keys whose deadline is `<= now`, earliest first, at most `limit`.
    ///
    /// Records are left in place; removing the entry removes the record.
    pub fn due(&self, now: Instant, limit: usize) -> Vec<Bytes> {
        self.records
            .iter()
            .take_while(|(at, _)| *at <= now)
            .take(limit)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Earliest deadline in the index
    pub fn next_deadline(&self) -> Option<Instant> {
        self.records.first().map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
