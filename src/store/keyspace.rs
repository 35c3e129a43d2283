//! Keyspace implementation
//!
//! HashMap of entries plus the expiry index. Not thread-safe on its own:
//! the engine wraps it in a single lock, which is the mutation boundary
//! for every command and for the reaper.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::{Result, ZestError};
use crate::zset::SortedSet;

use super::{DropHandle, Entry, ExpiryIndex, Value};

/// PTTL reply for a key that does not exist
pub const TTL_MISSING: i64 = -2;

/// PTTL reply for a key without a TTL
pub const TTL_PERSISTENT: i64 = -1;

const EXPECT_STRING: &str = "expect string";
const EXPECT_ZSET: &str = "expect zset";

/// Key → entry map with per-key expiry
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: HashMap<Bytes, Entry>,
    expiry: ExpiryIndex,
    dropper: Option<DropHandle>,
}

impl Keyspace {
    /// Create an empty keyspace that frees values inline
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty keyspace that defers large drops to `dropper`
    pub fn with_dropper(dropper: DropHandle) -> Self {
        Self {
            dropper: Some(dropper),
            ..Self::default()
        }
    }

    // =========================================================================
    // Scalar values
    // =========================================================================

    /// Get a scalar value
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Bytes>> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry { value: Value::Str(v), .. }) => Ok(Some(v.clone())),
            Some(_) => Err(ZestError::WrongType(EXPECT_STRING)),
        }
    }

    /// Set a scalar value, replacing whatever the key held and clearing its TTL
    pub fn set(&mut self, key: Bytes, value: Bytes) {
        if let Some(at) = self.entries.get(&key).and_then(|e| e.expires_at) {
            self.expiry.remove(&key, at);
        }
        let old = self.entries.insert(key, Entry::new(Value::Str(value)));
        if let Some(old) = old {
            self.release(old.value);
        }
    }

    /// Delete a key of any type. Returns whether a live key was removed.
    pub fn del(&mut self, key: &[u8]) -> bool {
        if self.live(key).is_none() {
            return false;
        }
        self.remove_entry(key)
    }

    // =========================================================================
    // Expiration
    // =========================================================================

    /// Set a TTL in milliseconds on an existing key.
    ///
    /// A negative `millis` removes the TTL. Returns whether the key exists.
    pub fn pexpire(&mut self, key: &[u8], millis: i64) -> bool {
        let now = Instant::now();
        // deadlines past the clock's range behave as "never"
        let deadline = u64::try_from(millis)
            .ok()
            .and_then(|ms| now.checked_add(Duration::from_millis(ms)));

        let Some(entry) = self.live_at(key, now) else {
            return false;
        };
        let previous = std::mem::replace(&mut entry.expires_at, deadline);

        let name = match self.entries.get_key_value(key) {
            Some((name, _)) => name.clone(),
            None => return false,
        };
        if let Some(at) = previous {
            self.expiry.remove(&name, at);
        }
        if let Some(at) = deadline {
            self.expiry.insert(name, at);
        }
        true
    }

    /// Remaining TTL in milliseconds, `TTL_PERSISTENT` or `TTL_MISSING`
    pub fn pttl(&mut self, key: &[u8]) -> i64 {
        let now = Instant::now();
        match self.live_at(key, now).map(|e| e.expires_at) {
            None => TTL_MISSING,
            Some(None) => TTL_PERSISTENT,
            Some(Some(at)) => {
                // round up: a fresh `pexpire k ms` reads back as `ms`
                let remaining = at.saturating_duration_since(now).as_nanos();
                i64::try_from(remaining.div_ceil(1_000_000)).unwrap_or(i64::MAX)
            }
        }
    }

    /// Remove up to `limit` keys whose TTL elapsed at or before `now`.
    ///
    /// Returns the number of keys removed.
    pub fn reap(&mut self, now: Instant, limit: usize) -> usize {
        let due = self.expiry.due(now, limit);
        let mut removed = 0;
        for key in due {
            if self.remove_entry(&key) {
                removed += 1;
            }
        }
        removed
    }

    // =========================================================================
    // Sorted sets
    // =========================================================================

    /// Add or update a member. Creates the set if the key is absent.
    ///
    /// Returns `true` if the member is new.
    pub fn zadd(&mut self, key: &[u8], score: f64, member: Bytes) -> Result<bool> {
        if self.live(key).is_none() {
            let entry = Entry::new(Value::ZSet(SortedSet::new()));
            self.entries.insert(Bytes::copy_from_slice(key), entry);
        }
        match self.entries.get_mut(key) {
            Some(Entry { value: Value::ZSet(set), .. }) => Ok(set.add(member, score)),
            _ => Err(ZestError::WrongType(EXPECT_ZSET)),
        }
    }

    /// Score of a member, if both key and member exist
    pub fn zscore(&mut self, key: &[u8], member: &[u8]) -> Result<Option<f64>> {
        Ok(self.zset(key)?.and_then(|set| set.score(member)))
    }

    /// Remove a member. Removing the last member deletes the key.
    pub fn zrem(&mut self, key: &[u8], member: &[u8]) -> Result<bool> {
        let (removed, emptied) = match self.live(key) {
            None => return Ok(false),
            Some(Entry { value: Value::ZSet(set), .. }) => {
                let removed = set.remove(member);
                (removed, set.is_empty())
            }
            Some(_) => return Err(ZestError::WrongType(EXPECT_ZSET)),
        };
        if emptied {
            self.remove_entry(key);
        }
        Ok(removed)
    }

    /// Range query over a sorted set. A missing key yields no results.
    pub fn zquery(
        &mut self,
        key: &[u8],
        score: f64,
        member: &[u8],
        offset: i64,
        limit: usize,
    ) -> Result<Vec<(Bytes, f64)>> {
        Ok(self
            .zset(key)?
            .map(|set| set.query(score, member, offset, limit))
            .unwrap_or_default())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Names of all live keys, in no particular order
    pub fn keys(&self) -> Vec<Bytes> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Number of stored entries, including expired ones not yet reaped
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records in the expiry index
    pub fn expiring_count(&self) -> usize {
        self.expiry.len()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.expiry.next_deadline()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Look up a key, expiring it first if its TTL has elapsed
    fn live(&mut self, key: &[u8]) -> Option<&mut Entry> {
        self.live_at(key, Instant::now())
    }

    fn live_at(&mut self, key: &[u8], now: Instant) -> Option<&mut Entry> {
        if self.entries.get(key)?.is_expired(now) {
            self.remove_entry(key);
            return None;
        }
        self.entries.get_mut(key)
    }

    fn zset(&mut self, key: &[u8]) -> Result<Option<&mut SortedSet>> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry { value: Value::ZSet(set), .. }) => Ok(Some(set)),
            Some(_) => Err(ZestError::WrongType(EXPECT_ZSET)),
        }
    }

    /// Take a key out of the map and the expiry index.
    ///
    /// Idempotent: a second call for the same key finds nothing.
    fn remove_entry(&mut self, key: &[u8]) -> bool {
        let Some((name, entry)) = self.entries.remove_entry(key) else {
            return false;
        };
        if let Some(at) = entry.expires_at {
            self.expiry.remove(&name, at);
        }
        self.release(entry.value);
        true
    }

    fn release(&self, value: Value) {
        match &self.dropper {
            Some(dropper) => dropper.defer(value),
            None => drop(value),
        }
    }
}
