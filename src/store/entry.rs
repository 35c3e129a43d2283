//! Keyspace entries

use std::time::Instant;

use bytes::Bytes;

use crate::zset::SortedSet;

/// A typed value held by a key
#[derive(Debug, Clone)]
pub enum Value {
    /// Opaque scalar bytes (GET/SET)
    Str(Bytes),

    /// Sorted set (ZADD/ZREM/ZSCORE/ZQUERY)
    ZSet(SortedSet),
}

impl Value {
    /// Number of elements the value owns, used to decide on lazy free
    pub fn element_count(&self) -> usize {
        match self {
            Value::Str(_) => 1,
            Value::ZSet(set) => set.len(),
        }
    }
}

/// A key's value plus its optional absolute expiry
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,

    /// When set, the entry has exactly one record in the expiry index
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// New entry without a TTL
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Whether the TTL has elapsed at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}
