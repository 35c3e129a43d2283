//! Engine Module
//!
//! The storage engine shared by every connection.
//!
//! ## Responsibilities
//! - Route validated commands to keyspace operations
//! - Provide the single mutation boundary (one lock around the keyspace)
//! - Own the background reaper and the lazy-free drop thread
//! - Shape operation results into protocol replies

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{Command, Reply, Request};
use crate::store::{self, DropHandle, Keyspace, Reaper};
use crate::zset::format_score;

/// The main storage engine
///
/// ## Concurrency Model: one lock, held per operation
///
/// - Every command takes `keyspace` for the duration of one operation, so
///   read-then-write sequences (score updates, TTL replacement, lazy
///   expiry) are atomic relative to other connections and the reaper.
/// - The reaper takes the same lock once per batch.
/// - `parking_lot::Mutex` guards release on every exit path, including a
///   panicking or disconnecting connection thread, and never poison.
/// - Large values removed under the lock are destroyed on the drop
///   thread after the lock is released.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Keyspace shared with the reaper
    keyspace: Arc<Mutex<Keyspace>>,

    /// Background expiration; stopped when the engine is dropped
    _reaper: Reaper,
}

impl Engine {
    /// Create an engine and start its background threads
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let dropper = DropHandle::spawn(config.lazy_free_threshold);
        let keyspace = Arc::new(Mutex::new(Keyspace::with_dropper(dropper)));

        let reaper = Reaper::spawn(
            Arc::clone(&keyspace),
            Duration::from_millis(config.reap_interval_ms),
            config.reap_batch_limit,
        )?;

        tracing::debug!(
            "Engine started (reap every {}ms, batch {})",
            config.reap_interval_ms,
            config.reap_batch_limit
        );

        Ok(Self {
            config,
            keyspace,
            _reaper: reaper,
        })
    }

    /// Validate and execute one request. Never fails: every error becomes
    /// an `ERR` reply.
    pub fn handle(&self, request: Request) -> Reply {
        match Command::from_request(request).and_then(|command| self.execute(command)) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!("Request rejected: {}", e);
                Reply::from_error(&e)
            }
        }
    }

    /// Execute a command
    ///
    /// Fails only with `WrongType`; missing keys and members are ordinary
    /// results.
    pub fn execute(&self, command: Command) -> Result<Reply> {
        let reply = match command {
            Command::Ping => Reply::str("pong"),

            Command::Get { key } => match self.keyspace.lock().get(&key)? {
                Some(value) => Reply::Str(value),
                None => Reply::Nil,
            },
            Command::Set { key, value } => {
                self.keyspace.lock().set(key, value);
                Reply::Nil
            }
            Command::Del { key } => Reply::flag(self.keyspace.lock().del(&key)),

            Command::PExpire { key, millis } => {
                Reply::flag(self.keyspace.lock().pexpire(&key, millis))
            }
            Command::PTtl { key } => Reply::Int(self.keyspace.lock().pttl(&key)),

            Command::Keys => {
                let keys = self.keyspace.lock().keys();
                Reply::Arr(keys.into_iter().map(Reply::Str).collect())
            }

            Command::ZAdd { key, score, member } => {
                Reply::flag(self.keyspace.lock().zadd(&key, score, member)?)
            }
            Command::ZScore { key, member } => {
                match self.keyspace.lock().zscore(&key, &member)? {
                    Some(score) => Reply::str(format_score(score)),
                    None => Reply::Nil,
                }
            }
            Command::ZRem { key, member } => {
                Reply::flag(self.keyspace.lock().zrem(&key, &member)?)
            }
            Command::ZQuery {
                key,
                score,
                member,
                offset,
                limit,
            } => {
                let limit = usize::try_from(limit).unwrap_or(0);
                let pairs = self
                    .keyspace
                    .lock()
                    .zquery(&key, score, &member, offset, limit)?;
                Reply::Arr(
                    pairs
                        .into_iter()
                        .flat_map(|(member, score)| {
                            [Reply::Str(member), Reply::Str(Bytes::from(format_score(score)))]
                        })
                        .collect(),
                )
            }
        };
        Ok(reply)
    }

    /// Run one reaper sweep now, on the calling thread
    pub fn reap_expired(&self) -> usize {
        store::sweep(&self.keyspace, self.config.reap_batch_limit)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of stored keys, including expired ones not yet reaped
    pub fn key_count(&self) -> usize {
        self.keyspace.lock().len()
    }

    /// Number of keys carrying a TTL
    pub fn expiring_count(&self) -> usize {
        self.keyspace.lock().expiring_count()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
