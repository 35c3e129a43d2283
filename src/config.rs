//! Configuration for ZestKV
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, ZestError};

/// Main configuration for a ZestKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Close a connection after this long without a request (milliseconds, 0 = never)
    pub idle_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Limits
    // -------------------------------------------------------------------------
    /// Largest accepted request payload and largest emitted reply (bytes)
    pub max_frame_size: usize,

    /// Largest argument count in a single request
    pub max_args: usize,

    // -------------------------------------------------------------------------
    // Expiration Configuration
    // -------------------------------------------------------------------------
    /// How often the background reaper sweeps expired keys (milliseconds)
    pub reap_interval_ms: u64,

    /// Max keys removed per sweep before the engine lock is released
    pub reap_batch_limit: usize,

    // -------------------------------------------------------------------------
    // Memory Configuration
    // -------------------------------------------------------------------------
    /// Sorted sets with more members than this are destroyed off the engine lock
    pub lazy_free_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: 1024,
            idle_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_frame_size: 32 * 1024 * 1024, // 32 MiB
            max_args: 200_000,
            reap_interval_ms: 100,
            reap_batch_limit: 2000,
            lazy_free_threshold: 1000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(ZestError::Config("max_connections must be > 0".to_string()));
        }
        if self.reap_interval_ms == 0 {
            return Err(ZestError::Config("reap_interval_ms must be > 0".to_string()));
        }
        if self.reap_batch_limit == 0 {
            return Err(ZestError::Config("reap_batch_limit must be > 0".to_string()));
        }
        if self.max_frame_size < 8 {
            return Err(ZestError::Config(format!(
                "max_frame_size too small: {}",
                self.max_frame_size
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the idle timeout (in milliseconds)
    pub fn idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.idle_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the maximum frame size (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the maximum argument count per request
    pub fn max_args(mut self, count: usize) -> Self {
        self.config.max_args = count;
        self
    }

    /// Set the reaper period (in milliseconds)
    pub fn reap_interval_ms(mut self, ms: u64) -> Self {
        self.config.reap_interval_ms = ms;
        self
    }

    /// Set the maximum number of keys reaped per sweep
    pub fn reap_batch_limit(mut self, count: usize) -> Self {
        self.config.reap_batch_limit = count;
        self
    }

    /// Set the sorted-set size above which destruction is deferred
    pub fn lazy_free_threshold(mut self, members: usize) -> Self {
        self.config.lazy_free_threshold = members;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
