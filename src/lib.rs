//! # ZestKV
//!
//! An in-memory key-value server with:
//! - String values and sorted sets under one flat keyspace
//! - Millisecond TTLs with lazy and background expiration
//! - Ranked, paginated sorted-set queries
//! - A length-prefixed binary protocol over TCP
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one thread per connection)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  frames → Request → Command
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │               (one lock per operation)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Keyspace   │◄─────────│   Reaper    │
//!   │ (map + TTL) │  batches │  (thread)   │
//!   └──────┬──────┘          └─────────────┘
//!          │ large values
//!          ▼
//!   ┌─────────────┐
//!   │  Drop thread │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod zset;
pub mod store;
pub mod protocol;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, ZestError};
pub use config::Config;
pub use engine::Engine;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ZestKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
