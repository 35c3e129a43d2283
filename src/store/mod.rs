//! Store Module
//!
//! The keyspace: key → typed value, per-key expiry, and the machinery
//! that removes expired keys.
//!
//! ## Responsibilities
//! - Flat namespace of byte-string keys, one typed value per key
//! - Lazy expiration: an elapsed TTL is a miss on the next access
//! - Active expiration: a time-ordered index the reaper drains
//! - Deferred destruction of large values off the engine lock
//!
//! ## Removal paths
//! Lazy expiry, the reaper, DEL and type-changing SET all funnel into
//! `Keyspace::remove_entry`, which takes the entry out of the map and its
//! record out of the expiry index in one step. The caller holds the engine
//! lock, so whichever path gets there first owns the value; later paths
//! find nothing and do nothing.

mod dropper;
mod entry;
mod expiry;
mod keyspace;
mod reaper;

pub use dropper::DropHandle;
pub use entry::{Entry, Value};
pub use expiry::ExpiryIndex;
pub use keyspace::{Keyspace, TTL_MISSING, TTL_PERSISTENT};
pub use reaper::{sweep, Reaper};
