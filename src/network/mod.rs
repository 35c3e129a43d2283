//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection: read → decode → execute → encode → write
//! - Commands routed through the shared Engine

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
