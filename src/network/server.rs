//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, ZestError};

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for ZestKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
    active_connections: Arc<AtomicUsize>,
    next_connection_id: AtomicU64,
}

/// Cloneable handle that stops a running server's accept loop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Decrements the live connection count when a connection thread ends
struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: Config, engine: Arc<Engine>) -> Self {
        Self {
            config,
            engine,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Bind the listening socket. Returns the bound address, which is how
    /// callers learn the port when listening on port 0.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            ZestError::Network(format!("failed to bind {}: {}", self.config.listen_addr, e))
        })?;
        // non-blocking so the loop can notice shutdown
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => return Err(ZestError::Network("listener not bound".to_string())),
        };
        tracing::info!("Listening on {}", listener.local_addr()?);

        while !self.shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, addr)) => self.dispatch(stream, addr),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Accept loop stopped");
        Ok(())
    }

    /// Hand an accepted stream to a new connection thread
    fn dispatch(&self, stream: TcpStream, addr: SocketAddr) {
        let active = self.active_connections.fetch_add(1, Ordering::SeqCst);
        let slot = ConnectionSlot {
            active: Arc::clone(&self.active_connections),
        };
        if active >= self.config.max_connections {
            tracing::warn!(
                "Refusing {}: {} connections open (max {})",
                addr,
                active,
                self.config.max_connections
            );
            return;
        }

        // accepted sockets inherit non-blocking mode on some platforms
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Failed to configure socket for {}: {}", addr, e);
            return;
        }

        let engine = Arc::clone(&self.engine);
        let idle_ms = self.config.idle_timeout_ms;
        let write_ms = self.config.write_timeout_ms;
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        let spawned = std::thread::Builder::new()
            .name(format!("zestkv-conn-{}", id))
            .spawn(move || {
                let _slot = slot;
                let result = Connection::new(stream, engine).and_then(|mut conn| {
                    conn.set_timeouts(idle_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Connection {} from {} ended with error: {}", id, addr, e);
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn connection thread for {}: {}", addr, e);
        }
    }

    /// Handle that can stop the accept loop from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Number of connection threads currently running
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }
}
