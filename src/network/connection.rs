//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufWriter, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::engine::Engine;
use crate::error::{Result, ZestError};
use crate::protocol::{decode_request, encode_reply_limited, FrameDecoder, Reply};

/// Bytes requested from the socket per read
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader
    reader: TcpStream,

    /// TCP stream writer (buffered so pipelined replies go out together)
    writer: BufWriter<TcpStream>,

    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,

    /// Frame state machine over `incoming`
    decoder: FrameDecoder,

    /// Bytes received but not yet decoded
    incoming: BytesMut,

    /// Scratch buffer for socket reads
    read_buf: Vec<u8>,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        let max_frame_size = engine.config().max_frame_size;

        Ok(Self {
            reader: read_stream,
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
            decoder: FrameDecoder::new(max_frame_size),
            incoming: BytesMut::with_capacity(READ_CHUNK_SIZE),
            read_buf: vec![0u8; READ_CHUNK_SIZE],
        })
    }

    /// Configure connection timeouts.
    ///
    /// The read timeout doubles as the idle timeout: a client that sends
    /// nothing for `idle_ms` is disconnected.
    pub fn set_timeouts(&mut self, idle_ms: u64, write_ms: u64) -> Result<()> {
        if idle_ms > 0 {
            self.reader.set_read_timeout(Some(Duration::from_millis(idle_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads frames, answers every complete request in arrival order, and
    /// returns when the client disconnects, idles out, or breaks framing.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            // Answer everything already buffered
            let answered = match self.drain_requests() {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!("Closing {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            if answered > 0 {
                if let Err(e) = self.writer.flush().map_err(ZestError::from) {
                    if e.is_disconnect() {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                    tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }

            // Wait for more bytes
            let n = match self.reader.read(&mut self.read_buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    let e = ZestError::from(e);
                    if e.is_disconnect() {
                        tracing::debug!("Connection reset by client {}", self.peer_addr);
                        return Ok(());
                    }
                    if e.is_timeout() {
                        tracing::debug!("Closing idle connection {}", self.peer_addr);
                        return Ok(());
                    }
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            if n == 0 {
                if self.incoming.is_empty() {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                } else {
                    tracing::debug!(
                        "Client {} disconnected mid-frame ({} bytes pending)",
                        self.peer_addr,
                        self.incoming.len()
                    );
                }
                return Ok(());
            }
            self.incoming.extend_from_slice(&self.read_buf[..n]);
        }
    }

    /// Decode and answer every complete frame in `incoming`.
    ///
    /// Returns the number of replies queued on the writer.
    fn drain_requests(&mut self) -> Result<usize> {
        let mut answered = 0;
        while let Some(payload) = self.decoder.decode_frame(&mut self.incoming)? {
            let reply = self.execute_request(payload);
            let encoded = encode_reply_limited(&reply, self.engine.config().max_frame_size);
            self.writer.write_all(&encoded)?;
            answered += 1;
        }
        Ok(answered)
    }

    /// Execute one request payload and return the reply
    fn execute_request(&self, payload: Bytes) -> Reply {
        match decode_request(payload, self.engine.config().max_args) {
            Ok(request) => {
                tracing::trace!("Received request from {}: {:?}", self.peer_addr, request);
                self.engine.handle(request)
            }
            Err(e) => {
                tracing::warn!("Malformed request from {}: {}", self.peer_addr, e);
                Reply::from_error(&e)
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
