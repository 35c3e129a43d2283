//! Blocking client for the ZestKV wire protocol.
//!
//! One request in flight at a time through [`Client::call`], or several
//! through [`Client::send`] followed by the same number of
//! [`Client::receive`] calls. Replies always come back in request order.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, ZestError};
use crate::protocol::{decode_reply, encode_request, read_frame, Reply, MAX_FRAME_SIZE};

pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    max_frame_size: usize,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| ZestError::Network(format!("connect failed: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_half = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(stream),
            max_frame_size: MAX_FRAME_SIZE,
        })
    }

    /// Bound how long `receive` waits for a reply. `None` waits forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send one request and wait for its reply
    pub fn call<T: AsRef<[u8]>>(&mut self, args: &[T]) -> Result<Reply> {
        self.send(args)?;
        self.receive()
    }

    /// Queue a request without waiting. Call `flush` (or `receive`) to put
    /// it on the wire.
    pub fn send<T: AsRef<[u8]>>(&mut self, args: &[T]) -> Result<()> {
        self.writer.write_all(&encode_request(args))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Read the next reply
    pub fn receive(&mut self) -> Result<Reply> {
        self.writer.flush()?;
        let payload = read_frame(&mut self.reader, self.max_frame_size)?;
        decode_reply(payload)
    }
}
