//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol. All integers
//! are little-endian.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬──────────┬───────────┬─────┬──────────┬───────────┐
//! │ Len (4)  │ Argc (4) │ Len1 (4) │ Arg1      │ ... │ LenN (4) │ ArgN      │
//! └──────────┴──────────┴──────────┴───────────┴─────┴──────────┴───────────┘
//! ```
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ Tag (1)  │       Tag payload           │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Tag payloads
//! - NIL: empty
//! - ERR: msg_len (4) + msg
//! - STR: len (4) + bytes
//! - INT: i64 (8)
//! - ARR: count (4) + count × tagged value

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Reply, Request, Tag};
use crate::error::{Result, ZestError};

/// Size of the frame length prefix
pub const LEN_PREFIX_SIZE: usize = 4;

/// Default maximum payload size (32 MiB)
pub const MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

/// Default maximum argument count in a request
pub const MAX_ARGS: usize = 200_000;

/// Nesting depth accepted when decoding replies
const MAX_REPLY_DEPTH: usize = 64;

const TOO_BIG_MESSAGE: &str = "response is too big";

// =============================================================================
// Frame Decoding (incremental)
// =============================================================================

/// Where the decoder is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for the 4-byte length prefix
    Length,

    /// Waiting for this many payload bytes
    Payload(usize),
}

/// Incremental frame decoder.
///
/// Feed it a growing buffer; it yields one payload per complete frame
/// and leaves partial frames in the buffer for the next call.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    max_frame_size: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            state: DecodeState::Length,
            max_frame_size,
        }
    }

    /// Pull the next complete frame payload out of `buf`.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A length prefix over
    /// the limit is an error the stream cannot recover from.
    pub fn decode_frame(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        loop {
            match self.state {
                DecodeState::Length => {
                    if buf.len() < LEN_PREFIX_SIZE {
                        return Ok(None);
                    }
                    let len = buf.get_u32_le() as usize;
                    if len > self.max_frame_size {
                        return Err(ZestError::FrameTooLarge {
                            len,
                            max: self.max_frame_size,
                        });
                    }
                    self.state = DecodeState::Payload(len);
                }
                DecodeState::Payload(len) => {
                    if buf.len() < len {
                        buf.reserve(len - buf.len());
                        return Ok(None);
                    }
                    self.state = DecodeState::Length;
                    return Ok(Some(buf.split_to(len).freeze()));
                }
            }
        }
    }
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request frame from its arguments
pub fn encode_request<T: AsRef<[u8]>>(args: &[T]) -> Vec<u8> {
    let payload_len = 4 + args.iter().map(|a| 4 + a.as_ref().len()).sum::<usize>();

    let mut message = Vec::with_capacity(LEN_PREFIX_SIZE + payload_len);
    message.put_u32_le(payload_len as u32);
    message.put_u32_le(args.len() as u32);
    for arg in args {
        let arg = arg.as_ref();
        message.put_u32_le(arg.len() as u32);
        message.put_slice(arg);
    }
    message
}

/// Decode a request payload (the frame without its length prefix)
pub fn decode_request(mut payload: Bytes, max_args: usize) -> Result<Request> {
    if payload.remaining() < 4 {
        return Err(malformed());
    }
    let argc = payload.get_u32_le() as usize;
    if argc > max_args {
        return Err(malformed());
    }

    // each argument needs at least its length prefix
    let mut args = Vec::with_capacity(argc.min(payload.remaining() / 4));
    for _ in 0..argc {
        if payload.remaining() < 4 {
            return Err(malformed());
        }
        let len = payload.get_u32_le() as usize;
        if payload.remaining() < len {
            return Err(malformed());
        }
        args.push(payload.split_to(len));
    }

    if payload.has_remaining() {
        return Err(malformed());
    }
    Ok(Request::new(args))
}

fn malformed() -> ZestError {
    ZestError::Protocol("malformed request".to_string())
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply frame
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut message = Vec::new();
    message.put_u32_le(0); // patched below
    encode_value(&mut message, reply);
    patch_len(&mut message);
    message
}

/// Encode a reply frame, replacing it with an error if it exceeds `max_frame_size`
pub fn encode_reply_limited(reply: &Reply, max_frame_size: usize) -> Vec<u8> {
    let message = encode_reply(reply);
    if message.len() - LEN_PREFIX_SIZE > max_frame_size {
        tracing::warn!(
            "Reply of {} bytes exceeds limit of {} bytes",
            message.len() - LEN_PREFIX_SIZE,
            max_frame_size
        );
        return encode_reply(&Reply::error(TOO_BIG_MESSAGE));
    }
    message
}

fn patch_len(message: &mut [u8]) {
    let len = (message.len() - LEN_PREFIX_SIZE) as u32;
    message[..LEN_PREFIX_SIZE].copy_from_slice(&len.to_le_bytes());
}

fn encode_value(out: &mut Vec<u8>, reply: &Reply) {
    out.put_u8(reply.tag() as u8);
    match reply {
        Reply::Nil => {}
        Reply::Err(msg) => {
            out.put_u32_le(msg.len() as u32);
            out.put_slice(msg.as_bytes());
        }
        Reply::Str(s) => {
            out.put_u32_le(s.len() as u32);
            out.put_slice(s);
        }
        Reply::Int(v) => out.put_i64_le(*v),
        Reply::Arr(items) => {
            out.put_u32_le(items.len() as u32);
            for item in items {
                encode_value(out, item);
            }
        }
    }
}

/// Decode a reply payload (the frame without its length prefix)
pub fn decode_reply(mut payload: Bytes) -> Result<Reply> {
    let reply = decode_value(&mut payload, 0)?;
    if payload.has_remaining() {
        return Err(ZestError::Protocol(format!(
            "{} trailing bytes after reply",
            payload.remaining()
        )));
    }
    Ok(reply)
}

fn decode_value(buf: &mut Bytes, depth: usize) -> Result<Reply> {
    if depth > MAX_REPLY_DEPTH {
        return Err(ZestError::Protocol("reply nested too deeply".to_string()));
    }
    if !buf.has_remaining() {
        return Err(ZestError::Protocol("missing reply tag".to_string()));
    }

    let tag_byte = buf.get_u8();
    let tag = Tag::from_u8(tag_byte)
        .ok_or_else(|| ZestError::Protocol(format!("Unknown reply tag: 0x{:02x}", tag_byte)))?;

    match tag {
        Tag::Nil => Ok(Reply::Nil),
        Tag::Err => {
            let msg = take_sized(buf)?;
            Ok(Reply::Err(String::from_utf8_lossy(&msg).into_owned()))
        }
        Tag::Str => Ok(Reply::Str(take_sized(buf)?)),
        Tag::Int => {
            if buf.remaining() < 8 {
                return Err(ZestError::Protocol("truncated integer".to_string()));
            }
            Ok(Reply::Int(buf.get_i64_le()))
        }
        Tag::Arr => {
            let count = take_u32(buf)? as usize;
            // every element is at least one tag byte
            if count > buf.remaining() {
                return Err(ZestError::Protocol("truncated array".to_string()));
            }
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(decode_value(buf, depth + 1)?);
            }
            Ok(Reply::Arr(items))
        }
    }
}

fn take_u32(buf: &mut Bytes) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(ZestError::Protocol("truncated length".to_string()));
    }
    Ok(buf.get_u32_le())
}

fn take_sized(buf: &mut Bytes) -> Result<Bytes> {
    let len = take_u32(buf)? as usize;
    if buf.remaining() < len {
        return Err(ZestError::Protocol(format!(
            "truncated string: expected {} bytes, got {}",
            len,
            buf.remaining()
        )));
    }
    Ok(buf.split_to(len))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one length-prefixed frame payload from a blocking stream
pub fn read_frame<R: Read>(reader: &mut R, max_frame_size: usize) -> Result<Bytes> {
    let mut prefix = [0u8; LEN_PREFIX_SIZE];
    reader.read_exact(&mut prefix)?;

    let len = u32::from_le_bytes(prefix) as usize;
    if len > max_frame_size {
        return Err(ZestError::FrameTooLarge {
            len,
            max: max_frame_size,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Bytes::from(payload))
}

/// Read a complete request from a stream
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let payload = read_frame(reader, MAX_FRAME_SIZE)?;
    decode_request(payload, MAX_ARGS)
}

/// Write a request to a stream
pub fn write_request<W: Write, T: AsRef<[u8]>>(writer: &mut W, args: &[T]) -> Result<()> {
    writer.write_all(&encode_request(args))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete reply from a stream
pub fn read_reply<R: Read>(reader: &mut R) -> Result<Reply> {
    let payload = read_frame(reader, MAX_FRAME_SIZE)?;
    decode_reply(payload)
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    writer.write_all(&encode_reply(reply))?;
    writer.flush()?;
    Ok(())
}
