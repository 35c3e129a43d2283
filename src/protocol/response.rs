//! Reply definitions
//!
//! Type-tagged values sent back to clients.

use bytes::Bytes;

use crate::error::ZestError;

/// Reply type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Nil = 0x00,
    Err = 0x01,
    Str = 0x02,
    Int = 0x03,
    Arr = 0x06,
}

impl Tag {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Tag::Nil),
            0x01 => Some(Tag::Err),
            0x02 => Some(Tag::Str),
            0x03 => Some(Tag::Int),
            0x06 => Some(Tag::Arr),
            _ => None,
        }
    }
}

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Missing value, or the acknowledgement for SET
    Nil,

    /// Request rejected; message is safe to show to clients
    Err(String),

    /// Byte string
    Str(Bytes),

    /// Signed integer
    Int(i64),

    /// Sequence of nested replies
    Arr(Vec<Reply>),
}

impl Reply {
    /// Create a STR reply
    pub fn str(value: impl Into<Bytes>) -> Self {
        Reply::Str(value.into())
    }

    /// Create an ERR reply
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Err(message.into())
    }

    /// Create an INT reply from a boolean outcome (1 / 0)
    pub fn flag(value: bool) -> Self {
        Reply::Int(value as i64)
    }

    /// Turn an error into a reply without leaking server internals.
    pub fn from_error(err: &ZestError) -> Self {
        match err {
            // framing problems are reported without the log prefix
            ZestError::Protocol(msg) => Reply::Err(msg.clone()),
            e if e.is_client_facing() => Reply::Err(e.to_string()),
            _ => Reply::Err("internal error".to_string()),
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Reply::Nil => Tag::Nil,
            Reply::Err(_) => Tag::Err,
            Reply::Str(_) => Tag::Str,
            Reply::Int(_) => Tag::Int,
            Reply::Arr(_) => Tag::Arr,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Err(_))
    }
}
