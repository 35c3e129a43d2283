//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (binary, little-endian, length-framed)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬──────────────────────────────────┐
//! │ Len (4)  │ Argc (4) │ Argc × (Len (4) + bytes)         │
//! └──────────┴──────────┴──────────────────────────────────┘
//! ```
//!
//! The first argument is the command name.
//!
//! ### Commands
//! - get KEY                              → STR | NIL
//! - set KEY VALUE                        → NIL
//! - del KEY                              → INT 1/0
//! - pexpire KEY MILLIS                   → INT 1/0
//! - pttl KEY                             → INT -2 / -1 / remaining ms
//! - ping                                 → STR "pong"
//! - keys                                 → ARR of STR
//! - zadd KEY SCORE MEMBER                → INT 1/0
//! - zscore KEY MEMBER                    → STR | NIL
//! - zrem KEY MEMBER                      → INT 1/0
//! - zquery KEY SCORE MEMBER OFFSET LIMIT → ARR (member, score, ...)
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ Tag (1)  │       Tag payload           │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Tags
//! - 0x00: NIL
//! - 0x01: ERR
//! - 0x02: STR
//! - 0x03: INT
//! - 0x06: ARR

mod codec;
mod command;
mod response;

pub use codec::{
    decode_reply, decode_request, encode_reply, encode_reply_limited, encode_request,
    read_frame, read_reply, read_request, write_reply, write_request, FrameDecoder,
    LEN_PREFIX_SIZE, MAX_ARGS, MAX_FRAME_SIZE,
};
pub use command::{Command, CommandType, Request};
pub use response::{Reply, Tag};
