//! Command definitions
//!
//! The fixed command table, and validation of raw requests into typed
//! commands. Validation is the only place a well-framed request can be
//! rejected.

use bytes::Bytes;

use crate::error::{Result, ZestError};

/// A decoded request: command name followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub args: Vec<Bytes>,
}

impl Request {
    pub fn new(args: Vec<Bytes>) -> Self {
        Self { args }
    }

    /// Build a request from anything byte-like
    pub fn from_parts<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Self {
            args: parts
                .into_iter()
                .map(|p| Bytes::copy_from_slice(p.as_ref()))
                .collect(),
        }
    }
}

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Get,
    Set,
    Del,
    PExpire,
    PTtl,
    Ping,
    Keys,
    ZAdd,
    ZScore,
    ZRem,
    ZQuery,
}

impl CommandType {
    const ALL: [CommandType; 11] = [
        CommandType::Get,
        CommandType::Set,
        CommandType::Del,
        CommandType::PExpire,
        CommandType::PTtl,
        CommandType::Ping,
        CommandType::Keys,
        CommandType::ZAdd,
        CommandType::ZScore,
        CommandType::ZRem,
        CommandType::ZQuery,
    ];

    /// Wire name of the command
    pub fn name(self) -> &'static str {
        match self {
            CommandType::Get => "get",
            CommandType::Set => "set",
            CommandType::Del => "del",
            CommandType::PExpire => "pexpire",
            CommandType::PTtl => "pttl",
            CommandType::Ping => "ping",
            CommandType::Keys => "keys",
            CommandType::ZAdd => "zadd",
            CommandType::ZScore => "zscore",
            CommandType::ZRem => "zrem",
            CommandType::ZQuery => "zquery",
        }
    }

    /// Number of arguments after the command name
    pub fn arity(self) -> usize {
        match self {
            CommandType::Ping | CommandType::Keys => 0,
            CommandType::Get | CommandType::Del | CommandType::PTtl => 1,
            CommandType::Set | CommandType::PExpire => 2,
            CommandType::ZScore | CommandType::ZRem => 2,
            CommandType::ZAdd => 3,
            CommandType::ZQuery => 5,
        }
    }

    /// Look up a command by name (ASCII case-insensitive)
    pub fn lookup(name: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name().as_bytes().eq_ignore_ascii_case(name))
    }
}

/// A validated command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Get a scalar value by key
    Get { key: Bytes },

    /// Set a scalar value
    Set { key: Bytes, value: Bytes },

    /// Delete a key
    Del { key: Bytes },

    /// Set a TTL in milliseconds (negative removes the TTL)
    PExpire { key: Bytes, millis: i64 },

    /// Remaining TTL in milliseconds
    PTtl { key: Bytes },

    /// Health check
    Ping,

    /// List live keys
    Keys,

    /// Add or update a sorted-set member
    ZAdd { key: Bytes, score: f64, member: Bytes },

    /// Score of a sorted-set member
    ZScore { key: Bytes, member: Bytes },

    /// Remove a sorted-set member
    ZRem { key: Bytes, member: Bytes },

    /// Seek to (score, member), skip `offset`, return up to `limit` pairs
    ZQuery {
        key: Bytes,
        score: f64,
        member: Bytes,
        offset: i64,
        limit: i64,
    },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Del { .. } => CommandType::Del,
            Command::PExpire { .. } => CommandType::PExpire,
            Command::PTtl { .. } => CommandType::PTtl,
            Command::Ping => CommandType::Ping,
            Command::Keys => CommandType::Keys,
            Command::ZAdd { .. } => CommandType::ZAdd,
            Command::ZScore { .. } => CommandType::ZScore,
            Command::ZRem { .. } => CommandType::ZRem,
            Command::ZQuery { .. } => CommandType::ZQuery,
        }
    }

    /// Validate a request against the command table
    pub fn from_request(request: Request) -> Result<Command> {
        let mut args = request.args.into_iter();
        let name = args
            .next()
            .ok_or_else(|| ZestError::Protocol("empty request".to_string()))?;

        let ty = CommandType::lookup(&name)
            .ok_or_else(|| ZestError::UnknownCommand(String::from_utf8_lossy(&name).into_owned()))?;

        let args: Vec<Bytes> = args.collect();
        if args.len() != ty.arity() {
            return Err(ZestError::WrongArity(ty.name().to_string()));
        }
        let mut args = args.into_iter();
        // arity checked above, so every `next_arg` call has an argument
        let mut next_arg = || args.next().unwrap_or_default();

        let command = match ty {
            CommandType::Get => Command::Get { key: next_arg() },
            CommandType::Set => Command::Set {
                key: next_arg(),
                value: next_arg(),
            },
            CommandType::Del => Command::Del { key: next_arg() },
            CommandType::PExpire => Command::PExpire {
                key: next_arg(),
                millis: parse_int(&next_arg())?,
            },
            CommandType::PTtl => Command::PTtl { key: next_arg() },
            CommandType::Ping => Command::Ping,
            CommandType::Keys => Command::Keys,
            CommandType::ZAdd => Command::ZAdd {
                key: next_arg(),
                score: parse_score(&next_arg())?,
                member: next_arg(),
            },
            CommandType::ZScore => Command::ZScore {
                key: next_arg(),
                member: next_arg(),
            },
            CommandType::ZRem => Command::ZRem {
                key: next_arg(),
                member: next_arg(),
            },
            CommandType::ZQuery => Command::ZQuery {
                key: next_arg(),
                score: parse_score(&next_arg())?,
                member: next_arg(),
                offset: parse_int(&next_arg())?,
                limit: parse_int(&next_arg())?,
            },
        };
        Ok(command)
    }
}

/// Parse a score. NaN is rejected so the order index stays total.
fn parse_score(raw: &[u8]) -> Result<f64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| !v.is_nan())
        .ok_or_else(|| ZestError::InvalidArgument("expect float".to_string()))
}

fn parse_int(raw: &[u8]) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ZestError::InvalidArgument("expect int".to_string()))
}
