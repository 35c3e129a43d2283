//! Error types for ZestKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ZestError
pub type Result<T> = std::result::Result<T, ZestError>;

/// Unified error type for ZestKV operations
#[derive(Debug, Error)]
pub enum ZestError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Command Errors
    // -------------------------------------------------------------------------
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("wrong number of arguments for '{0}'")]
    WrongArity(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    WrongType(&'static str),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ZestError {
    /// Whether this error may be reported to a client as an `ERR` reply.
    ///
    /// I/O, network and config failures stay on the server side.
    pub fn is_client_facing(&self) -> bool {
        matches!(
            self,
            ZestError::Protocol(_)
                | ZestError::UnknownCommand(_)
                | ZestError::WrongArity(_)
                | ZestError::InvalidArgument(_)
                | ZestError::WrongType(_)
        )
    }

    /// Whether this error means the peer went away rather than misbehaved.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ZestError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// Whether this error is a socket read timeout.
    ///
    /// Unix reports `WouldBlock`, Windows reports `TimedOut`.
    pub fn is_timeout(&self) -> bool {
        match self {
            ZestError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
