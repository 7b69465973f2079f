//! # Cursor Error Kinds
//!
//! Errors a cursor operation can report to its caller. End-of-data is never
//! an error: iteration APIs return `Ok(None)` when a traversal is exhausted,
//! so an empty value (`Ok(Some(..))` with empty content) stays
//! distinguishable from the end of the result set.
//!
//! `Unbound`, `InvalidArgument`, and `AsyncNotSupported` are detected
//! locally, before any connection I/O, and leave cursor state untouched.
//! `Remote` carries the remote status verbatim where the connection supplies
//! one; decode failures on remote-produced buffers use [`REMOTE_DECODE_CODE`]
//! with the general-error SQLSTATE.

use thiserror::Error;

/// Status code reported for malformed buffers received from a connection.
pub const REMOTE_DECODE_CODE: i32 = -1;

/// General-error SQLSTATE used when the remote side supplied no state.
pub const GENERAL_ERROR_STATE: &str = "HY000";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// The cursor has no active connection (never bound, or closed).
    #[error("cursor is not bound to an open connection")]
    Unbound,

    /// A caller-supplied argument is unusable (e.g. reset without a global
    /// reference, execute outside SQL mode).
    #[error("invalid cursor argument: {0}")]
    InvalidArgument(String),

    /// The host requested deferred completion for a cursor operation.
    #[error("cursor operations cannot be invoked asynchronously")]
    AsyncNotSupported,

    /// A connection primitive reported an error, or a buffer it produced
    /// could not be decoded.
    #[error("remote failure (code {code}, state {state}): {message}")]
    Remote {
        code: i32,
        state: String,
        message: String,
    },
}

impl CursorError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CursorError::InvalidArgument(message.into())
    }

    /// Remote buffer that does not decode as the value-block format.
    pub fn malformed(message: impl Into<String>) -> Self {
        CursorError::Remote {
            code: REMOTE_DECODE_CODE,
            state: GENERAL_ERROR_STATE.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = CursorError> = std::result::Result<T, E>;
