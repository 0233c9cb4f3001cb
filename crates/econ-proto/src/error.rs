//! Error types for the econ protocol library.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line was not valid UTF-8.
    #[error("invalid UTF-8 in line at byte {byte_pos}")]
    InvalidUtf8 {
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
    },

    /// Line exceeded maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Outgoing command contained a line break.
    #[error("command contains a line break")]
    EmbeddedNewline,

    /// The server rejected the console password.
    #[error("wrong password: {0}")]
    WrongPassword(String),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,

    /// The server did not answer in time.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

impl ProtocolError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::InvalidUtf8 { .. } => "invalid_utf8",
            Self::LineTooLong { .. } => "line_too_long",
            Self::EmbeddedNewline => "embedded_newline",
            Self::WrongPassword(_) => "wrong_password",
            Self::Closed => "closed",
            Self::Timeout(_) => "timeout",
        }
    }
}
