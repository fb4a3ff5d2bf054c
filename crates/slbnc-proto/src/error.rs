//! Error types for the protocol layer.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Protocol violations detected while framing or parsing a line.
///
/// None of these are fatal to a session: the offending line is dropped and
/// processing continues with the next one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line exceeded the maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual line length, excluding the terminator.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Line held no tokens.
    #[error("empty line")]
    EmptyLine,

    /// Line carried a prefix but no command.
    #[error("missing command after prefix")]
    MissingCommand,
}

impl ProtocolError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::LineTooLong { .. } => "line_too_long",
            Self::EmptyLine => "empty_line",
            Self::MissingCommand => "missing_command",
        }
    }
}
