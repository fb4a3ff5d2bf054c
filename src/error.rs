//! Unified error handling for slbnc.
//!
//! Protocol violations and flood refusals are not errors here: the former
//! drop a line, the latter are back-pressure. What remains are misuse of
//! the queue seam, session operations that need an upstream link, and a
//! client failing to register with the bouncer.

use slbnc_proto::ProtocolError;
use thiserror::Error;

// ============================================================================
// Queue Errors
// ============================================================================

/// Errors from the output queue seam.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The flood controller only drains attached queues; lines must be
    /// queued on one of those.
    #[error("operation not supported by {0}")]
    Unsupported(&'static str),
}

// ============================================================================
// Session Errors
// ============================================================================

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no upstream connection")]
    NoUpstream,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

impl SessionError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoUpstream => "no_upstream",
            Self::Protocol(e) => e.error_code(),
            Self::Queue(_) => "queue_unsupported",
        }
    }
}

// ============================================================================
// Client Registration Errors
// ============================================================================

/// Why a connecting client never became the attached client.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("registration timed out")]
    Timeout,

    #[error("connection closed during registration")]
    Closed,

    #[error("password incorrect")]
    BadPassword,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl RegistrationError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout => "registration_timeout",
            Self::Closed => "closed",
            Self::BadPassword => "bad_password",
            Self::Protocol(e) => e.error_code(),
        }
    }
}
