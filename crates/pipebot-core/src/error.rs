//! Unified error types for the pipebot core.
//!
//! Runtime-level errors (configuration, bot construction) live in
//! `pipebot-runtime`.

use thiserror::Error;

// =============================================================================
// Pipe Errors
// =============================================================================

/// Errors raised while building a [`Pipe`](crate::pipe::Pipe).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipeError {
    /// The pipe was built from neither a message nor a callback, from a
    /// non-routable event, or without a transport handle.
    #[error("invalid pipe construction: {reason}")]
    InvalidConstruction {
        /// Why construction was rejected.
        reason: &'static str,
    },
}

impl PipeError {
    pub(crate) fn invalid(reason: &'static str) -> Self {
        Self::InvalidConstruction { reason }
    }
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors surfaced by a [`Transport`](crate::transport::Transport).
///
/// The core never retries; these are handed back to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport is not connected to its backend.
    #[error("transport is not connected")]
    NotConnected,

    /// An outbound call could not be delivered.
    #[error("failed to send: {0}")]
    SendFailed(String),

    /// The backend rejected an operation.
    #[error("{operation} rejected: {reason}")]
    Rejected {
        /// The operation name (e.g. `send_message`).
        operation: &'static str,
        /// Reason reported by the backend.
        reason: String,
    },

    /// `answer_callback` was called on a pipe without a callback.
    #[error("no callback to answer")]
    MissingCallback,

    /// The inbound channels were closed.
    #[error("inbound channel closed")]
    Closed,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

// =============================================================================
// Handler Errors
// =============================================================================

/// A failure returned by a handler operation.
///
/// The router turns this into an `"Error - <message>"` reply; its `Display`
/// is exactly the message so the reply carries the literal failure text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error with the given message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<TransportError> for HandlerError {
    fn from(err: TransportError) -> Self {
        Self::msg(err.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for pipe construction.
pub type PipeResult<T> = Result<T, PipeError>;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for handler operations.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_display_is_raw_message() {
        let err = HandlerError::msg("boom");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(format!("Error - {err}"), "Error - boom");
    }

    #[test]
    fn test_handler_error_from_transport() {
        let err: HandlerError = TransportError::SendFailed("timeout".into()).into();
        assert_eq!(err.message(), "failed to send: timeout");
    }
}
