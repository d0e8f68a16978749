//! Error types for dispatchkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for dispatchkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Recognized keyword with the wrong arity or an unusable key
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// Unrecognized keyword, or a frame that is not an array of bulk strings.
    /// Carries the raw request text for diagnostics.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Input ended before a full frame was available
    #[error("truncated frame: {0}")]
    TruncatedFrame(String),

    // -------------------------------------------------------------------------
    // Value Errors
    // -------------------------------------------------------------------------
    #[error("key {0} not found")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    /// The other end of a channel has gone away
    #[error("disconnected: {0}")]
    Disconnected(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// True for errors caused by a single bad request, which never close the connection
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            KvError::MalformedCommand(_) | KvError::UnknownCommand(_) | KvError::TruncatedFrame(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_not_found_names_the_key() {
        let err = KvError::KeyNotFound("missing_key".to_string());
        assert_eq!(err.to_string(), "key missing_key not found");
    }

    #[test]
    fn protocol_errors_are_classified() {
        assert!(KvError::MalformedCommand("x".into()).is_protocol());
        assert!(KvError::UnknownCommand("x".into()).is_protocol());
        assert!(KvError::TruncatedFrame("x".into()).is_protocol());
        assert!(!KvError::KeyNotFound("x".into()).is_protocol());
    }
}
