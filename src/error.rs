//! Error types for the ONTAP adapter
//!
//! Provides structured error types for the transport, the remote call status
//! check, response decoding and configuration.

use thiserror::Error;

/// Unified error type for the adapter
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed API envelope: {0}")]
    Xml(String),

    // =========================================================================
    // Remote Call Errors
    // =========================================================================
    #[error("{operation} error (errno {errno}): {reason}")]
    Protocol {
        operation: String,
        errno: i64,
        reason: String,
    },

    #[error("{operation} returned an unexpected response: {detail}")]
    UnexpectedResponse { operation: String, detail: String },

    // =========================================================================
    // Caller Errors
    // =========================================================================
    #[error("Invalid input: {0}")]
    Input(String),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a protocol error for a failed remote call
    pub fn protocol(operation: impl Into<String>, errno: i64, reason: impl Into<String>) -> Self {
        Error::Protocol {
            operation: operation.into(),
            errno,
            reason: reason.into(),
        }
    }

    /// Build an error for a passed response that lacks a required node
    pub fn unexpected(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::UnexpectedResponse {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// Check if this error is transient.
    ///
    /// The adapter never retries on its own; callers use this to decide
    /// whether a new attempt is worthwhile.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Connection(_) => true,
            Error::Transport(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Name of the remote call that failed, if any
    pub fn operation(&self) -> Option<&str> {
        match self {
            Error::Protocol { operation, .. } | Error::UnexpectedResponse { operation, .. } => {
                Some(operation)
            }
            _ => None,
        }
    }
}

/// Result type alias for the adapter
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_carries_reason() {
        let err = Error::protocol("system-get-version", 13005, "Unable to find API");
        let msg = err.to_string();
        assert!(msg.contains("system-get-version"));
        assert!(msg.contains("Unable to find API"));
        assert_eq!(err.operation(), Some("system-get-version"));
    }

    #[test]
    fn test_error_transient() {
        assert!(Error::Connection("refused".into()).is_transient());
        assert!(!Error::protocol("lun-get-iter", 1, "denied").is_transient());
        assert!(!Error::Input("bad filter".into()).is_transient());
        assert!(!Error::Parse("no version".into()).is_transient());
    }
}
