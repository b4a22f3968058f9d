//! Error types and handling for smsrelay-core operations.
//!
//! Every relay call, store access and tracker transition reports failure as an
//! [`Error`] value. Nothing in this crate is fatal: after any single failure the
//! tracker and session remain usable and the caller decides how to surface the
//! message.
//!
//! ## Error Categories
//!
//! - **Validation**: rejected locally before any relay call (missing credentials,
//!   missing service, malformed location filter)
//! - **Provider**: the relay reached the provider and it reported failure, or the
//!   command is not in the allow-list
//! - **Transport**: network failures, timeouts and malformed provider responses
//! - **State**: an action is not allowed for the record's current mode
//! - **Storage / Config**: local persistence and configuration problems
//!
//! ```rust
//! use smsrelay_core::Error;
//!
//! let err = Error::Validation("Area code must be between 201 and 999.".into());
//! assert_eq!(err.category(), "validation");
//! assert!(!err.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for smsrelay-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers reads and writes of the local store and configuration files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// The underlying `reqwest::Error` is preserved so callers can tell
    /// connection failures and timeouts apart.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Input was rejected before contacting the provider.
    #[error("{0}")]
    Validation(String),

    /// The provider answered with `status: error`.
    ///
    /// The message is the provider's own human-readable reason.
    #[error("{0}")]
    Provider(String),

    /// The command name is not in the relay allow-list.
    #[error("Unsupported Tellabot command: {0}")]
    UnsupportedCommand(String),

    /// The provider response was not valid JSON or lacked the status envelope.
    #[error("{message}")]
    Decode {
        /// Human-readable description of the decode failure.
        message: String,
        /// Raw response body as received from the provider.
        raw: String,
    },

    /// The provider reported success but the payload had an unexpected shape.
    ///
    /// Carries the payload rendered as JSON for diagnostics.
    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),

    /// The requested action is not allowed for the record's current state.
    ///
    /// ## Common Causes
    ///
    /// - Cancelling a record that is no longer `waiting`
    /// - Reactivating a record that has not received a message
    /// - Starting an action while another one is in flight for the same record
    #[error("{0}")]
    InvalidState(String),

    /// Requested record or key was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local persistence failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Relay call exceeded its time budget.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization or deserialization of local data failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if re-invoking the same action might succeed.
    ///
    /// The tracker never retries on its own; this only informs the caller's
    /// messaging (e.g. "try again" versus "fix your input").
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) | Self::Decode { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Returns `true` for failures that happened before any relay call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Get the error category as a string identifier.
    ///
    /// - `"io"`, `"network"`, `"timeout"`, `"decode"` - transport and local I/O
    /// - `"validation"` - rejected before contacting the provider
    /// - `"provider"` - provider failure or unsupported command
    /// - `"unexpected_response"` - provider success with an unusable payload
    /// - `"invalid_state"` - action not allowed in the record's mode
    /// - `"not_found"`, `"storage"`, `"config"`, `"serialization"`, `"other"`
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Validation(_) => "validation",
            Self::Provider(_) | Self::UnsupportedCommand(_) => "provider",
            Self::Decode { .. } => "decode",
            Self::UnexpectedResponse(_) => "unexpected_response",
            Self::InvalidState(_) => "invalid_state",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display_formatting() {
        let cases = vec![
            (
                Error::Validation("Please select a service.".to_string()),
                "Please select a service.",
            ),
            (
                Error::Provider("Invalid API key".to_string()),
                "Invalid API key",
            ),
            (
                Error::UnsupportedCommand("drop_tables".to_string()),
                "Unsupported Tellabot command: drop_tables",
            ),
            (
                Error::Decode {
                    message: "Invalid JSON response from Tellabot.".to_string(),
                    raw: "<html>".to_string(),
                },
                "Invalid JSON response from Tellabot.",
            ),
            (
                Error::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (Error::Timeout("15s".to_string()), "Timeout: 15s"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.category(), "io");
    }

    #[test]
    fn test_error_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(Error::Validation(String::new()).category(), "validation");
        assert_eq!(Error::Provider(String::new()).category(), "provider");
        assert_eq!(
            Error::UnsupportedCommand(String::new()).category(),
            "provider"
        );
        assert_eq!(Error::InvalidState(String::new()).category(), "invalid_state");
        assert_eq!(
            Error::UnexpectedResponse(String::new()).category(),
            "unexpected_response"
        );
        assert_eq!(Error::Other(String::new()).category(), "other");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(Error::Timeout("slow".into()).is_recoverable());
        assert!(Error::Io(io::Error::new(io::ErrorKind::Interrupted, "x")).is_recoverable());
        assert!(
            Error::Decode {
                message: "bad".into(),
                raw: String::new()
            }
            .is_recoverable()
        );

        assert!(!Error::Validation("bad filter".into()).is_recoverable());
        assert!(!Error::Provider("No numbers available".into()).is_recoverable());
        assert!(!Error::InvalidState("expired".into()).is_recoverable());
    }

    #[test]
    fn test_is_validation() {
        assert!(Error::Validation("x".into()).is_validation());
        assert!(!Error::Provider("x".into()).is_validation());
    }
}
