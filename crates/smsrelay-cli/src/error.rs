//! CLI error handling with semantic exit codes.
//!
//! | Code | Category | Description |
//! |------|----------|-------------|
//! | 0 | Success | Command completed successfully |
//! | 1 | `Internal` | Unexpected/internal error |
//! | 2 | `Usage` | Invalid input, missing login or an action not allowed right now |
//! | 3 | `NotFound` | No tracked number with that id |
//! | 4 | `ProviderRejected` | Tellabot answered `status: error` |
//! | 5 | `Network` | Provider unreachable |
//! | 6 | `Timeout` | Provider did not answer in time |
//! | 7 | `Integrity` | Malformed provider payload or unreadable local data |
//!
//! ```bash
//! smsrelay cancel 4471
//! case $? in
//!     0) echo "cancelled" ;;
//!     4) echo "provider refused" ;;
//!     *) echo "other error" ;;
//! esac
//! ```

use std::fmt;
use std::process::ExitCode;

use smsrelay_core::Error as CoreError;

/// Semantic error category determining the exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Unexpected or internal error (exit code 1).
    Internal = 1,
    /// Invalid arguments, missing login or a disallowed action (exit code 2).
    Usage = 2,
    /// Requested record not found (exit code 3).
    NotFound = 3,
    /// The provider rejected the command (exit code 4).
    ProviderRejected = 4,
    /// Network failure talking to the provider (exit code 5).
    Network = 5,
    /// The provider did not answer in time (exit code 6).
    Timeout = 6,
    /// Malformed provider payload or unreadable local state (exit code 7).
    Integrity = 7,
}

impl ErrorCategory {
    /// Exit code for this category.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        self as u8
    }

    /// `ExitCode` for this category.
    #[must_use]
    pub fn as_exit_code(self) -> ExitCode {
        ExitCode::from(self.exit_code())
    }

    /// Short description of this category.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Internal => "internal error",
            Self::Usage => "usage error",
            Self::NotFound => "not found",
            Self::ProviderRejected => "rejected by provider",
            Self::Network => "network error",
            Self::Timeout => "timeout",
            Self::Integrity => "integrity error",
        }
    }

    /// Category for a core error.
    #[must_use]
    pub const fn from_core(err: &CoreError) -> Self {
        match err {
            CoreError::Validation(_)
            | CoreError::UnsupportedCommand(_)
            | CoreError::InvalidState(_)
            | CoreError::Config(_) => Self::Usage,
            CoreError::NotFound(_) => Self::NotFound,
            CoreError::Provider(_) => Self::ProviderRejected,
            CoreError::Network(_) | CoreError::Io(_) => Self::Network,
            CoreError::Timeout(_) => Self::Timeout,
            CoreError::Decode { .. }
            | CoreError::UnexpectedResponse(_)
            | CoreError::Storage(_)
            | CoreError::Serialization(_) => Self::Integrity,
            CoreError::Other(_) => Self::Internal,
        }
    }

    /// Heuristic fallback for errors that carry no category.
    #[must_use]
    pub fn infer_from_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
            return Self::Timeout;
        }
        if msg_lower.contains("connection")
            || msg_lower.contains("network")
            || msg_lower.contains("dns")
            || msg_lower.contains("unreachable")
        {
            return Self::Network;
        }
        if msg_lower.contains("not found") || msg_lower.contains("no such") {
            return Self::NotFound;
        }
        if msg_lower.contains("corrupt") || msg_lower.contains("invalid json") {
            return Self::Integrity;
        }
        if msg_lower.contains("invalid argument") || msg_lower.contains("not logged in") {
            return Self::Usage;
        }
        Self::Internal
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A CLI error with a semantic category for exit code mapping.
#[derive(Debug)]
pub struct CliError {
    /// The semantic category of this error.
    pub category: ErrorCategory,
    /// The underlying error with full context.
    pub source: anyhow::Error,
}

impl CliError {
    /// Error with an explicit category.
    pub fn new(category: ErrorCategory, source: impl Into<anyhow::Error>) -> Self {
        Self {
            category,
            source: source.into(),
        }
    }

    /// Usage error.
    pub fn usage(source: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorCategory::Usage, source)
    }

    /// Exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.category.exit_code()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Category of an `anyhow::Error`.
///
/// Explicit [`CliError`] categories win, then core error variants anywhere
/// in the chain, then message heuristics.
#[must_use]
pub fn category_of(err: &anyhow::Error) -> ErrorCategory {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.category;
    }
    core_error(err).map_or_else(
        || ErrorCategory::infer_from_message(&err.to_string()),
        ErrorCategory::from_core,
    )
}

/// Whether running the same command again might succeed.
#[must_use]
pub fn is_retryable(err: &anyhow::Error) -> bool {
    core_error(err).is_some_and(CoreError::is_recoverable)
}

fn core_error(err: &anyhow::Error) -> Option<&CoreError> {
    err.chain().find_map(|cause| cause.downcast_ref::<CoreError>())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(ErrorCategory::Internal.exit_code(), 1);
        assert_eq!(ErrorCategory::Usage.exit_code(), 2);
        assert_eq!(ErrorCategory::NotFound.exit_code(), 3);
        assert_eq!(ErrorCategory::ProviderRejected.exit_code(), 4);
        assert_eq!(ErrorCategory::Network.exit_code(), 5);
        assert_eq!(ErrorCategory::Timeout.exit_code(), 6);
        assert_eq!(ErrorCategory::Integrity.exit_code(), 7);
    }

    #[test]
    fn core_errors_map_to_categories() {
        let cases = [
            (CoreError::Validation("x".into()), 2),
            (CoreError::UnsupportedCommand("drop".into()), 2),
            (CoreError::InvalidState("busy".into()), 2),
            (CoreError::NotFound("7".into()), 3),
            (CoreError::Provider("Invalid API key".into()), 4),
            (CoreError::Timeout("15s".into()), 6),
            (
                CoreError::Decode {
                    message: "Invalid JSON response from Tellabot.".into(),
                    raw: "<html>".into(),
                },
                7,
            ),
        ];
        for (core, code) in cases {
            let err = anyhow::Error::from(core);
            assert_eq!(category_of(&err).exit_code(), code, "{err}");
        }
    }

    #[test]
    fn context_does_not_hide_the_core_error() {
        let err = Err::<(), _>(CoreError::Provider("No numbers available".into()))
            .context("request failed")
            .unwrap_err();
        assert_eq!(category_of(&err), ErrorCategory::ProviderRejected);
    }

    #[test]
    fn explicit_category_wins() {
        let err: anyhow::Error = CliError::usage(anyhow!("Not logged in.")).into();
        assert_eq!(category_of(&err).exit_code(), 2);
        assert_eq!(err.to_string(), "Not logged in.");
    }

    #[test]
    fn retry_hint_follows_core_recoverability() {
        let timeout = Err::<(), _>(CoreError::Timeout("15s".into()))
            .context("balance failed")
            .unwrap_err();
        assert!(is_retryable(&timeout));

        let rejected = anyhow::Error::from(CoreError::Provider("Invalid API key".into()));
        assert!(!is_retryable(&rejected));
        assert!(!is_retryable(&anyhow!("Something went wrong")));
    }

    #[test]
    fn plain_messages_are_inferred() {
        assert_eq!(
            ErrorCategory::infer_from_message("Operation timed out"),
            ErrorCategory::Timeout
        );
        assert_eq!(
            ErrorCategory::infer_from_message("Connection refused"),
            ErrorCategory::Network
        );
        assert_eq!(
            ErrorCategory::infer_from_message("Something went wrong"),
            ErrorCategory::Internal
        );
    }
}
