//! # CLI Structure and Argument Parsing
//!
//! `smsrelay` follows a command-subcommand layout built with `clap` derive
//! macros. Global flags control logging and color; each command that prints
//! data accepts `--format`.
//!
//! ```bash
//! smsrelay login --user alice --api-key XXXX
//! smsrelay request Google --area-code 305
//! smsrelay watch
//! smsrelay list --format json
//! smsrelay raw ltr_status mdn=13055550123
//! ```

use clap::{Args, Parser, Subcommand};

use crate::output::FormatArg;

/// Main CLI structure for the `smsrelay` command.
#[derive(Parser, Clone, Debug)]
#[command(name = "smsrelay")]
#[command(version)]
#[command(about = "smsrelay - rent Tellabot numbers and wait for verification SMS", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Enable debug logging, including every relay call
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Validate credentials and start a session
    Login {
        /// Tellabot account name
        #[arg(long, env = "SMSRELAY_USER")]
        user: String,
        /// Tellabot API key
        #[arg(long = "api-key", env = "SMSRELAY_API_KEY", hide_env_values = true)]
        api_key: String,
        /// Store credentials for later runs (default follows the last login)
        #[arg(long, conflicts_with = "no_remember")]
        remember: bool,
        /// Do not store credentials for later runs
        #[arg(long = "no-remember")]
        no_remember: bool,
        #[command(flatten)]
        format: FormatArg,
    },

    /// Forget credentials and every tracked number
    Logout,

    /// Show the account balance
    Balance {
        #[command(flatten)]
        format: FormatArg,
    },

    /// List services with their prices
    Services {
        #[command(flatten)]
        format: FormatArg,
    },

    /// Reserve a number for a service
    Request {
        /// Service name as listed by `smsrelay services`
        service: String,
        #[command(flatten)]
        location: LocationArgs,
        #[command(flatten)]
        format: FormatArg,
    },

    /// Cancel a waiting number
    Cancel {
        /// Reservation id
        id: u64,
        #[command(flatten)]
        format: FormatArg,
    },

    /// Reserve a number again after it received a message
    Reactivate {
        /// Reservation id of a number that received a message
        id: u64,
        #[command(flatten)]
        format: FormatArg,
    },

    /// Check once for incoming messages
    Poll {
        /// Reservation id; all waiting numbers when omitted
        id: Option<u64>,
        #[command(flatten)]
        format: FormatArg,
    },

    /// Show tracked numbers, newest first
    List {
        #[command(flatten)]
        format: FormatArg,
    },

    /// Keep counting down and polling until nothing is waiting
    Watch {
        #[command(flatten)]
        format: FormatArg,
    },

    /// Run any allow-listed provider command
    Raw {
        /// Provider command, e.g. `ltr_status`
        command: String,
        /// Parameters as `key=value`
        #[arg(value_name = "KEY=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
}

/// Mutually exclusive location filters for `request`.
#[derive(Args, Clone, Debug, Default)]
#[group(multiple = false)]
pub struct LocationArgs {
    /// Two-letter US state code
    #[arg(long)]
    pub state: Option<String>,
    /// Three-digit area code (201-999)
    #[arg(long = "area-code")]
    pub area_code: Option<String>,
    /// Specific 11-digit number
    #[arg(long)]
    pub mdn: Option<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Explicit remember-me choice from `--remember` / `--no-remember`.
pub const fn remember_choice(remember: bool, no_remember: bool) -> Option<bool> {
    if remember {
        Some(true)
    } else if no_remember {
        Some(false)
    } else {
        None
    }
}

impl Commands {
    /// Output format flag for commands that print data.
    pub const fn format(&self) -> Option<&FormatArg> {
        match self {
            Self::Login { format, .. }
            | Self::Balance { format }
            | Self::Services { format }
            | Self::Request { format, .. }
            | Self::Cancel { format, .. }
            | Self::Reactivate { format, .. }
            | Self::Poll { format, .. }
            | Self::List { format }
            | Self::Watch { format } => Some(format),
            Self::Logout | Self::Raw { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn location_filters_are_exclusive() {
        let result = Cli::try_parse_from([
            "smsrelay", "request", "Google", "--state", "FL", "--area-code", "305",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn raw_params_parse_as_pairs() {
        let cli = Cli::try_parse_from(["smsrelay", "raw", "ltr_status", "mdn=13055550123", "x="])
            .unwrap();
        match cli.command {
            Commands::Raw { command, params } => {
                assert_eq!(command, "ltr_status");
                assert_eq!(
                    params,
                    vec![
                        ("mdn".to_string(), "13055550123".to_string()),
                        ("x".to_string(), String::new())
                    ]
                );
            },
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["smsrelay", "raw", "balance", "novalue"]).is_err());
    }

    #[test]
    fn remember_flags_conflict() {
        let base = ["smsrelay", "login", "--user", "alice", "--api-key", "k"];
        let both = [&base[..], &["--remember", "--no-remember"][..]].concat();
        assert!(Cli::try_parse_from(both).is_err());

        assert_eq!(remember_choice(false, false), None);
        assert_eq!(remember_choice(true, false), Some(true));
        assert_eq!(remember_choice(false, true), Some(false));
    }
}
