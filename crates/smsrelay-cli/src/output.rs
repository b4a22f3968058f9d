//! # Output Formatting
//!
//! Commands print either human-readable text or JSON. When no format is
//! given, text is used on a terminal and JSON when stdout is piped, so
//! `smsrelay list | jq` works without extra flags.

use anyhow::Result;
use clap::Args;
use is_terminal::IsTerminal;
use serde::Serialize;
use smsrelay_core::{Mode, NumberRequest};

use crate::utils::formatting::format_countdown;

/// Supported output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty text output
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Shared clap argument for commands that accept an output format.
#[derive(Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatArg {
    /// Output format (`text` or `json`)
    #[arg(short = 'f', long = "format", value_enum, env = "SMSRELAY_OUTPUT_FORMAT")]
    pub format: Option<OutputFormat>,
}

impl FormatArg {
    /// Effective format: the explicit flag, else text on a terminal and JSON otherwise.
    #[must_use]
    pub fn resolve(&self) -> OutputFormat {
        if let Some(format) = self.format {
            return format;
        }
        if std::io::stdout().is_terminal() {
            OutputFormat::Text
        } else {
            OutputFormat::Json
        }
    }
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Reservation as shown to users, including the live countdown.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView<'a> {
    pub id: u64,
    pub phone_number: &'a str,
    pub service: &'a str,
    pub mode: Mode,
    pub status: &'a str,
    pub remaining_seconds: u64,
    pub countdown: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<&'a str>,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<&'a str>,
    pub expires_at: String,
}

impl<'a> From<&'a NumberRequest> for RecordView<'a> {
    fn from(record: &'a NumberRequest) -> Self {
        let expires_at = chrono::DateTime::from_timestamp_millis(record.expires_at)
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        Self {
            id: record.id,
            phone_number: &record.phone_number,
            service: &record.service_name,
            mode: record.mode,
            status: &record.status,
            remaining_seconds: record.remaining_seconds,
            countdown: format_countdown(record.remaining_seconds),
            region: record.region.as_deref(),
            carrier: record.carrier.as_deref(),
            price: record.price,
            sms: record.sms_text.as_deref(),
            expires_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use smsrelay_core::Reservation;

    #[test]
    fn explicit_format_wins() {
        let arg = FormatArg {
            format: Some(OutputFormat::Text),
        };
        assert_eq!(arg.resolve(), OutputFormat::Text);
    }

    #[test]
    fn record_view_exposes_countdown() {
        let payload = json!([{ "id": 9, "mdn": "13055550123", "service": "Google", "till_expiration": 125 }]);
        let record = NumberRequest::from_reservation(
            Reservation::from_payload(&payload, "Google", None).unwrap(),
            0,
        );
        let value = serde_json::to_value(RecordView::from(&record)).unwrap();
        assert_eq!(value["phoneNumber"], "13055550123");
        assert_eq!(value["mode"], "waiting");
        assert_eq!(value["remainingSeconds"], 125);
        assert_eq!(value["countdown"], "02:05");
        assert!(value.get("sms").is_none());
    }
}
