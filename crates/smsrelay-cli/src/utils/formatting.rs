//! Formatting utilities

use colored::{ColoredString, Colorize};
use smsrelay_core::Mode;

/// Countdown as `mm:ss`; minutes are not capped at 59.
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Mode label colored by lifecycle state.
pub fn mode_label(mode: Mode) -> ColoredString {
    match mode {
        Mode::Waiting => mode.as_str().yellow(),
        Mode::Message => mode.as_str().green().bold(),
        Mode::Expired => mode.as_str().dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_is_zero_padded() {
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(9), "00:09");
        assert_eq!(format_countdown(125), "02:05");
        assert_eq!(format_countdown(900), "15:00");
        assert_eq!(format_countdown(6_000), "100:00");
    }

    #[test]
    fn labels_keep_mode_text() {
        colored::control::set_override(false);
        assert_eq!(mode_label(Mode::Waiting).to_string(), "waiting");
        assert_eq!(mode_label(Mode::Expired).to_string(), "expired");
    }
}
