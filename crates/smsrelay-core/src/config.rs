//! Configuration management for smsrelay.
//!
//! Configuration is stored as TOML in the configuration directory and falls
//! back to defaults when the file is absent. Environment variables take
//! precedence over the file.
//!
//! ## Configuration Hierarchy
//!
//! 1. **Defaults**: the public Tellabot endpoint, a 15 second relay timeout,
//!    a 1 second countdown tick and a 10 second SMS poll
//! 2. **Config file**: `<config_dir>/config.toml`
//! 3. **Environment variables**: `SMSRELAY_PROVIDER_URL`, `SMSRELAY_TIMEOUT_SECS`
//!
//! ## Example Configuration File
//!
//! ```toml
//! [provider]
//! base_url = "https://www.tellabot.com/sims/api_command.php"
//! timeout_secs = 15
//!
//! [schedule]
//! tick_secs = 1
//! poll_secs = 10
//! ```

use crate::{Error, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default provider command endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://www.tellabot.com/sims/api_command.php";

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "smsrelay";
const DOT_DIR: &str = ".smsrelay";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Provider endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Periodic trigger settings
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Where and how the relay reaches the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Absolute URL of the provider's command endpoint.
    pub base_url: String,

    /// Upper bound for a single relay call, in seconds.
    ///
    /// A call exceeding this budget is reported as a timeout; there is no
    /// automatic retry.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

impl ProviderConfig {
    /// Relay timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Intervals of the countdown ticker and SMS poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Countdown tick interval in seconds.
    pub tick_secs: u64,
    /// SMS poll interval in seconds.
    pub poll_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_secs: 1,
            poll_secs: 10,
        }
    }
}

impl ScheduleConfig {
    /// Countdown tick interval.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    /// SMS poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides.
    ///
    /// A missing file yields defaults; a malformed file is an error.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join(CONFIG_FILENAME);
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from an explicit path without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SMSRELAY_*` overrides using the supplied variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SMSRELAY_PROVIDER_URL") {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.provider.base_url = trimmed.to_string();
            }
        }

        if let Some(raw) = lookup("SMSRELAY_TIMEOUT_SECS") {
            self.provider.timeout_secs = raw.trim().parse().map_err(|_| {
                Error::Config(format!("SMSRELAY_TIMEOUT_SECS must be an integer, got '{raw}'"))
            })?;
        }

        self.validate()
    }

    /// Check value ranges and the provider URL.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.provider.base_url)
            .map_err(|e| Error::Config(format!("Invalid provider URL '{}': {e}", self.provider.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Provider URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if self.provider.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".into()));
        }
        if self.schedule.tick_secs == 0 || self.schedule.poll_secs == 0 {
            return Err(Error::Config(
                "tick_secs and poll_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Resolve the configuration directory honoring overrides.
///
/// Order: `SMSRELAY_CONFIG_DIR`, `XDG_CONFIG_HOME/<slug>`, `~/.smsrelay`.
pub fn config_dir() -> Result<PathBuf> {
    resolve_dir("SMSRELAY_CONFIG_DIR", "XDG_CONFIG_HOME")
}

/// Resolve the data directory holding the local store.
///
/// Order: `SMSRELAY_DATA_DIR`, `XDG_DATA_HOME/<slug>`, `~/.smsrelay`.
pub fn data_dir() -> Result<PathBuf> {
    resolve_dir("SMSRELAY_DATA_DIR", "XDG_DATA_HOME")
}

fn resolve_dir(explicit_var: &str, xdg_var: &str) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(explicit_var) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if let Ok(xdg) = std::env::var(xdg_var) {
        let trimmed = xdg.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed).join(APP_DIR));
        }
    }

    BaseDirs::new()
        .map(|base| base.home_dir().join(DOT_DIR))
        .ok_or_else(|| Error::Config("Failed to determine home directory".into()))
}
