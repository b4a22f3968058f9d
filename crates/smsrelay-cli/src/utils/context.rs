//! Runtime wiring shared by every command.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use smsrelay_core::{
    Config, Credentials, FileStore, HttpRelay, Session, SystemClock, Tracker,
};
use tracing::debug;

use crate::error::CliError;

/// Relay shared by the session and the tracker.
pub type AppRelay = Arc<HttpRelay>;
/// Store shared by the session and the tracker.
pub type AppStore = Arc<FileStore>;
/// Tracker as wired at runtime.
pub type AppTracker = Tracker<AppRelay, AppStore, SystemClock>;

/// Loaded configuration plus the session and tracker built from it.
pub struct AppContext {
    pub config: Config,
    pub session: Session<AppRelay, AppStore>,
    pub tracker: Arc<AppTracker>,
}

impl AppContext {
    /// Load configuration, open the store and restore tracked numbers.
    pub fn open() -> Result<Self> {
        let config = Config::load()?;
        let relay = Arc::new(HttpRelay::new(&config.provider)?);
        let store = Arc::new(FileStore::open_default()?);
        debug!(store = %store.path().display(), provider = relay.base_url(), "opened context");

        let tracker = Arc::new(Tracker::restore(
            Arc::clone(&relay),
            Arc::clone(&store),
            SystemClock,
        )?);
        Ok(Self {
            config,
            session: Session::new(relay, store),
            tracker,
        })
    }

    /// Sign the tracker in with remembered credentials.
    pub async fn resume(&self) -> Result<Credentials> {
        let credentials = self.session.stored_credentials()?.ok_or_else(|| {
            CliError::usage(anyhow!("Not logged in. Run `smsrelay login` first."))
        })?;
        self.tracker.sign_in(credentials.clone()).await;
        Ok(credentials)
    }
}
