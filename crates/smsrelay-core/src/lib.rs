//! # smsrelay-core
//!
//! Core functionality for smsrelay - a relay and lifecycle tracker for
//! temporary SMS verification numbers rented from Tellabot.
//!
//! A reservation is requested through the provider's command API, then
//! tracked locally until it either receives a message or its countdown runs
//! out. Everything the tracker knows is mirrored to a local store so that a
//! restart picks up where the previous run stopped.
//!
//! ## Architecture
//!
//! - **Relay**: allow-listed pass-through to the provider command API
//! - **Tracker**: the reservation list and its `waiting → message | expired`
//!   state machine
//! - **Scheduler**: the countdown ticker and the SMS poller
//! - **Store**: flat key-value persistence with in-memory and file backings
//! - **Session**: sign-in, remembered credentials and account queries
//!
//! ## Quick Start
//!
//! ```rust
//! use smsrelay_core::{LocationFilter, MemoryStore, StoreKey, KeyValueStore};
//!
//! let filter = LocationFilter::area_code("305")?;
//! assert_eq!(filter.as_param(), Some(("areacode", "305")));
//! assert!(LocationFilter::area_code("123").is_err());
//!
//! let store = MemoryStore::new();
//! store.set(StoreKey::Remember, "false")?;
//! assert_eq!(store.get(StoreKey::Remember)?.as_deref(), Some("false"));
//! # Ok::<(), smsrelay_core::Error>(())
//! ```

/// Wall-clock abstraction
pub mod clock;
/// Configuration loading and directory resolution
pub mod config;
/// Error types and result aliases
pub mod error;
/// Provider command relay
pub mod relay;
/// Countdown and polling loops
pub mod scheduler;
/// Sign-in and account-level queries
pub mod session;
/// Local key-value persistence
pub mod store;
/// Reservation lifecycle tracking
pub mod tracker;
/// Core data types
pub mod types;
/// Input validation
pub mod validation;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ProviderConfig, ScheduleConfig};
pub use error::{Error, Result};
pub use relay::{Command, CommandRelay, Credentials, HttpRelay, RelayRequest};
pub use scheduler::Scheduler;
pub use session::{Session, SignedIn};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreKey};
pub use tracker::{PollOutcome, Tracker, TrackerStatus};
pub use types::*;
pub use validation::{LocationFilter, US_STATES};
