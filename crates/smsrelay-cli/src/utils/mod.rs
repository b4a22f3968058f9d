//! Shared helpers for command implementations.

pub mod context;
pub mod formatting;
pub mod logging;

pub use context::AppContext;
pub use logging::initialize_logging;
