//! Command implementations, one module per subcommand family.

mod actions;
mod balance;
mod list;
mod login;
mod logout;
mod raw;
mod request;
mod services;
mod watch;

pub use actions::{cancel, poll, reactivate};
pub use balance::execute as show_balance;
pub use list::execute as list_records;
pub use login::execute as login;
pub use logout::execute as logout;
pub use raw::execute as run_raw;
pub use request::execute as request_number;
pub use services::execute as list_services;
pub use watch::execute as watch;
