//! smsrelay CLI - rent Tellabot numbers and wait for verification codes.
//!
//! The binary is a thin wrapper around [`run`]; every command lives in its
//! own module under `commands`.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
pub mod error;
mod output;
mod utils;

use cli::{Cli, Commands};
use output::OutputFormat;
use utils::{AppContext, initialize_logging};

/// Parse arguments and execute the selected command.
///
/// # Errors
///
/// Returns the command's error; map it to an exit code with
/// [`error::category_of`].
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let ctx = AppContext::open()?;
    execute_command(cli.command, &ctx).await
}

async fn execute_command(command: Commands, ctx: &AppContext) -> Result<()> {
    let format = command
        .format()
        .map_or(OutputFormat::Text, output::FormatArg::resolve);

    match command {
        Commands::Login {
            user,
            api_key,
            remember,
            no_remember,
            ..
        } => {
            let remember = cli::remember_choice(remember, no_remember);
            commands::login(ctx, &user, &api_key, remember, format).await
        },
        Commands::Logout => commands::logout(ctx).await,
        Commands::Balance { .. } => commands::show_balance(ctx, format).await,
        Commands::Services { .. } => commands::list_services(ctx, format).await,
        Commands::Request {
            service, location, ..
        } => commands::request_number(ctx, &service, &location, format).await,
        Commands::Cancel { id, .. } => commands::cancel(ctx, id, format).await,
        Commands::Reactivate { id, .. } => commands::reactivate(ctx, id, format).await,
        Commands::Poll { id, .. } => commands::poll(ctx, id, format).await,
        Commands::List { .. } => commands::list_records(ctx, format).await,
        Commands::Watch { .. } => commands::watch(ctx, format).await,
        Commands::Raw { command, params } => commands::run_raw(ctx, &command, &params).await,
    }
}
