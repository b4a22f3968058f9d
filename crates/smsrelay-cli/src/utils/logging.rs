//! Logging initialization and color control.

use anyhow::Result;
use colored::control as color_control;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;
use crate::output::OutputFormat;

/// Install the global tracing subscriber on stderr.
///
/// `--verbose`/`--debug` select DEBUG, `--quiet` selects ERROR, otherwise
/// WARN. Commands emitting JSON are held at ERROR unless verbosity was
/// requested explicitly, and lose colors.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let mut level = if cli.verbose || cli.debug {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };

    let machine_output = cli
        .command
        .format()
        .is_some_and(|format| format.resolve() == OutputFormat::Json);
    if machine_output && !(cli.verbose || cli.debug) {
        level = Level::ERROR;
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let env_no_color = std::env::var_os("NO_COLOR").is_some();
    if cli.no_color || env_no_color || machine_output {
        color_control::set_override(false);
    }
    Ok(())
}
