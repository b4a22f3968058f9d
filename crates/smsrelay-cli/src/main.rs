//! smsrelay binary entry point; maps command errors to semantic exit codes.

use std::process::ExitCode;

use colored::Colorize;

#[tokio::main]
async fn main() -> ExitCode {
    match smsrelay_cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            if smsrelay_cli::error::is_retryable(&err) {
                eprintln!("{}", "hint: this may succeed if you try again".dimmed());
            }
            smsrelay_cli::error::category_of(&err).as_exit_code()
        },
    }
}
