//! Login command implementation

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::output::{OutputFormat, print_json};
use crate::utils::AppContext;

/// Validate credentials against the provider and remember them if asked.
///
/// Without an explicit choice the preference stored by the previous login
/// applies.
pub async fn execute(
    ctx: &AppContext,
    user: &str,
    api_key: &str,
    remember: Option<bool>,
    format: OutputFormat,
) -> Result<()> {
    let remember = match remember {
        Some(choice) => choice,
        None => ctx.session.remember_preference()?,
    };
    let signed_in = ctx.session.login(user, api_key, remember).await?;
    ctx.tracker.sign_in(signed_in.credentials.clone()).await;

    match format {
        OutputFormat::Text => {
            println!(
                "{} Logged in as {}",
                "✓".green(),
                signed_in.credentials.user().bold()
            );
            println!("Balance: ${}", signed_in.balance);
            if !remember {
                println!(
                    "{}",
                    "Credentials were not stored; later commands will ask you to log in again."
                        .dimmed()
                );
            }
        },
        OutputFormat::Json => print_json(&json!({
            "user": signed_in.credentials.user(),
            "balance": signed_in.balance,
            "remembered": remember,
        }))?,
    }
    Ok(())
}
