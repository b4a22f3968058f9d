//! Logout command implementation

use anyhow::Result;
use colored::Colorize;

use crate::utils::AppContext;

/// Forget credentials and drop every tracked number.
pub async fn execute(ctx: &AppContext) -> Result<()> {
    let tracked = ctx.tracker.records().await.len();
    ctx.session.logout()?;
    ctx.tracker.sign_out().await?;
    println!(
        "{} Logged out; cleared {tracked} tracked number(s).",
        "✓".green()
    );
    Ok(())
}
