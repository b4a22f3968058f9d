//! Balance command implementation

use anyhow::Result;
use serde_json::json;

use crate::output::{OutputFormat, print_json};
use crate::utils::AppContext;

/// Print the account balance.
pub async fn execute(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let credentials = ctx.resume().await?;
    let balance = ctx.session.balance(&credentials).await?;
    match format {
        OutputFormat::Text => println!("${balance}"),
        OutputFormat::Json => print_json(&json!({ "balance": balance }))?,
    }
    Ok(())
}
