//! Raw command passthrough

use anyhow::Result;

use crate::output::print_json;
use crate::utils::AppContext;

/// Run an allow-listed provider command and print its payload.
pub async fn execute(ctx: &AppContext, command: &str, params: &[(String, String)]) -> Result<()> {
    let credentials = ctx.resume().await?;
    let payload = ctx
        .session
        .raw(&credentials, command, params.iter().map(|(k, v)| (k, v.clone())))
        .await?;
    print_json(&payload)
}
