//! Services command implementation

use anyhow::Result;
use colored::Colorize;
use smsrelay_core::ServiceInfo;

use crate::output::{OutputFormat, print_json};
use crate::utils::AppContext;

/// Print the provider's service catalog.
pub async fn execute(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let credentials = ctx.resume().await?;
    let services = ctx.session.list_services(&credentials).await?;

    match format {
        OutputFormat::Text => print_text(&services),
        OutputFormat::Json => print_json(&services)?,
    }
    Ok(())
}

fn print_text(services: &[ServiceInfo]) {
    if services.is_empty() {
        println!("The provider returned no services.");
        return;
    }

    let width = services
        .iter()
        .map(|svc| svc.name.chars().count())
        .max()
        .unwrap_or(0);
    for svc in services {
        let price = svc
            .price
            .as_deref()
            .map_or_else(|| "-".dimmed().to_string(), |p| format!("${p}"));
        let available = svc.available.as_deref().unwrap_or("-");
        let name = format!("{:<width$}", svc.name);
        println!("{}  {price:>8}  {available} available", name.bold());
    }
}
