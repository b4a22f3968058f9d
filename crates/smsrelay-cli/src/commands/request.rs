//! Request command implementation

use anyhow::Result;
use colored::Colorize;
use smsrelay_core::LocationFilter;

use crate::cli::LocationArgs;
use crate::commands::list::print_record;
use crate::output::{OutputFormat, RecordView, print_json};
use crate::utils::AppContext;

/// Reserve a number and start tracking it.
pub async fn execute(
    ctx: &AppContext,
    service: &str,
    location: &LocationArgs,
    format: OutputFormat,
) -> Result<()> {
    let filter = LocationFilter::from_parts(
        location.state.as_deref(),
        location.area_code.as_deref(),
        location.mdn.as_deref(),
    )?;
    ctx.resume().await?;

    let record = ctx.tracker.request_number(service, &filter).await?;
    match format {
        OutputFormat::Text => {
            println!("{} Number reserved.", "✓".green());
            print_record(&record);
        },
        OutputFormat::Json => print_json(&RecordView::from(&record))?,
    }
    Ok(())
}
