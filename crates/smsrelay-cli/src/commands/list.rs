//! List command implementation

use anyhow::Result;
use colored::Colorize;
use smsrelay_core::{Mode, NumberRequest};

use crate::output::{OutputFormat, RecordView, print_json};
use crate::utils::AppContext;
use crate::utils::formatting::{format_countdown, mode_label};

/// Print every tracked number, newest first.
pub async fn execute(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    ctx.tracker.tick().await;
    let records = ctx.tracker.records().await;
    print_records(&records, format)
}

/// Render a record list in the requested format.
pub fn print_records(records: &[NumberRequest], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No tracked numbers. Use 'smsrelay request <service>' to reserve one.");
            }
            for record in records {
                print_record(record);
            }
        },
        OutputFormat::Json => {
            let views: Vec<RecordView<'_>> = records.iter().map(RecordView::from).collect();
            print_json(&views)?;
        },
    }
    Ok(())
}

/// One record as a text block.
pub fn print_record(record: &NumberRequest) {
    let countdown = match record.mode {
        Mode::Waiting => format_countdown(record.remaining_seconds).cyan().to_string(),
        Mode::Message | Mode::Expired => format_countdown(record.remaining_seconds).dimmed().to_string(),
    };
    println!(
        "{}  {}  {}  {}  {countdown}",
        format!("#{}", record.id).bold(),
        record.phone_number,
        record.service_name,
        mode_label(record.mode),
    );

    let mut details = Vec::new();
    if let Some(region) = &record.region {
        details.push(region.clone());
    }
    if let Some(carrier) = &record.carrier {
        details.push(carrier.clone());
    }
    if record.price > 0.0 {
        details.push(format!("${:.2}", record.price));
    }
    if !details.is_empty() {
        println!("    {}", details.join(" · ").dimmed());
    }
    if let Some(text) = &record.sms_text {
        println!("    {}", text.green());
    }
}
