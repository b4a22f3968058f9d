//! Cancel, reactivate and poll.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use smsrelay_core::{Error as CoreError, PollOutcome};

use crate::commands::list::print_record;
use crate::output::{OutputFormat, RecordView, print_json};
use crate::utils::AppContext;

/// Cancel a waiting number.
pub async fn cancel(ctx: &AppContext, id: u64, format: OutputFormat) -> Result<()> {
    ctx.resume().await?;
    ctx.tracker.cancel(id).await?;
    let record = ctx
        .tracker
        .get(id)
        .await
        .ok_or_else(|| CoreError::NotFound(format!("no tracked number with id {id}")))?;

    match format {
        OutputFormat::Text => {
            println!("{} Number cancelled.", "✓".green());
            print_record(&record);
        },
        OutputFormat::Json => print_json(&RecordView::from(&record))?,
    }
    Ok(())
}

/// Reserve the number of a record that already received a message.
pub async fn reactivate(ctx: &AppContext, id: u64, format: OutputFormat) -> Result<()> {
    ctx.resume().await?;
    let record = ctx.tracker.reactivate(id).await?;

    match format {
        OutputFormat::Text => {
            println!("{} Number reactivated as #{}.", "✓".green(), record.id);
            print_record(&record);
        },
        OutputFormat::Json => print_json(&RecordView::from(&record))?,
    }
    Ok(())
}

#[derive(Serialize)]
struct PollReport {
    id: u64,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl PollReport {
    fn new(id: u64, outcome: PollOutcome) -> Self {
        let (label, sms, error) = match outcome {
            PollOutcome::Received(text) => ("received", Some(text), None),
            PollOutcome::NoMessage => ("no_message", None, None),
            PollOutcome::Skipped => ("skipped", None, None),
            PollOutcome::Failed(err) => ("failed", None, Some(err)),
        };
        Self {
            id,
            outcome: label,
            sms,
            error,
        }
    }

    fn print_text(&self) {
        let id = format!("#{}", self.id).bold();
        match (self.outcome, &self.sms, &self.error) {
            ("received", Some(sms), _) => println!("{id}  {}", sms.green()),
            ("failed", _, Some(err)) => println!("{id}  {} {err}", "poll failed:".yellow()),
            ("skipped", _, _) => println!("{id}  {}", "not waiting".dimmed()),
            _ => println!("{id}  {}", "no message yet".dimmed()),
        }
    }
}

/// Check once for messages, for one number or every waiting one.
///
/// Poll failures are reported but never fail the command.
pub async fn poll(ctx: &AppContext, id: Option<u64>, format: OutputFormat) -> Result<()> {
    ctx.resume().await?;

    let results = match id {
        Some(id) => {
            if ctx.tracker.get(id).await.is_none() {
                return Err(CoreError::NotFound(format!("no tracked number with id {id}")).into());
            }
            vec![(id, ctx.tracker.poll_for_message(id).await)]
        },
        None => ctx.tracker.poll_waiting().await,
    };
    let reports: Vec<PollReport> = results
        .into_iter()
        .map(|(id, outcome)| PollReport::new(id, outcome))
        .collect();

    match format {
        OutputFormat::Text => {
            if reports.is_empty() {
                println!("No numbers are waiting for a message.");
            }
            for report in &reports {
                report.print_text();
            }
        },
        OutputFormat::Json => print_json(&reports)?,
    }
    Ok(())
}
