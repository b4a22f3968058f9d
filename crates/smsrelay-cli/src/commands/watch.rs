//! Watch command: run the countdown and poller in the foreground.

use std::collections::HashSet;

use anyhow::{Result, anyhow};
use colored::Colorize;
use smsrelay_core::{Mode, Scheduler};
use tracing::info;

use crate::commands::list::print_records;
use crate::error::CliError;
use crate::output::OutputFormat;
use crate::utils::AppContext;

/// Keep tracking until nothing is waiting or the user interrupts.
pub async fn execute(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let signed_in = ctx.session.restore().await.ok_or_else(|| {
        CliError::usage(anyhow!(
            "Not logged in, or the stored credentials were rejected. Run `smsrelay login` first."
        ))
    })?;
    ctx.tracker.sign_in(signed_in.credentials).await;

    let mut status = ctx.tracker.subscribe();
    let waiting = status.borrow_and_update().waiting;
    if waiting == 0 {
        if format == OutputFormat::Text {
            println!("No numbers are waiting for a message.");
        }
        return print_records(&ctx.tracker.records().await, format);
    }

    if format == OutputFormat::Text {
        println!(
            "Watching {waiting} number(s); balance ${}. Press Ctrl-C to stop.",
            signed_in.balance
        );
    }

    let mut reported: HashSet<u64> = ctx
        .tracker
        .records()
        .await
        .iter()
        .filter(|r| r.mode != Mode::Waiting)
        .map(|r| r.id)
        .collect();

    let scheduler = Scheduler::start(&ctx.tracker, &ctx.config.schedule);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            },
            _ = &mut interrupt => {
                info!("interrupted");
                break;
            },
        }

        for record in ctx.tracker.records().await {
            if record.mode == Mode::Waiting || !reported.insert(record.id) {
                continue;
            }
            if format == OutputFormat::Text {
                let outcome = match (&record.mode, &record.sms_text) {
                    (Mode::Message, Some(text)) => text.green(),
                    _ => "expired".dimmed(),
                };
                let id = format!("#{}", record.id);
                println!("{} {}  {outcome}", id.bold(), record.phone_number);
            }
        }

        if status.borrow_and_update().waiting == 0 {
            break;
        }
    }

    scheduler.shutdown().await;

    match format {
        OutputFormat::Text => Ok(()),
        OutputFormat::Json => print_records(&ctx.tracker.records().await, format),
    }
}
