//! vietnamtrademark.net search command.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use console::style;
use tokio::sync::mpsc;

use crate::cli::progress;
use crate::config::Settings;
use crate::output::{JobLog, RunLayout};
use crate::scrapers::browser;
use crate::vntm::{SearchOutcome, VntmEvent, VntmService};

const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Search every identifier in `input` that is not in today's search output.
pub async fn cmd_vntm(settings: &Settings, input: &Path) -> anyhow::Result<()> {
    let layout = RunLayout::for_today(&settings.output_root);
    let mut service = VntmService::new(settings, layout)?;
    let prepared = service.prepare(input)?;

    println!(
        "{} {} identifiers ({} duplicates, {} already scraped)",
        style("→").cyan(),
        prepared.loaded.ids.len(),
        prepared.loaded.duplicates,
        prepared.already_scraped
    );

    if prepared.pending.is_empty() {
        println!(
            "{} Nothing to search, all identifiers already have output",
            style("✓").green()
        );
        return Ok(());
    }

    if settings.vntm.render_probability > 0.0 && !browser::is_available() {
        println!(
            "  {} Browser support not compiled, all searches use HTTP",
            style("!").yellow()
        );
    }

    let total = prepared.pending.len();
    let bar = progress::run_bar(total)?;
    let done = Arc::new(AtomicUsize::new(0));

    let (event_tx, mut event_rx) = mpsc::channel::<VntmEvent>(100);

    let bar_clone = bar.clone();
    let done_clone = done.clone();
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                VntmEvent::Searched {
                    id,
                    outcome,
                    elapsed,
                    ..
                } => {
                    done_clone.fetch_add(1, Ordering::Relaxed);
                    bar_clone.inc(1);
                    match outcome {
                        SearchOutcome::Found => {
                            bar_clone.set_message(format!("{} ({}ms)", id, elapsed.as_millis()));
                        }
                        SearchOutcome::NotFound => {
                            bar_clone.set_message(format!("{} not found", id));
                        }
                        SearchOutcome::Error(error) => {
                            progress::println(&bar_clone, &progress::failure_line(&id, &error));
                        }
                    }
                }
                VntmEvent::Pausing { duration } => {
                    bar_clone.set_message(format!("pausing {:.1}s", duration.as_secs_f64()));
                }
            }
        }
    });

    let log = JobLog::new(service.layout().log_file());
    let result = tokio::select! {
        result = service.run(prepared.pending, event_tx) => result?,
        _ = tokio::signal::ctrl_c() => {
            bar.abandon();
            let summary = format!(
                "Interrupted: {}/{} completed",
                done.load(Ordering::Relaxed),
                total
            );
            println!("\n{} {}", style("!").yellow(), summary);
            if let Err(e) = log.write(&format!("[{}] {}", Utc::now().to_rfc3339(), summary)) {
                tracing::warn!("Failed to write log line: {}", e);
            }
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    };

    if let Err(e) = event_handler.await {
        tracing::warn!("Event handler task failed: {}", e);
    }
    bar.finish_and_clear();

    println!(
        "{} Found {} of {} identifiers",
        style("✓").green(),
        result.found,
        result.found + result.missing_or_error
    );
    if result.missing_or_error > 0 {
        println!(
            "  {} {} not found or failed",
            style("!").yellow(),
            result.missing_or_error
        );
    }
    println!(
        "  {} Output: {}",
        style("→").dim(),
        result.output_path.display()
    );

    Ok(())
}
