//! Detail scrape command.

use std::path::Path;

use console::style;
use tokio::sync::mpsc;

use crate::cli::progress;
use crate::config::Settings;
use crate::output::RunLayout;
use crate::runner::{ScrapeEvent, ScrapeService};

/// Exit code used when the run is interrupted with Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Scrape every identifier in `input` that has no row in today's output yet.
pub async fn cmd_scrape(settings: &Settings, input: &Path) -> anyhow::Result<()> {
    let layout = RunLayout::for_today(&settings.output_root);
    let service = ScrapeService::from_settings(settings, layout)?;
    let prepared = service.prepare(input).await?;

    println!(
        "{} {} identifiers ({} duplicates, {} invalid, {} already scraped)",
        style("→").cyan(),
        prepared.loaded.ids.len(),
        prepared.loaded.duplicates,
        prepared.loaded.invalid,
        prepared.already_scraped
    );

    if prepared.pending.is_empty() {
        println!(
            "{} Nothing to scrape, all identifiers already have output in {}",
            style("✓").green(),
            service.context().layout().dir().display()
        );
        return Ok(());
    }

    println!(
        "{} Starting {} workers ({} pending identifiers)",
        style("→").cyan(),
        settings.threads,
        prepared.pending.len()
    );

    let bar = progress::run_bar(prepared.pending.len())?;

    // Event channel for progress updates
    let (event_tx, mut event_rx) = mpsc::channel::<ScrapeEvent>(100);

    let bar_clone = bar.clone();
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                ScrapeEvent::Started { id, .. } => bar_clone.set_message(id),
                ScrapeEvent::Completed { .. } => bar_clone.inc(1),
                ScrapeEvent::Retrying { .. } => {}
                ScrapeEvent::Queued { id, .. } => {
                    bar_clone.set_message(format!("{} queued for retry pass", id));
                }
                ScrapeEvent::Failed { id, error, .. } => {
                    bar_clone.inc(1);
                    progress::println(&bar_clone, &progress::failure_line(&id, &error));
                }
                ScrapeEvent::PassStarted { pass, ids, pause } => {
                    progress::println(
                        &bar_clone,
                        &format!(
                            "{} Retry pass {}: {} identifiers after {:.1}s",
                            style("!").yellow(),
                            pass,
                            ids,
                            pause.as_secs_f64()
                        ),
                    );
                }
            }
        }
    });

    let context = service.context();
    let result = tokio::select! {
        result = service.run(prepared.pending, event_tx) => result?,
        _ = tokio::signal::ctrl_c() => {
            bar.abandon();
            let stats = context.stats().await;
            let summary = format!("Interrupted: {}/{} completed", stats.completed, stats.total);
            println!("\n{} {}", style("!").yellow(), summary);
            if let Err(e) = context.log().write(&summary) {
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
        "{} Scraped {} identifiers ({} retry passes)",
        style("✓").green(),
        result.completed,
        result.passes
    );
    if !result.failed.is_empty() {
        println!(
            "  {} {} identifiers failed, see {}",
            style("!").yellow(),
            result.failed.len(),
            context.layout().fail_ids().display()
        );
    }
    println!(
        "  {} Report: {}",
        style("→").dim(),
        result.report_path.display()
    );

    Ok(())
}
