//! Progress display for scrape runs.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Bar over `total` identifiers.
pub fn run_bar(total: usize) -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {wide_msg}",
            )?
            .progress_chars("█▓░"),
    );
    Ok(bar)
}

/// Print a line above the bar, or to stderr once the bar is gone.
pub fn println(bar: &ProgressBar, message: &str) {
    if bar.is_hidden() || bar.is_finished() {
        eprintln!("{}", message);
    } else {
        bar.println(message);
    }
}

/// `✗ {id}: {error}` failure line.
pub fn failure_line(id: &str, error: &str) -> String {
    format!("{} {}: {}", style("✗").red(), id, error)
}
