//! Final processing report.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::OutputError;

/// Settings echoed in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    pub threads: usize,
    pub max_reattempts: u32,
    pub retry_passes: u32,
    pub request_delay_ms: u64,
}

/// A permanently failed identifier and its global retry count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub id: String,
    pub retries: u32,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub generated: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: Vec<FailedEntry>,
    pub config: ReportConfig,
}

impl Report {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// Percentage of successes, 0.0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.succeeded as f64 * 100.0 / total as f64,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "WIPO Scraping Final Report");
        let _ = writeln!(out, "Generated: {}", self.generated.to_rfc3339());
        let _ = writeln!(out);
        let _ = writeln!(out, "Statistics:");
        let _ = writeln!(out, "- Successfully processed: {} IDs", self.succeeded);
        let _ = writeln!(out, "- Permanently failed: {} IDs", self.failed.len());
        let _ = writeln!(out, "- Total IDs: {}", self.total());
        let _ = writeln!(out, "- Success rate: {:.1}%", self.success_rate());
        let _ = writeln!(out);
        let _ = writeln!(out, "Configuration:");
        let _ = writeln!(out, "- Threads used: {}", self.config.threads);
        let _ = writeln!(out, "- Max re-attempts per ID: {}", self.config.max_reattempts);
        let _ = writeln!(out, "- Max retry passes: {}", self.config.retry_passes);
        let _ = writeln!(out, "- Base delay: {}ms", self.config.request_delay_ms);

        if !self.failed.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Permanently Failed IDs:");
            for entry in &self.failed {
                let _ = writeln!(out, "- {} ({} retries)", entry.id, entry.retries);
            }
        }

        out
    }

    /// Write the report, replacing any earlier one.
    pub fn write(&self, path: &Path) -> Result<(), OutputError> {
        std::fs::write(path, self.render()).map_err(|e| OutputError::io(path, e))
    }
}
