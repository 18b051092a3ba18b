//! Identifiers already present in earlier output.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

/// First tab field of every data line in the files that exist.
///
/// Header lines (starting with `ID\t`) and blank lines are skipped; files
/// that cannot be read are ignored.
pub fn scan_scraped_ids(files: &[PathBuf]) -> HashSet<String> {
    let mut scraped = HashSet::new();

    for file in files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let before = scraped.len();
        for line in content.lines() {
            if line.trim().is_empty() || line.starts_with("ID\t") {
                continue;
            }
            if let Some(id) = line.split('\t').next().map(str::trim) {
                if !id.is_empty() {
                    scraped.insert(id.to_string());
                }
            }
        }
        debug!(
            "{} previously scraped IDs in {}",
            scraped.len() - before,
            file.display()
        );
    }

    scraped
}
