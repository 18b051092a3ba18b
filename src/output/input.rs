//! Identifier list loading.

use std::collections::HashSet;
use std::path::Path;

use tracing::warn;

use super::OutputError;
use crate::models::is_valid_id;

/// Identifiers read from an input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedIds {
    /// Unique, well-formed identifiers in first-occurrence order.
    pub ids: Vec<String>,
    /// Non-blank lines read.
    pub total: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// Read one identifier per line. Lines are trimmed, blanks ignored,
/// duplicates dropped and malformed identifiers skipped with a warning.
pub fn load_ids(path: &Path) -> Result<LoadedIds, OutputError> {
    if !path.exists() {
        return Err(OutputError::InputNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| OutputError::io(path, e))?;
    Ok(parse_ids(&content))
}

pub(crate) fn parse_ids(content: &str) -> LoadedIds {
    let mut loaded = LoadedIds::default();
    let mut seen = HashSet::new();

    for line in content.lines() {
        let id = line.trim().trim_start_matches('\u{feff}');
        if id.is_empty() {
            continue;
        }
        loaded.total += 1;
        if !is_valid_id(id) {
            warn!("Skipping malformed identifier: {}", id);
            loaded.invalid += 1;
            continue;
        }
        if seen.insert(id.to_string()) {
            loaded.ids.push(id.to_string());
        } else {
            loaded.duplicates += 1;
        }
    }

    loaded
}

/// Keep a copy of the input next to the run's outputs.
pub fn copy_input(input: &Path, dest: &Path) -> Result<(), OutputError> {
    std::fs::copy(input, dest)
        .map(|_| ())
        .map_err(|e| OutputError::io(dest, e))
}
