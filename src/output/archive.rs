//! Moving old run directories out of the way.

use std::path::Path;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use super::OutputError;

/// Directory under the output root that receives archived runs.
pub const ARCHIVE_DIR: &str = "Old";

/// Move all but the newest `keep` run directories into `{root}/Old/`.
///
/// Directories are ranked by modification time. Runs whose name already
/// exists in `Old/` are left in place. `keep == 0` disables archiving.
/// Returns the number of directories moved.
pub fn archive_old_runs(root: &Path, keep: usize) -> Result<usize, OutputError> {
    if keep == 0 || !root.is_dir() {
        return Ok(0);
    }

    let entries = std::fs::read_dir(root).map_err(|e| OutputError::io(root, e))?;
    let mut runs: Vec<(SystemTime, std::path::PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name() != ARCHIVE_DIR)
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_dir()
                .then(|| (meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), entry.path()))
        })
        .collect();

    if runs.len() <= keep {
        return Ok(0);
    }

    // Newest first
    runs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let archive = root.join(ARCHIVE_DIR);
    std::fs::create_dir_all(&archive).map_err(|e| OutputError::io(&archive, e))?;

    let mut moved = 0;
    for (_, dir) in runs.into_iter().skip(keep) {
        let Some(name) = dir.file_name() else {
            continue;
        };
        let dest = archive.join(name);
        if dest.exists() {
            debug!("Archive already has {}, leaving it", dest.display());
            continue;
        }
        match std::fs::rename(&dir, &dest) {
            Ok(()) => {
                info!("Archived {} to {}", dir.display(), dest.display());
                moved += 1;
            }
            Err(e) => warn!("Failed to archive {}: {}", dir.display(), e),
        }
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            std::fs::create_dir_all(root.join(name)).unwrap();
        }
        std::fs::write(root.join("notes.txt"), "not a run").unwrap();

        let moved = archive_old_runs(root, 2).unwrap();
        assert_eq!(moved, 1);
        assert!(root.join(ARCHIVE_DIR).is_dir());
        let remaining: Vec<_> = std::fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != ARCHIVE_DIR)
            .collect();
        // two run directories plus the plain file
        assert_eq!(remaining.len(), 3);
    }

    #[test]
    fn test_archive_disabled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        assert_eq!(archive_old_runs(dir.path(), 0).unwrap(), 0);
        assert_eq!(archive_old_runs(dir.path(), 5).unwrap(), 0);
        assert_eq!(archive_old_runs(&dir.path().join("missing"), 1).unwrap(), 0);
    }
}
