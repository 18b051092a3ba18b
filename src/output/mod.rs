//! Run directory layout and everything written into it.

mod archive;
mod dedup;
mod input;
mod layout;
mod report;
mod writer;

use std::path::PathBuf;

use thiserror::Error;

pub use archive::{archive_old_runs, ARCHIVE_DIR};
pub use dedup::scan_scraped_ids;
pub use input::{copy_input, load_ids, LoadedIds};
pub use layout::RunLayout;
pub use report::{FailedEntry, Report, ReportConfig};
pub use writer::{append_line, strip_ansi, JobLog, RecordFile, TrackingFile};

/// Errors while reading inputs or writing run files.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OutputError::Io {
            path: path.into(),
            source,
        }
    }
}
