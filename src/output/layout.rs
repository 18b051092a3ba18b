//! File names inside a dated run directory.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use super::OutputError;
use crate::models::RecordType;

/// Paths of one run: `{root}/{YYYY-MM-DD}/...`.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
    date: String,
    dir: PathBuf,
}

impl RunLayout {
    /// Layout for today's local date.
    pub fn for_today(root: &Path) -> Self {
        Self::for_date(root, Local::now().date_naive())
    }

    pub fn for_date(root: &Path, date: NaiveDate) -> Self {
        let date = date.format("%Y-%m-%d").to_string();
        Self {
            root: root.to_path_buf(),
            dir: root.join(&date),
            date,
        }
    }

    /// Create the run directory (and the root).
    pub fn ensure(&self) -> Result<(), OutputError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| OutputError::io(&self.dir, e))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run date as `YYYY-MM-DD`.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// `SC_WIPO_<date>.txt`, `KD_WIPO_<date>.txt` or `NH_WIPO_<date>.txt`.
    pub fn record_file(&self, record_type: RecordType) -> PathBuf {
        self.dir
            .join(format!("{}_WIPO_{}.txt", record_type.file_prefix(), self.date))
    }

    pub fn record_files(&self) -> Vec<PathBuf> {
        RecordType::ALL.iter().map(|t| self.record_file(*t)).collect()
    }

    pub fn log_file(&self) -> PathBuf {
        self.dir.join("log.txt")
    }

    /// Copy of the detail scraper's input.
    pub fn original_ids(&self) -> PathBuf {
        self.dir.join("original_ID.csv")
    }

    pub fn fail_ids(&self) -> PathBuf {
        self.dir.join("fail_id.txt")
    }

    pub fn failed_ids(&self) -> PathBuf {
        self.dir.join("failed_ids.txt")
    }

    pub fn report(&self) -> PathBuf {
        self.dir.join("processing_report.txt")
    }

    /// Search scraper output.
    pub fn vntm_file(&self) -> PathBuf {
        self.dir.join(format!("VNTM_{}.txt", self.date))
    }

    /// Copy of the search scraper's input.
    pub fn vntm_original_ids(&self) -> PathBuf {
        self.dir.join("original_ID.txt")
    }
}
