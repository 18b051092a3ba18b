//! Append-only writers for run files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use super::OutputError;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("ANSI escape pattern should compile")
});

/// Remove terminal color and cursor sequences.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Append `line` to `path`, creating the file and its parent if needed.
pub fn append_line(path: &Path, line: &str) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| OutputError::io(path, e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| OutputError::io(path, e))
}

fn is_missing_or_empty(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true)
}

/// Tab-separated output file with a header line.
#[derive(Debug, Clone)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    /// Open `path`, writing `header` first when the file is absent or empty.
    pub fn open<S: AsRef<str>>(path: PathBuf, header: &[S]) -> Result<Self, OutputError> {
        if is_missing_or_empty(&path) {
            let header: Vec<&str> = header.iter().map(AsRef::as_ref).collect();
            append_line(&path, &format!("{}\n", header.join("\t")))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a complete, newline-terminated line.
    pub fn append(&self, line: &str) -> Result<(), OutputError> {
        append_line(&self.path, line)
    }
}

/// Cross-run tracking file: `Run_Date` followed by the row.
#[derive(Debug, Clone)]
pub struct TrackingFile {
    file: RecordFile,
    date: String,
}

impl TrackingFile {
    pub fn open<S: AsRef<str>>(
        path: PathBuf,
        header: &[S],
        date: &str,
    ) -> Result<Self, OutputError> {
        Ok(Self {
            file: RecordFile::open(path, header)?,
            date: date.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Append `{date}\t{fields...}\n`.
    pub fn record<S: AsRef<str>>(&self, fields: &[S]) -> Result<(), OutputError> {
        let mut line = self.date.clone();
        for field in fields {
            line.push('\t');
            line.push_str(field.as_ref());
        }
        line.push('\n');
        self.file.append(&line)
    }
}

/// Per-run fetch log.
#[derive(Debug, Clone)]
pub struct JobLog {
    path: PathBuf,
}

impl JobLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line with escape sequences removed.
    pub fn write(&self, line: &str) -> Result<(), OutputError> {
        let mut clean = strip_ansi(line.trim_end_matches('\n'));
        clean.push('\n');
        append_line(&self.path, &clean)
    }

    /// `{time} | {id} | {status} | {ms}ms[ | Re-attempt n/max][ | Retry k]`
    pub fn fetch(
        &self,
        id: &str,
        status: &str,
        elapsed_ms: u128,
        reattempt: Option<(u32, u32)>,
        retry: Option<u32>,
    ) -> Result<(), OutputError> {
        let mut line = format!(
            "{} | {} | {} | {}ms",
            Utc::now().to_rfc3339(),
            id,
            status,
            elapsed_ms
        );
        if let Some((n, max)) = reattempt {
            line.push_str(&format!(" | Re-attempt {}/{}", n, max));
        }
        if let Some(k) = retry {
            line.push_str(&format!(" | Retry {}", k));
        }
        self.write(&line)
    }

    /// `Error for ID {id}: {message} at {time}`
    pub fn error(&self, id: &str, message: &str) -> Result<(), OutputError> {
        self.write(&format!(
            "Error for ID {}: {} at {}",
            id,
            message,
            Utc::now().to_rfc3339()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[32mOK\x1b[0m done"), "OK done");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("NH.txt");

        let file = RecordFile::open(path.clone(), &["ID", "Image"]).unwrap();
        file.append("4-2021-00001\tx\n").unwrap();
        let again = RecordFile::open(path.clone(), &["ID", "Image"]).unwrap();
        again.append("4-2021-00002\ty\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "ID\tImage\n4-2021-00001\tx\n4-2021-00002\ty\n");
    }

    #[test]
    fn test_header_written_into_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();
        RecordFile::open(path.clone(), &["ID"]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ID\n");
    }

    #[test]
    fn test_tracking_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.txt");
        let tracking =
            TrackingFile::open(path.clone(), &["Run_Date", "ID", "Type", "Data"], "2024-01-02")
                .unwrap();
        tracking.record(&["1-2021-00001", "PATENTS", "a\tb"]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Run_Date\tID\tType\tData\n2024-01-02\t1-2021-00001\tPATENTS\ta\tb\n"
        );
    }

    #[test]
    fn test_job_log_format() {
        let dir = tempfile::tempdir().unwrap();
        let log = JobLog::new(dir.path().join("log.txt"));
        log.fetch("4-2021-00001", "200 - OK", 120, Some((2, 20)), Some(1))
            .unwrap();
        log.error("4-2021-00002", "\x1b[31mTimeout after 30000ms\x1b[0m")
            .unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].ends_with("| 4-2021-00001 | 200 - OK | 120ms | Re-attempt 2/20 | Retry 1"));
        assert!(lines[1].starts_with("Error for ID 4-2021-00002: Timeout after 30000ms at "));
        assert!(!content.contains('\x1b'));
    }
}
