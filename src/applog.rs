//! Append-only application log file.
//!
//! Every record is one line, `[<RFC 3339 UTC timestamp>] <message>`, appended
//! synchronously to `<log_dir>/app.log` and mirrored to `tracing`. `GET /logs`
//! serves the tail of this file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

/// File name inside the log directory.
pub const LOG_FILE_NAME: &str = "app.log";

/// Number of lines returned by `GET /logs`.
pub const DEFAULT_TAIL_LINES: usize = 50;

/// Line-oriented application log.
#[derive(Debug)]
pub struct AppLog {
    /// Target file, `None` when records only go to `tracing`.
    path: Option<PathBuf>,
    /// Serializes appends so lines never interleave.
    write_lock: Mutex<()>,
}

impl AppLog {
    /// Open the log under `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        Ok(Self {
            path: Some(dir.join(LOG_FILE_NAME)),
            write_lock: Mutex::new(()),
        })
    }

    /// A log that only mirrors records to `tracing`.
    pub fn tracing_only() -> Self {
        Self {
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the log file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append a record. Failures are reported through `tracing` and never
    /// propagate to the caller.
    pub fn append(&self, message: &str) {
        info!(target: "app_log", "{}", message);

        let Some(path) = &self.path else {
            return;
        };

        let line = format!("[{}] {}\n", timestamp(), message);
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Failed to append to app log");
        }
    }

    /// Return the last `n` non-blank lines, oldest first.
    pub fn tail(&self, n: usize) -> io::Result<Vec<String>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };

        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().map(|l| l.to_string()).collect())
    }
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn open_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("logs");

        let log = AppLog::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(log.path(), Some(nested.join(LOG_FILE_NAME).as_path()));
    }

    #[test]
    fn append_writes_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppLog::open(dir.path()).unwrap();

        log.append("GET /health - 127.0.0.1");
        log.append("Counter incremented to 3 (Redis)");

        let lines = log.tail(DEFAULT_TAIL_LINES).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] GET /health - 127.0.0.1"));
        assert!(lines[1].ends_with("Counter incremented to 3 (Redis)"));
    }

    #[test]
    fn tail_keeps_only_the_most_recent_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppLog::open(dir.path()).unwrap();

        for i in 0..60 {
            log.append(&format!("line {}", i));
        }

        let lines = log.tail(DEFAULT_TAIL_LINES).unwrap();
        assert_eq!(lines.len(), 50);
        assert!(lines[0].ends_with("line 10"));
        assert!(lines[49].ends_with("line 59"));
    }

    #[test]
    fn tail_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppLog::open(dir.path()).unwrap();

        assert!(log.tail(10).unwrap().is_empty());
        assert!(AppLog::tracing_only().tail(10).unwrap().is_empty());
    }
}
