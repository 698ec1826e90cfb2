//! Per-run log file
//!
//! One plain-text file per invocation, append-only:
//!
//! ```text
//! 2026-10-19 03:00:12 INFO: Searching for updates
//! 2026-10-19 03:00:40 WARNING: Skipping 'Driver X': requires user input
//! ```
//!
//! Every entry is also forwarded to `tracing` at the matching level.
//! Write faults never reach the caller.

use std::cell::Cell;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::{error, info, warn};

use crate::error::RunLogError;

/// Timestamp layout of each line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp layout used in the file name
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARNING",
            LogLevel::Info => "INFO",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ERROR" => Some(LogLevel::Error),
            "WARNING" => Some(LogLevel::Warn),
            "INFO" => Some(LogLevel::Info),
            _ => None,
        }
    }
}

/// A single log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: &str) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            level,
            message: message.replace(['\r', '\n'], " "),
        }
    }

    pub fn to_log_line(&self) -> String {
        format!(
            "{} {}: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level.as_str(),
            self.message
        )
    }

    pub fn from_log_line(line: &str) -> Option<Self> {
        // "YYYY-MM-DD HH:MM:SS" is always 19 chars
        if line.len() < 20 || !line.is_char_boundary(19) {
            return None;
        }
        let (stamp, rest) = line.split_at(19);
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        let (level, message) = rest.strip_prefix(' ')?.split_once(": ")?;

        Some(Self {
            timestamp,
            level: LogLevel::from_str(level)?,
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileState {
    /// Nothing written yet
    Pending,
    /// This run owns the file
    Open,
    /// Pre-existing file under no-clobber
    Refused,
}

/// Log file for a single run
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    no_clobber: bool,
    state: Cell<FileState>,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>, no_clobber: bool) -> Self {
        Self {
            path: path.into(),
            no_clobber,
            state: Cell::new(FileState::Pending),
        }
    }

    /// `<dir>/<script_name>_<run timestamp>.log`
    pub fn for_run(
        dir: &Path,
        script_name: &str,
        started: DateTime<Local>,
        no_clobber: bool,
    ) -> Self {
        let file_name = format!(
            "{}_{}.log",
            script_name,
            started.format(FILE_TIMESTAMP_FORMAT)
        );
        Self::new(dir.join(file_name), no_clobber)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry. Failures are reported through `tracing` only.
    pub fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => error!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Info => info!("{}", message),
        }

        if let Err(e) = self.try_log(level, message) {
            error!("Run log {} not written: {}", self.path.display(), e);
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Append an entry, surfacing the failure instead of swallowing it
    pub fn try_log(&self, level: LogLevel, message: &str) -> Result<(), RunLogError> {
        match self.state.get() {
            FileState::Refused => {
                return Err(RunLogError::Clobber(self.path.display().to_string()));
            }
            FileState::Pending => {
                if self.no_clobber && self.path.exists() {
                    self.state.set(FileState::Refused);
                    return Err(RunLogError::Clobber(self.path.display().to_string()));
                }
                self.ensure_dir()?;
                self.state.set(FileState::Open);
            }
            FileState::Open => {}
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{}", LogEntry::new(level, message).to_log_line())?;
        Ok(())
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}

/// Read back all parseable entries of a log file
pub fn read_entries(path: &Path) -> std::io::Result<Vec<LogEntry>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for line in reader.lines() {
        if let Some(entry) = LogEntry::from_log_line(&line?) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_warn_round_trip() {
        let dir = tempdir().unwrap();
        let log = RunLog::new(dir.path().join("run.log"), false);

        log.log(LogLevel::Warn, "X");

        let content = fs::read_to_string(log.path()).unwrap();
        let line = content.lines().next().unwrap();
        assert!(line.ends_with(" WARNING: X"), "unexpected line: {}", line);

        let stamp = &line[..19];
        assert!(NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("run.log");
        let log = RunLog::new(&path, false);

        log.info("first");
        log.error("second");

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].level, LogLevel::Error);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        fs::write(&path, "existing line\n").unwrap();

        RunLog::new(&path, false).info("appended");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("existing line\n"));
        assert!(content.trim_end().ends_with("INFO: appended"));
    }

    #[test]
    fn test_no_clobber_refuses_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        fs::write(&path, "keep me\n").unwrap();

        let log = RunLog::new(&path, true);
        assert!(matches!(
            log.try_log(LogLevel::Info, "nope"),
            Err(RunLogError::Clobber(_))
        ));
        // swallowed variant must not panic or write
        log.info("still nope");

        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me\n");
    }

    #[test]
    fn test_no_clobber_allows_own_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        let log = RunLog::new(&path, true);

        log.try_log(LogLevel::Info, "one").unwrap();
        log.try_log(LogLevel::Info, "two").unwrap();

        assert_eq!(read_entries(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let dir = tempdir().unwrap();
        // parent is a regular file, so directory creation fails
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let log = RunLog::new(blocker.join("run.log"), false);

        log.warn("lost");
        assert!(log.try_log(LogLevel::Warn, "lost").is_err());
    }

    #[test]
    fn test_newlines_flattened() {
        let entry = LogEntry::new(LogLevel::Info, "a\nb\r\nc");
        assert_eq!(entry.message, "a b  c");
        assert!(!entry.to_log_line().contains('\n'));
    }

    #[test]
    fn test_for_run_file_name() {
        let started = Local.with_ymd_and_hms(2026, 10, 19, 3, 4, 5).unwrap();
        let log = RunLog::for_run(Path::new("/tmp/logs"), "winupdctl", started, false);
        assert_eq!(
            log.path(),
            Path::new("/tmp/logs/winupdctl_2026-10-19_03-04-05.log")
        );
    }

    #[test]
    fn test_from_log_line_rejects_garbage() {
        assert!(LogEntry::from_log_line("").is_none());
        assert!(LogEntry::from_log_line("not a log line at all").is_none());
        assert!(LogEntry::from_log_line("2026-10-19 03:04:05 DEBUG: x").is_none());

        let entry = LogEntry::from_log_line("2026-10-19 03:04:05 INFO: a: b").unwrap();
        assert_eq!(entry.message, "a: b");
    }
}
