/// Execution log for optimizer runs
///
/// Every pipeline stage appends stage-tagged, timestamped entries to an
/// `ExecutionLog` owned by the run. The log is returned with the result so
/// the export layer can write it out as a plain-text file. Each entry is
/// also mirrored to `tracing` so the console shows progress as it happens.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Input filtering before the four clustering stages
    Data,
    Threshold,
    Merge,
    Assign,
    Nested,
    Chains,
    /// Run-level banners
    Pipeline,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Data => write!(f, "DATA"),
            Stage::Threshold => write!(f, "STEP1"),
            Stage::Merge => write!(f, "STEP2"),
            Stage::Assign => write!(f, "STEP3"),
            Stage::Nested => write!(f, "STEP4"),
            Stage::Chains => write!(f, "CHAINS"),
            Stage::Pipeline => write!(f, "APBC"),
        }
    }
}

// ---------------------------------------------------------------------------
// Log Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub stage: Stage,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.level,
            self.stage,
            self.message
        )
    }
}

// ---------------------------------------------------------------------------
// Execution Log
// ---------------------------------------------------------------------------

/// Append-only, chronologically ordered log of a single run.
/// Serializes as the bare list of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and mirror it to `tracing`.
    pub fn record(&mut self, level: LogLevel, stage: Stage, message: impl Into<String>) {
        let message = message.into();

        match level {
            LogLevel::Debug => tracing::debug!(stage = %stage, "{}", message),
            LogLevel::Info => tracing::info!(stage = %stage, "{}", message),
            LogLevel::Warning => tracing::warn!(stage = %stage, "{}", message),
            LogLevel::Error => tracing::error!(stage = %stage, "{}", message),
        }

        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            level,
            stage,
            message,
        });
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(LogLevel::Info, stage, message);
    }

    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(LogLevel::Warning, stage, message);
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(LogLevel::Error, stage, message);
    }

    pub fn debug(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(LogLevel::Debug, stage, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bare messages in the order they were recorded.
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    /// Entries for one stage, in order.
    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.stage == stage)
    }

    /// Entries at or above `min_level`.
    pub fn at_least(&self, min_level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.level >= min_level)
    }

    /// One formatted line per entry.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }

    /// Write the rendered log to `path`, replacing any previous run's log.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(self.render().as_bytes())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log the in-group / out-of-phase split of an assignment pass.
pub fn log_assignment_summary(log: &mut ExecutionLog, total: usize, in_group: usize) {
    let out_of_phase = total - in_group;
    let rate = |n: usize| {
        if total == 0 {
            0.0
        } else {
            n as f64 / total as f64 * 100.0
        }
    };

    let in_msg = format!("In-group: {} ({:.1}%)", in_group, rate(in_group));
    let out_msg = format!("Out-of-phase: {} ({:.1}%)", out_of_phase, rate(out_of_phase));

    if in_group == 0 && total > 0 {
        log.error(Stage::Assign, in_msg);
        log.error(Stage::Assign, out_msg);
    } else {
        log.info(Stage::Assign, in_msg);
        if out_of_phase == 0 {
            log.info(Stage::Assign, out_msg);
        } else {
            log.warn(Stage::Assign, out_msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_entries_keep_recording_order() {
        let mut log = ExecutionLog::new();
        log.info(Stage::Threshold, "first");
        log.warn(Stage::Merge, "second");
        log.debug(Stage::Assign, "third");
        assert_eq!(log.messages(), vec!["first", "second", "third"]);
        assert_eq!(log.entries()[1].level, LogLevel::Warning);
        assert_eq!(log.entries()[1].stage, Stage::Merge);
    }

    #[test]
    fn test_filters_by_stage_and_level() {
        let mut log = ExecutionLog::new();
        log.info(Stage::Nested, "a");
        log.debug(Stage::Nested, "b");
        log.error(Stage::Chains, "c");
        assert_eq!(log.for_stage(Stage::Nested).count(), 2);
        let loud: Vec<_> = log.at_least(LogLevel::Info).map(|e| e.message.as_str()).collect();
        assert_eq!(loud, vec!["a", "c"]);
    }

    #[test]
    fn test_render_tags_stage_and_level() {
        let mut log = ExecutionLog::new();
        log.info(Stage::Threshold, "Threshold = 20");
        let text = log.render();
        assert!(text.contains("INFO STEP1: Threshold = 20"), "unexpected render: {}", text);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_assignment_summary_levels() {
        let mut log = ExecutionLog::new();
        log_assignment_summary(&mut log, 10, 8);
        assert_eq!(log.entries()[0].level, LogLevel::Info);
        assert_eq!(log.entries()[1].level, LogLevel::Warning);
        assert!(log.entries()[0].message.contains("80.0%"));

        let mut none_placed = ExecutionLog::new();
        log_assignment_summary(&mut none_placed, 4, 0);
        assert!(none_placed.entries().iter().all(|e| e.level == LogLevel::Error));
    }

    #[test]
    fn test_write_to_file_truncates_previous_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("execution_log.txt");

        let mut first = ExecutionLog::new();
        first.info(Stage::Pipeline, "old run");
        first.write_to_file(&path).expect("first write");

        let mut second = ExecutionLog::new();
        second.info(Stage::Pipeline, "new run");
        second.write_to_file(&path).expect("second write");

        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.contains("new run"));
        assert!(!text.contains("old run"));
    }
}
