/// Core data types for the maintenance check optimizer.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic beyond small accessors, and no I/O.

use serde::Serialize;
use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// Task types
// ---------------------------------------------------------------------------

/// A maintenance task with its interval already normalized to equivalent
/// flight hours (EFH).
///
/// Produced by `ingest::tasks::TaskList::valid_tasks`. The interval must be
/// finite and strictly positive by the time the task reaches `analysis::fit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub interval: f64,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, interval: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            interval,
        }
    }

    /// ATA chapter: the leading two digits of the task id, if it has them.
    pub fn ata_chapter(&self) -> Option<&str> {
        ata_chapter(&self.id)
    }
}

/// Extracts the two-digit ATA chapter prefix from a task id such as
/// "08-VNA-01-1".
pub fn ata_chapter(task_id: &str) -> Option<&str> {
    let prefix = task_id.get(0..2)?;
    if prefix.chars().all(|c| c.is_ascii_digit()) {
        Some(prefix)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Frequency distribution
// ---------------------------------------------------------------------------

/// Distinct interval value → number of tasks sharing that exact value.
///
/// Entries are kept sorted ascending by value, so peak lists derived from
/// the table come out sorted without a second pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrequencyTable {
    entries: Vec<(f64, usize)>,
    total: usize,
}

impl FrequencyTable {
    pub fn from_intervals<I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values: Vec<f64> = intervals.into_iter().collect();
        values.sort_by(f64::total_cmp);

        let mut entries: Vec<(f64, usize)> = Vec::new();
        for value in &values {
            match entries.last_mut() {
                Some((last, count)) if *last == *value => *count += 1,
                _ => entries.push((*value, 1)),
            }
        }

        Self {
            entries,
            total: values.len(),
        }
    }

    /// Number of tasks counted (the `N` of the coverage ratio).
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(value, count)` pairs in ascending value order.
    pub fn entries(&self) -> &[(f64, usize)] {
        &self.entries
    }

    /// Frequency of an exact value; zero when the value never occurs.
    pub fn count_of(&self, value: f64) -> usize {
        self.entries
            .binary_search_by(|(v, _)| v.total_cmp(&value))
            .map(|idx| self.entries[idx].1)
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Assignment types
// ---------------------------------------------------------------------------

/// The group a task was placed in. Only exists for in-group tasks, so an
/// out-of-phase task can never be confused with a zero-deviation match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupMatch {
    /// Zero-based index into the group-center list.
    pub group_id: usize,
    pub center: f64,
    /// |interval − center| / center
    pub deviation: f64,
}

/// Outcome of assigning one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub task: Task,
    /// `None` = out of phase.
    pub group: Option<GroupMatch>,
}

impl Assignment {
    pub fn is_in_group(&self) -> bool {
        self.group.is_some()
    }

    /// Display-style group id: 1-based, or -1 when out of phase.
    pub fn display_group_id(&self) -> i64 {
        self.group.map(|g| g.group_id as i64 + 1).unwrap_or(-1)
    }
}

// ---------------------------------------------------------------------------
// Nested check types
// ---------------------------------------------------------------------------

/// A pair of group centers where the larger is roughly an integer multiple
/// of the smaller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedRelationship {
    pub small_group: usize,
    pub small_center: f64,
    pub large_group: usize,
    pub large_center: f64,
    pub ratio: f64,
    /// 2, 3 or 4.
    pub multiple: u8,
}

impl NestedRelationship {
    /// Orders candidate edges by the scale of their target.
    pub(crate) fn cmp_large_center(&self, other: &Self) -> Ordering {
        self.large_center.total_cmp(&other.large_center)
    }
}

/// Group indices linked small → large by nested relationships. Always at
/// least two entries.
pub type NestedChain = Vec<usize>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the optimizer and its I/O collaborators.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    /// No task with a valid interval reached the pipeline.
    #[error("No valid tasks: at least one task with a positive interval is required")]
    EmptyDataset,
    /// A task reached `fit` with an interval that ingestion should have filtered.
    #[error("Invalid interval for task {task_id}: {value}")]
    InvalidInterval { task_id: String, value: f64 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The tabular source lacks columns the optimizer cannot do without.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
