//! Dynamic frequency threshold selection.
//!
//! Picks the strictest minimum count such that the interval values occurring
//! at least that often still cover the target share of all tasks.

use serde::Serialize;

use crate::model::{FrequencyTable, OptimizerError, Result};

/// Highest threshold tried. Scanning starts here and walks down to 1.
pub const MAX_THRESHOLD: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSelection {
    pub threshold: usize,
    /// Share of tasks whose interval is a peak at this threshold.
    pub coverage: f64,
    /// Distinct intervals with frequency ≥ threshold, ascending.
    pub peaks: Vec<f64>,
    /// True when no threshold in 1..=20 met the target and 1 was used anyway.
    pub fell_back: bool,
}

/// Fraction of all tasks whose value occurs at least `threshold` times.
pub fn coverage_at(table: &FrequencyTable, threshold: usize) -> f64 {
    let covered: usize = table
        .entries()
        .iter()
        .filter(|(_, count)| *count >= threshold)
        .map(|(_, count)| count)
        .sum();
    covered as f64 / table.total() as f64
}

/// Peak values at `threshold`, ascending.
pub fn peaks_at(table: &FrequencyTable, threshold: usize) -> Vec<f64> {
    table
        .entries()
        .iter()
        .filter(|(_, count)| *count >= threshold)
        .map(|(value, _)| *value)
        .collect()
}

/// Scan thresholds 20 → 1 and keep the first one meeting `target_coverage`.
///
/// Falls back to threshold 1 (every distinct value is a peak) when none
/// qualifies. Fails with `EmptyDataset` on an empty table rather than
/// dividing by zero.
pub fn select_threshold(table: &FrequencyTable, target_coverage: f64) -> Result<ThresholdSelection> {
    if table.total() == 0 {
        return Err(OptimizerError::EmptyDataset);
    }

    for threshold in (1..=MAX_THRESHOLD).rev() {
        let coverage = coverage_at(table, threshold);
        if coverage >= target_coverage {
            return Ok(ThresholdSelection {
                threshold,
                coverage,
                peaks: peaks_at(table, threshold),
                fell_back: false,
            });
        }
    }

    Ok(ThresholdSelection {
        threshold: 1,
        coverage: coverage_at(table, 1),
        peaks: peaks_at(table, 1),
        fell_back: true,
    })
}
