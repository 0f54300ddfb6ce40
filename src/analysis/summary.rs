//! Per-group summary rows and run-level metrics.
//!
//! These are flat records meant for tables, CSV and the JSON workbook.
//! Deviations and rates are expressed in percent.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::FitResult;
use crate::model::Task;

/// Number of chapters kept by `ata_breakdown`.
pub const ATA_TOP_N: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// 1-based for display.
    pub group_id: usize,
    pub center: f64,
    pub task_count: usize,
    pub mean_deviation_pct: f64,
    pub max_deviation_pct: f64,
    /// Group is the small side of at least one nested relationship.
    pub is_nested_small: bool,
}

/// One row per group that received at least one task, in group order.
pub fn get_summary(result: &FitResult) -> Vec<GroupSummary> {
    let nested_small: HashSet<usize> = result
        .nested_relationships
        .iter()
        .map(|r| r.small_group)
        .collect();

    result
        .group_centers
        .iter()
        .enumerate()
        .filter_map(|(group_id, &center)| {
            let deviations: Vec<f64> = result
                .assignments
                .iter()
                .filter_map(|a| a.group)
                .filter(|g| g.group_id == group_id)
                .map(|g| g.deviation)
                .collect();

            if deviations.is_empty() {
                return None;
            }

            let mean = deviations.iter().sum::<f64>() / deviations.len() as f64;
            let max = deviations.iter().copied().fold(0.0, f64::max);

            Some(GroupSummary {
                group_id: group_id + 1,
                center,
                task_count: deviations.len(),
                mean_deviation_pct: mean * 100.0,
                max_deviation_pct: max * 100.0,
                is_nested_small: nested_small.contains(&group_id),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_tasks: usize,
    pub in_group_count: usize,
    pub in_group_rate: f64,
    pub out_of_phase_count: usize,
    pub num_groups: usize,
    pub num_nested: usize,
    pub nested_groups: usize,
    pub reduction_rate: f64,
    pub avg_deviation: f64,
    pub max_deviation: f64,
}

/// Headline numbers for a finished run.
pub fn summary_metrics(result: &FitResult) -> SummaryMetrics {
    let deviations: Vec<f64> = result
        .assignments
        .iter()
        .filter_map(|a| a.group.map(|g| g.deviation))
        .collect();

    let (avg_deviation, max_deviation) = if deviations.is_empty() {
        (0.0, 0.0)
    } else {
        let avg = deviations.iter().sum::<f64>() / deviations.len() as f64;
        let max = deviations.iter().copied().fold(0.0, f64::max);
        (avg * 100.0, max * 100.0)
    };

    SummaryMetrics {
        total_tasks: result.stats.total,
        in_group_count: result.stats.in_group,
        in_group_rate: result.stats.in_group_rate,
        out_of_phase_count: result.stats.out_of_phase,
        num_groups: result.group_centers.len(),
        num_nested: result.nested_relationships.len(),
        nested_groups: result.nested_groups,
        reduction_rate: result.reduction_ratio * 100.0,
        avg_deviation,
        max_deviation,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtaSummary {
    pub ata: String,
    pub task_count: usize,
    pub mean_interval: f64,
}

/// Task count and mean interval per ATA chapter, busiest chapters first
/// (ties by chapter), capped at `ATA_TOP_N`. Tasks without a chapter are
/// skipped.
pub fn ata_breakdown(tasks: &[Task]) -> Vec<AtaSummary> {
    let mut by_chapter: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for task in tasks {
        if let Some(ata) = task.ata_chapter() {
            let entry = by_chapter.entry(ata).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += task.interval;
        }
    }

    let mut rows: Vec<AtaSummary> = by_chapter
        .into_iter()
        .map(|(ata, (count, sum))| AtaSummary {
            ata: ata.to_string(),
            task_count: count,
            mean_interval: sum / count as f64,
        })
        .collect();

    // BTreeMap order already sorts by chapter; a stable sort keeps it for ties.
    rows.sort_by(|a, b| b.task_count.cmp(&a.task_count));
    rows.truncate(ATA_TOP_N);
    rows
}
