//! Result export.
//!
//! Writes a finished run to disk in three pieces:
//! - `apbc_results.json`: a workbook with one sheet per table (summary,
//!   in-group, out-of-phase, nested pairs, nested chains, ATA chapters)
//! - `groups_summary.csv`: the summary sheet alone
//! - the plain-text execution log
//!
//! Group ids are 1-based everywhere in exported data.

use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::summary::{ata_breakdown, AtaSummary};
use crate::analysis::{get_summary, summary_metrics, FitResult, GroupSummary, SummaryMetrics};
use crate::model::Result;

pub const WORKBOOK_FILE: &str = "apbc_results.json";
pub const SUMMARY_CSV_FILE: &str = "groups_summary.csv";

// ============================================================================
// Sheet rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InGroupRow {
    pub task: String,
    pub title: String,
    pub interval_efh: f64,
    pub group_id: usize,
    pub group_center: f64,
    pub deviation_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutOfPhaseRow {
    pub task: String,
    pub title: String,
    pub interval_efh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedRow {
    pub small_group: usize,
    pub small_center: f64,
    pub large_group: usize,
    pub large_center: f64,
    pub ratio: f64,
    pub multiple: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainRow {
    pub chain_id: usize,
    /// e.g. "G1 → G3"
    pub chain: String,
    pub length: usize,
    pub groups: Vec<usize>,
}

// ============================================================================
// Workbook
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Workbook {
    pub generated_at: String,
    pub metrics: SummaryMetrics,
    pub summary: Vec<GroupSummary>,
    pub in_group: Vec<InGroupRow>,
    pub out_of_phase: Vec<OutOfPhaseRow>,
    pub nested: Vec<NestedRow>,
    pub nested_chains: Vec<ChainRow>,
    pub ata: Vec<AtaSummary>,
}

/// "G1 → G2 → G4" for a zero-based chain.
pub fn chain_label(chain: &[usize]) -> String {
    chain
        .iter()
        .map(|g| format!("G{}", g + 1))
        .collect::<Vec<_>>()
        .join(" → ")
}

impl Workbook {
    pub fn from_result(result: &FitResult) -> Self {
        let in_group = result
            .assignments
            .iter()
            .filter_map(|a| {
                a.group.map(|g| InGroupRow {
                    task: a.task.id.clone(),
                    title: a.task.title.clone(),
                    interval_efh: a.task.interval,
                    group_id: g.group_id + 1,
                    group_center: g.center,
                    deviation_pct: g.deviation * 100.0,
                })
            })
            .collect();

        let out_of_phase = result
            .out_of_phase()
            .map(|a| OutOfPhaseRow {
                task: a.task.id.clone(),
                title: a.task.title.clone(),
                interval_efh: a.task.interval,
            })
            .collect();

        let nested = result
            .nested_relationships
            .iter()
            .map(|r| NestedRow {
                small_group: r.small_group + 1,
                small_center: r.small_center,
                large_group: r.large_group + 1,
                large_center: r.large_center,
                ratio: r.ratio,
                multiple: r.multiple,
            })
            .collect();

        let nested_chains = result
            .nested_chains
            .iter()
            .enumerate()
            .map(|(i, chain)| ChainRow {
                chain_id: i + 1,
                chain: chain_label(chain),
                length: chain.len(),
                groups: chain.iter().map(|g| g + 1).collect(),
            })
            .collect();

        let tasks: Vec<_> = result.assignments.iter().map(|a| a.task.clone()).collect();

        Self {
            generated_at: Utc::now().to_rfc3339(),
            metrics: summary_metrics(result),
            summary: get_summary(result),
            in_group,
            out_of_phase,
            nested,
            nested_chains,
            ata: ata_breakdown(&tasks),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// CSV
// ============================================================================

/// Summary sheet as CSV with a header row.
pub fn summary_csv(rows: &[GroupSummary]) -> String {
    let mut out = String::from(
        "Group_ID,Center_EFH,Num_Tasks,Avg_Deviation_%,Max_Deviation_%,Is_Nested\n",
    );
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{:.2},{:.2},{}\n",
            row.group_id,
            row.center,
            row.task_count,
            row.mean_deviation_pct,
            row.max_deviation_pct,
            if row.is_nested_small { "yes" } else { "" }
        ));
    }
    out
}

// ============================================================================
// Writing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub workbook: PathBuf,
    pub summary_csv: PathBuf,
    pub log: PathBuf,
}

/// Write workbook, summary CSV and log into `dir`, creating it if needed.
pub fn write_all(result: &FitResult, dir: &Path, log_file: &str) -> Result<ExportPaths> {
    fs::create_dir_all(dir)?;

    let workbook = Workbook::from_result(result);
    let paths = ExportPaths {
        workbook: dir.join(WORKBOOK_FILE),
        summary_csv: dir.join(SUMMARY_CSV_FILE),
        log: dir.join(log_file),
    };

    fs::write(&paths.workbook, workbook.to_json()?)?;
    fs::write(&paths.summary_csv, summary_csv(&workbook.summary))?;
    result.execution_log.write_to_file(&paths.log)?;

    Ok(paths)
}
