/// Adaptive peak-based clustering of maintenance task intervals.
///
/// `fit` runs four stages strictly in order, each a pure function of the
/// previous stage's output:
///
/// - `threshold`: picks the minimum frequency that still covers the target
///   share of tasks, yielding the peak intervals.
/// - `merge`: collapses nearby peaks into group centers.
/// - `assign`: places each task in its closest compliant group.
/// - `nested`: finds ×2/×3/×4 relationships between centers and chains them.
///
/// `summary` turns a finished `FitResult` into flat report rows.

pub mod assign;
pub mod merge;
pub mod nested;
pub mod summary;
pub mod threshold;

use serde::Serialize;

use crate::config::OptimizerConfig;
use crate::logging::{log_assignment_summary, ExecutionLog, Stage};
use crate::model::{
    Assignment, FrequencyTable, NestedChain, NestedRelationship, OptimizerError, Result, Task,
};

pub use assign::AssignmentStats;
pub use nested::NestedDetection;
pub use summary::{get_summary, summary_metrics, GroupSummary, SummaryMetrics};
pub use threshold::ThresholdSelection;

const BANNER_WIDTH: usize = 70;

/// Everything one run produces. Built from scratch on every `fit`.
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    pub threshold: ThresholdSelection,
    /// Ascending and distinct; the index is the group id.
    pub group_centers: Vec<f64>,
    /// One per input task, in input order.
    pub assignments: Vec<Assignment>,
    pub stats: AssignmentStats,
    pub nested_relationships: Vec<NestedRelationship>,
    pub nested_groups: usize,
    pub reduction_ratio: f64,
    pub nested_chains: Vec<NestedChain>,
    pub execution_log: ExecutionLog,
}

impl FitResult {
    pub fn in_group(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| a.is_in_group())
    }

    pub fn out_of_phase(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| !a.is_in_group())
    }

    /// Tasks assigned to one group (zero-based id).
    pub fn tasks_in_group(&self, group_id: usize) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .iter()
            .filter(move |a| a.group.map(|g| g.group_id) == Some(group_id))
    }
}

fn check_intervals(tasks: &[Task]) -> Result<()> {
    match tasks
        .iter()
        .find(|t| !(t.interval.is_finite() && t.interval > 0.0))
    {
        Some(bad) => Err(OptimizerError::InvalidInterval {
            task_id: bad.id.clone(),
            value: bad.interval,
        }),
        None => Ok(()),
    }
}

/// Run the full pipeline over pre-validated tasks.
///
/// Fails on an invalid configuration, on any task whose interval is not a
/// positive finite number, and on an empty task list.
pub fn fit(tasks: &[Task], config: &OptimizerConfig) -> Result<FitResult> {
    config.validate()?;
    check_intervals(tasks)?;

    // No run log exists yet; the caller only gets the error.
    if tasks.is_empty() {
        tracing::error!(stage = %Stage::Data, "No valid tasks to cluster");
        return Err(OptimizerError::EmptyDataset);
    }

    let mut log = ExecutionLog::new();
    log.info(Stage::Pipeline, "=".repeat(BANNER_WIDTH));
    log.info(Stage::Pipeline, "ADAPTIVE PEAK-BASED CLUSTERING (APBC)");
    log.info(Stage::Pipeline, "=".repeat(BANNER_WIDTH));

    log.info(Stage::Data, format!("Data: {} valid tasks", tasks.len()));

    let table = FrequencyTable::from_intervals(tasks.iter().map(|t| t.interval));
    log.debug(
        Stage::Data,
        format!("{} distinct intervals", table.len()),
    );

    // Step 1
    log.info(
        Stage::Threshold,
        format!(
            "STEP 1: Optimal threshold (target: {:.0}%)",
            config.target_coverage * 100.0
        ),
    );
    let selection = threshold::select_threshold(&table, config.target_coverage)?;
    if selection.fell_back {
        log.warn(
            Stage::Threshold,
            "No threshold in 1..=20 met the target; using threshold 1",
        );
    }
    log.info(Stage::Threshold, format!("Threshold = {}", selection.threshold));
    log.info(Stage::Threshold, format!("-> {} peaks", selection.peaks.len()));
    log.info(
        Stage::Threshold,
        format!("-> Coverage: {:.1}%", selection.coverage * 100.0),
    );

    // Step 2
    log.info(Stage::Merge, "STEP 2: Merge peaks with adaptive tolerance");
    let group_centers = merge::merge_peaks(&selection.peaks, &table, config.base_tolerance);
    log.info(
        Stage::Merge,
        format!("{} peaks -> {} groups", selection.peaks.len(), group_centers.len()),
    );

    // Step 3
    log.info(
        Stage::Assign,
        format!(
            "STEP 3: Assign tasks (tolerance ±{:.0}%)",
            config.compliance_tolerance * 100.0
        ),
    );
    let assignments = assign::assign_tasks(tasks, &group_centers, config.compliance_tolerance);
    let stats = AssignmentStats::from_assignments(&assignments);
    log_assignment_summary(&mut log, stats.total, stats.in_group);

    // Step 4
    log.info(Stage::Nested, "STEP 4: Detect nested groups");
    let detection = nested::detect_nested(&group_centers, config.nested_ratio_range);
    if detection.relationships.is_empty() {
        log.info(Stage::Nested, "No nested groups detected");
    } else {
        log.info(
            Stage::Nested,
            format!("{} nested relationships", detection.relationships.len()),
        );
        log.info(
            Stage::Nested,
            format!("-> {} groups can be nested", detection.nested_groups),
        );
        log.info(
            Stage::Nested,
            format!(
                "-> Reduction {}/{} = {:.1}%",
                detection.nested_groups,
                group_centers.len(),
                detection.reduction_ratio * 100.0
            ),
        );
    }

    let nested_chains = nested::build_nested_chains(&detection.relationships);
    if !nested_chains.is_empty() {
        log.info(Stage::Chains, format!("{} nested chains", nested_chains.len()));
    }

    log.info(Stage::Pipeline, "=".repeat(BANNER_WIDTH));
    log.info(Stage::Pipeline, "DONE");
    log.info(Stage::Pipeline, "=".repeat(BANNER_WIDTH));

    Ok(FitResult {
        threshold: selection,
        group_centers,
        assignments,
        stats,
        nested_relationships: detection.relationships,
        nested_groups: detection.nested_groups,
        reduction_ratio: detection.reduction_ratio,
        nested_chains,
        execution_log: log,
    })
}
