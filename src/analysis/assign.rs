//! Tolerance-bounded task-to-group assignment.
//!
//! Each task is decided on its own: nothing is shared between tasks, so the
//! pass runs on the rayon pool and the result is gathered in input order.

use rayon::prelude::*;
use serde::Serialize;

use crate::model::{Assignment, GroupMatch, Task};

/// Relative distance between an interval and a group center.
pub fn deviation(interval: f64, center: f64) -> f64 {
    (interval - center).abs() / center
}

/// Closest center within `compliance_tolerance`, if any.
///
/// The bound is inclusive. On an exact tie the lower group index wins, since
/// a later center only replaces the current best when strictly closer.
pub fn best_group(interval: f64, centers: &[f64], compliance_tolerance: f64) -> Option<GroupMatch> {
    let mut best: Option<GroupMatch> = None;

    for (group_id, &center) in centers.iter().enumerate() {
        let dev = deviation(interval, center);
        if dev > compliance_tolerance {
            continue;
        }
        let closer = best.map(|b| dev < b.deviation).unwrap_or(true);
        if closer {
            best = Some(GroupMatch {
                group_id,
                center,
                deviation: dev,
            });
        }
    }

    best
}

/// Assign every task; output order matches `tasks`.
pub fn assign_tasks(tasks: &[Task], centers: &[f64], compliance_tolerance: f64) -> Vec<Assignment> {
    tasks
        .par_iter()
        .map(|task| Assignment {
            task: task.clone(),
            group: best_group(task.interval, centers, compliance_tolerance),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssignmentStats {
    pub total: usize,
    pub in_group: usize,
    pub out_of_phase: usize,
    /// Percent of `total`.
    pub in_group_rate: f64,
    /// Percent of `total`.
    pub out_of_phase_rate: f64,
}

impl AssignmentStats {
    pub fn from_assignments(assignments: &[Assignment]) -> Self {
        let total = assignments.len();
        let in_group = assignments.iter().filter(|a| a.is_in_group()).count();
        let out_of_phase = total - in_group;
        let pct = |n: usize| {
            if total == 0 {
                0.0
            } else {
                n as f64 / total as f64 * 100.0
            }
        };

        Self {
            total,
            in_group,
            out_of_phase,
            in_group_rate: pct(in_group),
            out_of_phase_rate: pct(out_of_phase),
        }
    }
}
