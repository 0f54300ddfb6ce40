//! Peak merging with magnitude-dependent tolerance.
//!
//! Consecutive peaks close to the first member of the current run are merged.
//! Each run publishes its most frequent member as the group center, so every
//! center is an interval that actually occurs in the task data.

use crate::model::FrequencyTable;

/// Peaks below this use the base tolerance.
pub const SMALL_SCALE_LIMIT: f64 = 10_000.0;
/// Peaks below this (and at or above `SMALL_SCALE_LIMIT`) use ×1.2.
pub const MEDIUM_SCALE_LIMIT: f64 = 30_000.0;

/// Merge tolerance for a peak of the given magnitude.
pub fn tolerance_for(peak: f64, base_tolerance: f64) -> f64 {
    if peak < SMALL_SCALE_LIMIT {
        base_tolerance
    } else if peak < MEDIUM_SCALE_LIMIT {
        base_tolerance * 1.2
    } else {
        base_tolerance * 1.5
    }
}

/// Most frequent member of a run; the earliest (smallest) one wins a tie.
fn run_center(run: &[f64], table: &FrequencyTable) -> f64 {
    let mut best = run[0];
    let mut best_count = table.count_of(best);
    for &candidate in &run[1..] {
        let count = table.count_of(candidate);
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Collapse ascending `peaks` into group centers.
///
/// A peak joins the current run when `peak / run[0] <= 1 + tolerance`. The
/// ratio is always taken against the run's anchor, never the latest member,
/// so a run cannot creep upward one small step at a time.
pub fn merge_peaks(peaks: &[f64], table: &FrequencyTable, base_tolerance: f64) -> Vec<f64> {
    let Some((&first, rest)) = peaks.split_first() else {
        return Vec::new();
    };

    let mut centers = Vec::new();
    let mut run = vec![first];

    for &peak in rest {
        let tolerance = tolerance_for(peak, base_tolerance);
        let ratio = peak / run[0];

        if ratio <= 1.0 + tolerance {
            run.push(peak);
        } else {
            centers.push(run_center(&run, table));
            run = vec![peak];
        }
    }
    centers.push(run_center(&run, table));

    centers.sort_by(f64::total_cmp);
    centers.dedup();
    centers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(pairs: &[(f64, usize)]) -> FrequencyTable {
        FrequencyTable::from_intervals(
            pairs
                .iter()
                .flat_map(|(value, count)| std::iter::repeat(*value).take(*count)),
        )
    }

    #[test]
    fn test_tolerance_widens_with_magnitude() {
        assert_eq!(tolerance_for(9_999.0, 0.10), 0.10);
        assert!((tolerance_for(10_000.0, 0.10) - 0.12).abs() < 1e-12);
        assert!((tolerance_for(29_999.0, 0.10) - 0.12).abs() < 1e-12);
        assert!((tolerance_for(30_000.0, 0.10) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_close_peaks_merge_into_most_frequent() {
        let table = table_of(&[(1000.0, 50), (2000.0, 40), (2050.0, 5), (4000.0, 20)]);
        let centers = merge_peaks(&[1000.0, 2000.0, 2050.0, 4000.0], &table, 0.10);
        assert_eq!(centers, vec![1000.0, 2000.0, 4000.0]);
    }

    #[test]
    fn test_center_is_most_frequent_not_first() {
        let table = table_of(&[(600.0, 2), (620.0, 9), (640.0, 4)]);
        let centers = merge_peaks(&[600.0, 620.0, 640.0], &table, 0.10);
        assert_eq!(centers, vec![620.0]);
    }

    #[test]
    fn test_frequency_tie_keeps_earliest_member() {
        let table = table_of(&[(600.0, 3), (620.0, 3)]);
        let centers = merge_peaks(&[600.0, 620.0], &table, 0.10);
        assert_eq!(centers, vec![600.0]);
    }

    #[test]
    fn test_ratio_is_measured_against_run_anchor() {
        // 1050 and 1100 are each within 10% of their predecessor, but 1150
        // is 15% above the anchor 1000, so it opens a new run.
        let table = table_of(&[(1000.0, 5), (1050.0, 1), (1100.0, 1), (1150.0, 1)]);
        let centers = merge_peaks(&[1000.0, 1050.0, 1100.0, 1150.0], &table, 0.10);
        assert_eq!(centers, vec![1000.0, 1150.0]);
    }

    #[test]
    fn test_merge_boundary_is_inclusive() {
        // 1100 / 1000 == 1.1 exactly with a 10% tolerance.
        let table = table_of(&[(1000.0, 1), (1100.0, 2)]);
        let centers = merge_peaks(&[1000.0, 1100.0], &table, 0.10);
        assert_eq!(centers, vec![1100.0]);
    }

    #[test]
    fn test_large_intervals_use_wider_tolerance() {
        // 35,000 / 30,500 ≈ 1.1475: beyond 10% but inside the 15% band.
        let table = table_of(&[(30_500.0, 4), (35_000.0, 1)]);
        let centers = merge_peaks(&[30_500.0, 35_000.0], &table, 0.10);
        assert_eq!(centers, vec![30_500.0]);
    }

    #[test]
    fn test_empty_peaks_give_no_centers() {
        let table = FrequencyTable::default();
        assert!(merge_peaks(&[], &table, 0.10).is_empty());
    }

    #[test]
    fn test_centers_strictly_increasing_over_sweep() {
        let peaks: Vec<f64> = (1..=200).map(|i| i as f64 * 137.0).collect();
        let table = FrequencyTable::from_intervals(peaks.iter().copied());
        let centers = merge_peaks(&peaks, &table, 0.10);
        assert!(!centers.is_empty());
        for pair in centers.windows(2) {
            assert!(pair[0] < pair[1], "centers out of order: {:?}", pair);
        }
    }
}
