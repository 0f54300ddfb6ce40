/// End-to-end runs: CSV task list → fit → exported files
///
/// Everything is written into a temporary directory; no external services
/// are involved.

use std::fs;

use apbc_optimizer::analysis::{fit, summary};
use apbc_optimizer::config::Settings;
use apbc_optimizer::export;
use apbc_optimizer::ingest::tasks::{parse_task_csv, read_task_csv};
use apbc_optimizer::model::OptimizerError;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// A small maintenance planning document: zonal checks every 600 FH, gear
/// lubrication every 250 cycles (1207.5 EFH), cabin items every 2 and 4
/// months (870 / 1740 EFH), two odd intervals and two rows without any
/// interval.
fn sample_mpd() -> String {
    let mut csv = String::from("Task Number,Description,FH,FC,Calendar,Unit\n");
    for i in 0..25 {
        csv.push_str(&format!("05-{:03},\"Zonal inspection, area {}\",600,,,\n", i, i));
    }
    for i in 0..15 {
        csv.push_str(&format!("32-{:03},Gear lubrication,,250,,\n", i));
    }
    for i in 0..12 {
        csv.push_str(&format!("25-{:03},Cabin item,,,2,MO\n", i));
    }
    for i in 0..12 {
        csv.push_str(&format!("25-{:03},Cabin deep clean,,,4,MO\n", 100 + i));
    }
    csv.push_str("71-001,Engine borescope,7300,,,\n");
    csv.push_str("49-001,APU check,640,,,\n");
    csv.push_str("21-001,Placard check,,,,\n");
    csv.push_str("21-002,Duplicate entry,n/a,,,\n");
    csv
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_csv_to_groups() {
    let list = parse_task_csv(&sample_mpd()).expect("valid csv");
    let stats = list.stats();
    assert_eq!(stats.total_tasks, 68);
    assert_eq!(stats.valid_tasks, 66);
    assert_eq!(stats.invalid_tasks, 2);

    let settings = Settings::default();
    let result = fit(&list.valid_tasks(), &settings.optimizer).expect("fit");

    // Peaks 600 (25), 870 (12), 1207.5 (15), 1740 (12) at threshold 12.
    assert_eq!(result.threshold.threshold, 12);
    assert_eq!(result.group_centers, vec![600.0, 870.0, 1207.5, 1740.0]);

    // The APU task at 640 lands in the 600 group; the borescope is out of phase.
    let out: Vec<&str> = result.out_of_phase().map(|a| a.task.id.as_str()).collect();
    assert_eq!(out, vec!["71-001"]);
    assert_eq!(result.tasks_in_group(0).count(), 26);

    // 1207.5 / 600 ≈ 2.01, 1740 / 600 = 2.9 and 1740 / 870 = 2.
    let pairs: Vec<(usize, usize, u8)> = result
        .nested_relationships
        .iter()
        .map(|r| (r.small_group, r.large_group, r.multiple))
        .collect();
    assert_eq!(pairs, vec![(0, 2, 2), (0, 3, 3), (1, 3, 2)]);

    // Group 0 claims 3 first, so the walk from group 1 stops at once and is
    // not reported.
    assert_eq!(result.nested_chains, vec![vec![0, 3]]);

    let metrics = summary::summary_metrics(&result);
    assert_eq!(metrics.reduction_rate, 50.0);
}

#[test]
fn test_export_round_trip_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("mpd.csv");
    fs::write(&input, sample_mpd()).expect("write csv");

    let list = read_task_csv(&input).expect("read csv");
    let result = fit(&list.valid_tasks(), &Settings::default().optimizer).expect("fit");

    let out_dir = dir.path().join("results");
    let paths = export::write_all(&result, &out_dir, "execution_log.txt").expect("export");

    let workbook: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.workbook).expect("read workbook"))
            .expect("workbook is json");
    assert_eq!(workbook["summary"].as_array().map(|a| a.len()), Some(4));
    assert_eq!(workbook["out_of_phase"][0]["task"], "71-001");
    assert_eq!(workbook["nested_chains"][0]["chain"], "G1 → G4");
    assert_eq!(workbook["metrics"]["total_tasks"], 66);

    let csv = fs::read_to_string(&paths.summary_csv).expect("read csv");
    assert_eq!(csv.lines().count(), 5);

    let log = fs::read_to_string(&paths.log).expect("read log");
    let step_positions: Vec<usize> = ["STEP 1", "STEP 2", "STEP 3", "STEP 4"]
        .iter()
        .map(|step| log.find(step).expect("every step is logged"))
        .collect();
    assert!(step_positions.windows(2).all(|w| w[0] < w[1]), "steps out of order in log");
}

#[test]
fn test_settings_file_drives_fit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("apbc.toml");
    fs::write(&path, "[optimizer]\ncompliance_tolerance = 0.05\n").expect("write config");

    let settings = Settings::load(&path).expect("load settings");
    let list = parse_task_csv(&sample_mpd()).expect("valid csv");
    let result = fit(&list.valid_tasks(), &settings.optimizer).expect("fit");

    // 640 is 6.7% from 600: outside a 5% tolerance.
    let out: Vec<&str> = result.out_of_phase().map(|a| a.task.id.as_str()).collect();
    assert_eq!(out, vec!["71-001", "49-001"]);
}

#[test]
fn test_file_without_interval_columns_is_rejected() {
    let result = parse_task_csv("TASK,TITLE,ZONE\n05-001,Inspect,100\n");
    assert!(matches!(result, Err(OptimizerError::MissingColumns(_))));
}

#[test]
fn test_file_with_no_valid_intervals_fails_fit() {
    let list = parse_task_csv("TASK,TITLE,FH\n05-001,Inspect,\n05-002,Inspect,0\n")
        .expect("columns are fine");
    assert!(list.valid_tasks().is_empty());
    assert!(matches!(
        fit(&list.valid_tasks(), &Settings::default().optimizer),
        Err(OptimizerError::EmptyDataset)
    ));
}
