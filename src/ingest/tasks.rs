/// Maintenance task list reader
///
/// Reads a CSV export of a maintenance planning document, detects which
/// columns hold the task id, title and interval measures, and converts each
/// row's interval to EFH. Rows without a usable interval are kept in the
/// list (they count toward the dataset statistics) but are never handed to
/// the optimizer.

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use super::efh::{is_valid_interval, IntervalMeasures};
use crate::model::{ata_chapter, OptimizerError, Result, Task};

// ---------------------------------------------------------------------------
// Column detection
// ---------------------------------------------------------------------------

/// Header substrings recognised for each column role, checked in this order.
pub const COLUMN_PATTERNS: &[(ColumnRole, &[&str])] = &[
    (ColumnRole::Task, &["task", "task_id", "task_number", "taskcard", "card"]),
    (ColumnRole::Title, &["title", "description", "task_description", "desc"]),
    (ColumnRole::Fh, &["fh", "flight_hours", "flight_hour", "flighthours"]),
    (ColumnRole::Cy, &["cy", "fc", "cycles", "cycle", "flight_cycles"]),
    (ColumnRole::Cal, &["cal", "calendar", "months", "month", "mo"]),
    (ColumnRole::Code, &["code", "unit", "type", "cal_type"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Task,
    Title,
    Fh,
    Cy,
    Cal,
    Code,
}

/// Column index per role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    pub task: Option<usize>,
    pub title: Option<usize>,
    pub fh: Option<usize>,
    pub cy: Option<usize>,
    pub cal: Option<usize>,
    pub code: Option<usize>,
}

impl ColumnMapping {
    fn slot(&mut self, role: ColumnRole) -> &mut Option<usize> {
        match role {
            ColumnRole::Task => &mut self.task,
            ColumnRole::Title => &mut self.title,
            ColumnRole::Fh => &mut self.fh,
            ColumnRole::Cy => &mut self.cy,
            ColumnRole::Cal => &mut self.cal,
            ColumnRole::Code => &mut self.code,
        }
    }

    /// Names of required roles that were not found. Empty means usable.
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.task.is_none() {
            missing.push("task".to_string());
        }
        if self.title.is_none() {
            missing.push("title".to_string());
        }
        if self.fh.is_none() && self.cy.is_none() && self.cal.is_none() {
            missing.push("FH/CY/CAL (at least one)".to_string());
        }
        missing
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(OptimizerError::MissingColumns(missing))
        }
    }
}

/// Map header names to roles by case-insensitive substring match. For each
/// role the first matching column wins; a column claimed by an earlier role
/// is not reused.
pub fn detect_columns(headers: &[String]) -> ColumnMapping {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut mapping = ColumnMapping::default();
    let mut claimed: HashSet<usize> = HashSet::new();

    for (role, patterns) in COLUMN_PATTERNS {
        let found = lowered
            .iter()
            .enumerate()
            .filter(|(idx, _)| !claimed.contains(idx))
            .find(|(_, name)| patterns.iter().any(|p| name.contains(p)))
            .map(|(idx, _)| idx);

        if let Some(idx) = found {
            claimed.insert(idx);
            *mapping.slot(*role) = Some(idx);
        }
    }

    mapping
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Split one CSV line. Supports double-quoted fields with `""` escapes.
fn split_csv_line(line: &str, line_no: usize) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            ('"', false) => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(OptimizerError::Parse {
            line: line_no,
            message: "unterminated quoted field".to_string(),
        });
    }
    fields.push(field);
    Ok(fields)
}

/// Group physical lines into CSV records. A quoted field may span lines, so
/// a record continues while its quote count is odd. Each record carries the
/// line number it starts on; blank lines between records are skipped.
fn split_records(text: &str) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim_start_matches('\u{feff}');
        let (start, record) = match pending.take() {
            Some((start, mut record)) => {
                record.push('\n');
                record.push_str(line);
                (start, record)
            }
            None if line.trim().is_empty() => continue,
            None => (idx + 1, line.to_string()),
        };

        if record.matches('"').count() % 2 == 1 {
            pending = Some((start, record));
        } else {
            records.push((start, record));
        }
    }

    // An unterminated quote runs to the end of the input; the field
    // splitter reports it.
    records.extend(pending);
    records
}

/// Numeric cell; blanks and non-numbers are treated as missing.
fn parse_number(cell: Option<&String>) -> Option<f64> {
    cell.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
}

fn parse_text(cell: Option<&String>) -> Option<String> {
    cell.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Task list
// ---------------------------------------------------------------------------

/// One row of the source file after EFH conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub measures: IntervalMeasures,
    /// EFH interval, if any measure was present.
    pub interval: Option<f64>,
}

impl TaskRecord {
    pub fn is_valid(&self) -> bool {
        is_valid_interval(self.interval)
    }

    pub fn ata_chapter(&self) -> Option<&str> {
        ata_chapter(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total_tasks: usize,
    pub valid_tasks: usize,
    pub invalid_tasks: usize,
    pub has_fh: usize,
    pub has_cy: usize,
    pub has_cal: usize,
    pub min_efh: f64,
    pub max_efh: f64,
    pub mean_efh: f64,
    pub median_efh: f64,
    pub ata_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskList {
    pub mapping: ColumnMapping,
    pub records: Vec<TaskRecord>,
}

impl TaskList {
    /// Tasks with a positive finite interval, in file order.
    pub fn valid_tasks(&self) -> Vec<Task> {
        self.records
            .iter()
            .filter_map(|r| match r.interval {
                Some(interval) if r.is_valid() => Some(Task::new(&r.id, &r.title, interval)),
                _ => None,
            })
            .collect()
    }

    pub fn stats(&self) -> DatasetStats {
        let mut valid: Vec<f64> = self
            .records
            .iter()
            .filter(|r| r.is_valid())
            .filter_map(|r| r.interval)
            .collect();
        valid.sort_by(f64::total_cmp);

        let (min_efh, max_efh, mean_efh, median_efh) = if valid.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let n = valid.len();
            let mean = valid.iter().sum::<f64>() / n as f64;
            let median = if n % 2 == 1 {
                valid[n / 2]
            } else {
                (valid[n / 2 - 1] + valid[n / 2]) / 2.0
            };
            (valid[0], valid[n - 1], mean, median)
        };

        let ata_count = self
            .records
            .iter()
            .filter_map(|r| r.ata_chapter())
            .collect::<HashSet<_>>()
            .len();

        DatasetStats {
            total_tasks: self.records.len(),
            valid_tasks: valid.len(),
            invalid_tasks: self.records.len() - valid.len(),
            has_fh: self.records.iter().filter(|r| r.measures.fh.is_some()).count(),
            has_cy: self.records.iter().filter(|r| r.measures.cy.is_some()).count(),
            has_cal: self.records.iter().filter(|r| r.measures.cal.is_some()).count(),
            min_efh,
            max_efh,
            mean_efh,
            median_efh,
            ata_count,
        }
    }
}

/// Parse CSV text with a header row.
pub fn parse_task_csv(text: &str) -> Result<TaskList> {
    let mut lines = split_records(text).into_iter();

    let (header_no, header_line) = lines
        .next()
        .ok_or_else(|| OptimizerError::MissingColumns(vec!["header row".to_string()]))?;
    let headers = split_csv_line(&header_line, header_no)?;

    let mapping = detect_columns(&headers);
    mapping.validate()?;

    let mut records = Vec::new();
    for (line_no, line) in lines {
        let fields = split_csv_line(&line, line_no)?;
        if fields.len() > headers.len() {
            return Err(OptimizerError::Parse {
                line: line_no,
                message: format!("expected {} fields, got {}", headers.len(), fields.len()),
            });
        }

        let cell = |idx: Option<usize>| idx.and_then(|i| fields.get(i));

        let measures = IntervalMeasures {
            fh: parse_number(cell(mapping.fh)),
            cy: parse_number(cell(mapping.cy)),
            cal: parse_number(cell(mapping.cal)),
            code: parse_text(cell(mapping.code)),
        };
        let interval = measures.interval();

        records.push(TaskRecord {
            id: parse_text(cell(mapping.task)).unwrap_or_default(),
            title: parse_text(cell(mapping.title)).unwrap_or_default(),
            measures,
            interval,
        });
    }

    Ok(TaskList { mapping, records })
}

/// Read and parse a CSV task list from disk.
pub fn read_task_csv(path: &Path) -> Result<TaskList> {
    let text = std::fs::read_to_string(path)?;
    parse_task_csv(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // --- Column detection ---------------------------------------------------

    #[test]
    fn test_detects_standard_headers() {
        let mapping = detect_columns(&headers(&["TASK", "TITLE", "FH", "CY", "CAL", "CODE"]));
        assert_eq!(mapping.task, Some(0));
        assert_eq!(mapping.title, Some(1));
        assert_eq!(mapping.fh, Some(2));
        assert_eq!(mapping.cy, Some(3));
        assert_eq!(mapping.cal, Some(4));
        assert_eq!(mapping.code, Some(5));
        assert!(mapping.missing().is_empty());
    }

    #[test]
    fn test_detects_descriptive_headers() {
        let mapping = detect_columns(&headers(&[
            "Task Card", "Description", "Flight_Hours", "Flight_Cycles", "Calendar", "Unit",
        ]));
        assert_eq!(mapping.task, Some(0));
        assert_eq!(mapping.title, Some(1));
        assert_eq!(mapping.fh, Some(2));
        assert_eq!(mapping.cy, Some(3));
        assert_eq!(mapping.cal, Some(4));
        assert_eq!(mapping.code, Some(5));
    }

    #[test]
    fn test_claimed_column_not_reused() {
        // "task_description" matches both task and title patterns.
        let mapping = detect_columns(&headers(&["task_description", "task_no", "fh"]));
        assert_eq!(mapping.task, Some(0));
        assert_eq!(mapping.title, None);
    }

    #[test]
    fn test_missing_interval_columns_reported() {
        let mapping = detect_columns(&headers(&["TASK", "TITLE", "ZONE"]));
        match mapping.validate() {
            Err(OptimizerError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["FH/CY/CAL (at least one)".to_string()]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    // --- Line splitting -----------------------------------------------------

    #[test]
    fn test_quoted_fields_keep_commas_and_quotes() {
        let fields = split_csv_line(r#"05-01,"Inspect ""A"", left side",600"#, 2).expect("valid");
        assert_eq!(fields, vec!["05-01", r#"Inspect "A", left side"#, "600"]);
    }

    #[test]
    fn test_unterminated_quote_is_parse_error() {
        let result = split_csv_line(r#"05-01,"broken,600"#, 7);
        assert!(matches!(result, Err(OptimizerError::Parse { line: 7, .. })));
    }

    // --- Full parse ---------------------------------------------------------

    const SAMPLE: &str = "\
TASK,TITLE,FH,CY,CAL,CODE
05-100-01,Zonal inspection,600,,,
05-100-02,Zonal inspection,,,,
32-200-01,Landing gear lube,,200,,
21-300-01,Pack check,,,2,MO
21-300-02,Filter swap,abc,,1,WK
";

    #[test]
    fn test_parse_converts_and_filters() {
        let list = parse_task_csv(SAMPLE).expect("valid csv");
        assert_eq!(list.records.len(), 5);

        let tasks = list.valid_tasks();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["05-100-01", "32-200-01", "21-300-01", "21-300-02"]);
        assert_eq!(tasks[0].interval, 600.0);
        assert!((tasks[1].interval - 966.0).abs() < 1e-9);
        assert_eq!(tasks[2].interval, 870.0);
        assert!((tasks[3].interval - 4.35 * 435.0).abs() < 1e-9, "non-numeric FH is ignored");
    }

    #[test]
    fn test_stats_count_valid_and_invalid() {
        let stats = parse_task_csv(SAMPLE).expect("valid csv").stats();
        assert_eq!(stats.total_tasks, 5);
        assert_eq!(stats.valid_tasks, 4);
        assert_eq!(stats.invalid_tasks, 1);
        assert_eq!(stats.has_fh, 1);
        assert_eq!(stats.has_cy, 1);
        assert_eq!(stats.has_cal, 2);
        assert_eq!(stats.min_efh, 600.0);
        assert_eq!(stats.median_efh, (870.0 + 966.0) / 2.0);
        assert_eq!(stats.ata_count, 3);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let list = parse_task_csv("TASK,TITLE,FH,CY\n05-1,Short,800\n").expect("valid csv");
        assert_eq!(list.valid_tasks()[0].interval, 800.0);
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let result = parse_task_csv("TASK,TITLE,FH\n05-1,Long,800,extra\n");
        assert!(matches!(result, Err(OptimizerError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_quoted_title_may_span_lines() {
        let text = "TASK,TITLE,FH\n05-1,\"Inspect left wing\nincl. flap tracks\",600\n\n05-2,Plain,800\n";
        let list = parse_task_csv(text).expect("embedded newline is valid");
        assert_eq!(list.records.len(), 2);
        assert_eq!(list.records[0].title, "Inspect left wing\nincl. flap tracks");
        assert_eq!(list.records[0].interval, Some(600.0));
        assert_eq!(list.records[1].id, "05-2");
    }

    #[test]
    fn test_records_track_starting_line() {
        let records = split_records("H\n\"a\nb\",1\n\nc,2\n");
        let starts: Vec<usize> = records.iter().map(|(line, _)| *line).collect();
        assert_eq!(starts, vec![1, 2, 5]);
    }

    #[test]
    fn test_quote_left_open_to_end_of_file_is_parse_error() {
        let result = parse_task_csv("TASK,TITLE,FH\n05-1,\"never closed,600\n05-2,Plain,800\n");
        assert!(matches!(result, Err(OptimizerError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_empty_file_has_no_header() {
        assert!(matches!(
            parse_task_csv("\n\n"),
            Err(OptimizerError::MissingColumns(_))
        ));
    }
}
