/// Equivalent Flight Hours (EFH) conversion
///
/// Maintenance programs state intervals in flight hours (FH), flight cycles
/// (CY) or calendar time (CAL with a unit code). All three are converted to
/// EFH and the most limiting one becomes the task's interval:
///
///   EFH_FH  = FH
///   EFH_FC  = CY × 4.83
///   EFH_CAL = CAL × code_factor × 435

/// Flight hours per cycle.
pub const HOURS_PER_CYCLE: f64 = 4.83;

/// Flight hours per calendar month.
pub const HOURS_PER_MONTH: f64 = 435.0;

/// Calendar unit used when the CODE cell is empty.
pub const DEFAULT_CAL_CODE: &str = "MO";

/// Calendar unit code → month factor. Unknown codes count as months.
pub fn code_factor(code: &str) -> f64 {
    match code.trim().to_ascii_uppercase().as_str() {
        "MO" | "MONTH" => 1.0,
        "WK" | "WEEK" => 4.35,
        "DY" | "DAY" => 0.14,
        _ => 1.0,
    }
}

/// Raw interval measures of one task row, before conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalMeasures {
    pub fh: Option<f64>,
    pub cy: Option<f64>,
    pub cal: Option<f64>,
    pub code: Option<String>,
}

impl IntervalMeasures {
    pub fn efh_fh(&self) -> Option<f64> {
        self.fh
    }

    pub fn efh_fc(&self) -> Option<f64> {
        self.cy.map(|cy| cy * HOURS_PER_CYCLE)
    }

    pub fn efh_cal(&self) -> Option<f64> {
        let cal = self.cal?;
        let code = self.code.as_deref().unwrap_or(DEFAULT_CAL_CODE);
        Some(cal * code_factor(code) * HOURS_PER_MONTH)
    }

    /// Minimum of the measures that are present; `None` if none is.
    pub fn interval(&self) -> Option<f64> {
        [self.efh_fh(), self.efh_fc(), self.efh_cal()]
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .reduce(f64::min)
    }
}

/// True for an interval the optimizer can use.
pub fn is_valid_interval(interval: Option<f64>) -> bool {
    matches!(interval, Some(v) if v.is_finite() && v > 0.0)
}
