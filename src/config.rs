//! Optimizer configuration.
//!
//! Settings come from an optional TOML file, then environment variables
//! (a `.env` file is loaded first by the binary). Every value has a default
//! so an empty file, or no file, yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::nested::TRIPLE_WINDOW;
use crate::model::{OptimizerError, Result};

// ---------------------------------------------------------------------------
// Algorithm parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Fraction of tasks the selected peaks must cover, in (0, 1).
    pub target_coverage: f64,
    /// Peak-merge tolerance below 10,000 EFH; widened ×1.2 / ×1.5 above.
    pub base_tolerance: f64,
    /// Maximum relative deviation between a task and its group center.
    pub compliance_tolerance: f64,
    /// Ratio window for ×2 nesting, `(min, max)` inclusive.
    pub nested_ratio_range: (f64, f64),
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            target_coverage: 0.80,
            base_tolerance: 0.10,
            compliance_tolerance: 0.20,
            nested_ratio_range: (1.8, 2.2),
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.target_coverage > 0.0 && self.target_coverage < 1.0) {
            return Err(OptimizerError::InvalidConfig(format!(
                "target_coverage must be in (0, 1), got {}",
                self.target_coverage
            )));
        }
        if !(self.base_tolerance.is_finite() && self.base_tolerance > 0.0) {
            return Err(OptimizerError::InvalidConfig(format!(
                "base_tolerance must be positive, got {}",
                self.base_tolerance
            )));
        }
        if !(self.compliance_tolerance.is_finite() && self.compliance_tolerance > 0.0) {
            return Err(OptimizerError::InvalidConfig(format!(
                "compliance_tolerance must be positive, got {}",
                self.compliance_tolerance
            )));
        }

        // The ×2 window must stay below the fixed ×3 window so a ratio can
        // never match two multiples.
        let (min, max) = self.nested_ratio_range;
        let triple_min = TRIPLE_WINDOW.0;
        if !(min > 1.0 && min <= max && max < triple_min) {
            return Err(OptimizerError::InvalidConfig(format!(
                "nested_ratio_range must satisfy 1.0 < min <= max < {}, got ({}, {})",
                triple_min, min, max
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output locations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives the workbook, summary CSV and log.
    pub dir: String,
    /// File name of the plain-text execution log inside `dir`.
    pub log_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "apbc_output".to_string(),
            log_file: "execution_log.txt".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level settings file
// ---------------------------------------------------------------------------

/// Contents of `apbc.toml`:
///
/// ```toml
/// [optimizer]
/// target_coverage = 0.85
/// nested_ratio_range = [1.8, 2.2]
///
/// [output]
/// dir = "results"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub optimizer: OptimizerConfig,
    pub output: OutputConfig,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.optimizer.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply `APBC_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Tests pass a closure over a
    /// map instead of mutating the process environment.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| -> Result<Option<f64>> {
            match lookup(key) {
                Some(raw) => raw.trim().parse::<f64>().map(Some).map_err(|_| {
                    OptimizerError::InvalidConfig(format!("{} is not a number: '{}'", key, raw))
                }),
                None => Ok(None),
            }
        };

        if let Some(v) = number("APBC_TARGET_COVERAGE")? {
            self.optimizer.target_coverage = v;
        }
        if let Some(v) = number("APBC_BASE_TOLERANCE")? {
            self.optimizer.base_tolerance = v;
        }
        if let Some(v) = number("APBC_COMPLIANCE_TOLERANCE")? {
            self.optimizer.compliance_tolerance = v;
        }
        if let Some(v) = number("APBC_NESTED_MIN")? {
            self.optimizer.nested_ratio_range.0 = v;
        }
        if let Some(v) = number("APBC_NESTED_MAX")? {
            self.optimizer.nested_ratio_range.1 = v;
        }
        if let Some(dir) = lookup("APBC_OUTPUT_DIR") {
            self.output.dir = dir;
        }

        self.optimizer.validate()?;
        Ok(self)
    }
}
