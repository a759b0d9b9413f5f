//! Analysis configuration

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::analysis::auc::IntegrationRule;
use crate::analysis::reclassify::ThresholdPolicy;
use crate::error::{AnalysisError, Result};

/// Default spacing between samples used for AUC integration.
pub const DEFAULT_DX: f64 = 5.0;

/// Every knob of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Derivatives
    /// Step size `h` of the finite differences (default: 1.0)
    pub step_size: f64,

    /// Half-open absolute row range `[start, end)`; `None` uses every row
    pub row_range: Option<(usize, usize)>,

    /// Sheets that hold no recordings (default: `["Sheet1"]`)
    pub skip_sheets: Vec<String>,

    /// Only process the first N sheets (quick look at large workbooks)
    pub debug_sheet_limit: Option<usize>,

    // Aggregation
    /// Keep only maxima strictly above this value
    pub limit: Option<f64>,

    // Reclassification
    /// Exclude wildtype coverslips below the threshold (default: false)
    pub exclude: bool,

    /// `(low, high)` exclusion thresholds (default: (0.4, 0.6))
    pub threshold: (f64, f64),

    /// Which threshold each wildtype concentration is compared against
    pub threshold_policy: ThresholdPolicy,

    // AUC
    pub rule: IntegrationRule,

    /// Uniform sample spacing (default: 5.0)
    pub dx: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            step_size: 1.0,
            row_range: None,
            skip_sheets: vec!["Sheet1".to_string()],
            debug_sheet_limit: None,
            limit: None,
            exclude: false,
            threshold: (0.4, 0.6),
            threshold_policy: ThresholdPolicy::LowForBoth,
            rule: IntegrationRule::Trapezoidal,
            dx: DEFAULT_DX,
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject malformed arguments before any computation.
    ///
    /// Row ranges are only checked for ordering here; their upper bound is
    /// checked per sheet once the sheet size is known.
    pub fn validate(&self) -> Result<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(AnalysisError::InvalidStepSize(self.step_size));
        }
        if let Some((start, end)) = self.row_range {
            if start >= end {
                return Err(AnalysisError::InvalidRowRange {
                    sheet: "*".to_string(),
                    start,
                    end,
                    rows: 0,
                });
            }
        }
        let (low, high) = self.threshold;
        if !low.is_finite() || !high.is_finite() || low > high {
            return Err(AnalysisError::InvalidThreshold { low, high });
        }
        if !self.dx.is_finite() || self.dx <= 0.0 {
            return Err(AnalysisError::InvalidSpacing(self.dx));
        }
        Ok(())
    }

    pub fn is_skipped(&self, sheet: &str) -> bool {
        self.skip_sheets.iter().any(|s| s == sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_arguments() {
        let bad_h = AnalysisConfig {
            step_size: 0.0,
            ..Default::default()
        };
        assert_eq!(bad_h.validate(), Err(AnalysisError::InvalidStepSize(0.0)));

        let bad_range = AnalysisConfig {
            row_range: Some((5, 5)),
            ..Default::default()
        };
        assert!(matches!(
            bad_range.validate(),
            Err(AnalysisError::InvalidRowRange { start: 5, end: 5, .. })
        ));

        let bad_threshold = AnalysisConfig {
            threshold: (0.6, 0.4),
            ..Default::default()
        };
        assert!(matches!(
            bad_threshold.validate(),
            Err(AnalysisError::InvalidThreshold { .. })
        ));

        let bad_dx = AnalysisConfig {
            dx: -1.0,
            ..Default::default()
        };
        assert_eq!(bad_dx.validate(), Err(AnalysisError::InvalidSpacing(-1.0)));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "exclude": true, "rule": "simpson", "limit": 0.2 }"#).unwrap();
        assert!(config.exclude);
        assert_eq!(config.rule, IntegrationRule::Simpson);
        assert_eq!(config.limit, Some(0.2));
        assert_eq!(config.step_size, 1.0);
        assert_eq!(config.skip_sheets, vec!["Sheet1".to_string()]);
    }
}
