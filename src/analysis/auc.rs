use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::model::Sheet;
use crate::error::{AnalysisError, Result};

/// Numerical integration rule for [`auc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationRule {
    /// Composite trapezoidal rule
    #[default]
    #[serde(alias = "trapezoid", alias = "trapz")]
    Trapezoidal,
    /// Composite Simpson's rule
    #[serde(alias = "simps")]
    Simpson,
}

impl FromStr for IntegrationRule {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trapezoidal" | "trapezoid" | "trapz" => Ok(IntegrationRule::Trapezoidal),
            "simpson" | "simps" => Ok(IntegrationRule::Simpson),
            _ => Err(AnalysisError::UnknownRule(s.to_string())),
        }
    }
}

impl fmt::Display for IntegrationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationRule::Trapezoidal => f.write_str("trapezoidal"),
            IntegrationRule::Simpson => f.write_str("simpson"),
        }
    }
}

fn trapezoid(y: &[f64], dx: f64) -> f64 {
    y.windows(2).map(|w| (w[0] + w[1]) * dx / 2.0).sum()
}

/// Composite Simpson over an even number of intervals (odd sample count).
fn simpson_even(y: &[f64], dx: f64) -> f64 {
    let n = y.len() - 1;
    let inner: f64 = (1..n)
        .map(|i| if i % 2 == 1 { 4.0 * y[i] } else { 2.0 * y[i] })
        .sum();
    dx / 3.0 * (y[0] + inner + y[n])
}

fn simpson(y: &[f64], dx: f64) -> f64 {
    match y.len() {
        0 | 1 => 0.0,
        2 => trapezoid(y, dx),
        n if n % 2 == 1 => simpson_even(y, dx),
        // odd number of intervals: Simpson up to the second-to-last sample,
        // trapezoid over the final interval
        n => simpson_even(&y[..n - 1], dx) + trapezoid(&y[n - 2..], dx),
    }
}

/// Area under `y` sampled every `dx`.
pub fn auc(y: &[f64], dx: f64, rule: IntegrationRule) -> Result<f64> {
    if !dx.is_finite() || dx <= 0.0 {
        return Err(AnalysisError::InvalidSpacing(dx));
    }
    Ok(match rule {
        IntegrationRule::Trapezoidal => trapezoid(y, dx),
        IntegrationRule::Simpson => simpson(y, dx),
    })
}

/// Area under one named column of a sheet.
pub fn auc_column(sheet: &Sheet, column: &str, rule: IntegrationRule, dx: f64) -> Result<f64> {
    let idx = sheet
        .column_index(column)
        .ok_or_else(|| AnalysisError::UnknownColumn {
            sheet: sheet.name.clone(),
            column: column.to_string(),
        })?;
    auc(&sheet.column(idx), dx, rule)
}
