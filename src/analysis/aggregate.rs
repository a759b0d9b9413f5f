use std::collections::BTreeMap;

use log::info;
use serde::Serialize;

use crate::data::model::{ClassifiedRecord, CoverslipType, DerivativeTable, MaxRecord};
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Long-format maxima
// ---------------------------------------------------------------------------

/// Pull the column-wise maxima out of every derivative table into one
/// long-format table of `(max_derivative, coverslip)` records.
///
/// With `limit`, only maxima strictly above it are kept. Each value stays
/// paired with its own label.
pub fn get_max_derivatives(tables: &[DerivativeTable], limit: Option<f64>) -> Result<Vec<MaxRecord>> {
    if tables.is_empty() {
        return Err(AnalysisError::EmptyDerivatives);
    }

    let records: Vec<MaxRecord> = tables
        .iter()
        .flat_map(|table| {
            table.column_maxima().into_iter().map(move |max| MaxRecord {
                max_derivative: max,
                coverslip: table.sheet.clone(),
            })
        })
        .filter(|rec| limit.map_or(true, |l| rec.max_derivative > l))
        .collect();

    info!(
        "collected {} max derivative(s) from {} sheet(s)",
        records.len(),
        tables.len()
    );
    Ok(records)
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// Max, mean and median of `values`; `None` for an empty slice.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    Some(Summary {
        count: n,
        max: sorted[n - 1],
        mean: values.iter().sum::<f64>() / n as f64,
        median,
    })
}

/// Per-sheet statistics of the column maxima.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetSummary {
    pub sheet: String,
    pub summary: Summary,
}

pub fn sheet_summaries(tables: &[DerivativeTable]) -> Vec<SheetSummary> {
    tables
        .iter()
        .filter_map(|table| {
            summarize(&table.column_maxima()).map(|summary| SheetSummary {
                sheet: table.sheet.clone(),
                summary,
            })
        })
        .collect()
}

/// Statistics of the maxima grouped by coverslip type.
pub fn group_summaries(records: &[ClassifiedRecord]) -> BTreeMap<CoverslipType, Summary> {
    let mut groups: BTreeMap<CoverslipType, Vec<f64>> = BTreeMap::new();
    for rec in records {
        groups.entry(rec.coverslip_type).or_default().push(rec.max_derivative);
    }
    groups
        .into_iter()
        .filter_map(|(kind, values)| summarize(&values).map(|s| (kind, s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(sheet: &str, values: Vec<Vec<f64>>) -> DerivativeTable {
        let n_cols = values[0].len();
        DerivativeTable {
            sheet: sheet.to_string(),
            columns: (0..n_cols).map(|i| format!("c{i}")).collect(),
            start: 0,
            values,
        }
    }

    fn tables() -> Vec<DerivativeTable> {
        vec![
            table("WT1 10µM", vec![vec![0.1, 0.9, 0.3], vec![0.5, 0.2, 0.4]]),
            table("CTRL1 30µM", vec![vec![0.05, 0.7], vec![0.6, 0.1]]),
        ]
    }

    #[test]
    fn one_record_per_column_with_sheet_label() {
        let records = get_max_derivatives(&tables(), None).unwrap();
        let got: Vec<(f64, &str)> = records
            .iter()
            .map(|r| (r.max_derivative, r.coverslip.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (0.5, "WT1 10µM"),
                (0.9, "WT1 10µM"),
                (0.4, "WT1 10µM"),
                (0.6, "CTRL1 30µM"),
                (0.7, "CTRL1 30µM"),
            ]
        );
    }

    #[test]
    fn limit_filters_values_with_their_labels() {
        let records = get_max_derivatives(&tables(), Some(0.45)).unwrap();
        assert!(records.iter().all(|r| r.max_derivative > 0.45));
        let wt: Vec<f64> = records
            .iter()
            .filter(|r| r.coverslip == "WT1 10µM")
            .map(|r| r.max_derivative)
            .collect();
        assert_eq!(wt, vec![0.5, 0.9]);
        assert_eq!(records.iter().filter(|r| r.coverslip == "CTRL1 30µM").count(), 2);
    }

    #[test]
    fn group_max_equals_column_max() {
        let tables = tables();
        let records = get_max_derivatives(&tables, None).unwrap();
        for t in &tables {
            let group_max = records
                .iter()
                .filter(|r| r.coverslip == t.sheet)
                .map(|r| r.max_derivative)
                .fold(f64::NEG_INFINITY, f64::max);
            let table_max = t.column_maxima().into_iter().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(group_max, table_max);
        }
    }

    #[test]
    fn empty_input_is_a_precondition_error() {
        assert_eq!(get_max_derivatives(&[], None), Err(AnalysisError::EmptyDerivatives));
    }

    #[test]
    fn summary_statistics() {
        let s = summarize(&[3.0, 1.0, 2.0, 10.0]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.max, 10.0);
        assert_eq!(s.mean, 4.0);
        assert_eq!(s.median, 2.5);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn groups_by_coverslip_type() {
        let records = vec![
            ClassifiedRecord {
                max_derivative: 1.0,
                coverslip: "WT1 10µM".into(),
                coverslip_type: CoverslipType::Wt10,
            },
            ClassifiedRecord {
                max_derivative: 3.0,
                coverslip: "WT2 10µM".into(),
                coverslip_type: CoverslipType::Wt10,
            },
            ClassifiedRecord {
                max_derivative: 0.2,
                coverslip: "CTRL1 30µM".into(),
                coverslip_type: CoverslipType::Ctrl30,
            },
        ];
        let groups = group_summaries(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&CoverslipType::Wt10].median, 2.0);
        assert_eq!(groups[&CoverslipType::Ctrl30].count, 1);
    }
}
