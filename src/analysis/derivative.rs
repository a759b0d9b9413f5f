use log::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::data::model::{DerivativeTable, Sheet, Workbook};
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Single sheet
// ---------------------------------------------------------------------------

/// Differentiate every column of `sheet` over the absolute rows `[start, end)`.
///
/// Row 0 of the sheet takes a forward difference and the last row of the
/// range a backward difference, even when the range stops short of the end
/// of the sheet. All other rows use a central difference. Every difference
/// is divided by `2h`.
pub fn differentiate(sheet: &Sheet, h: f64, range: Option<(usize, usize)>) -> Result<DerivativeTable> {
    if !h.is_finite() || h <= 0.0 {
        return Err(AnalysisError::InvalidStepSize(h));
    }

    let rows = sheet.n_rows();
    let (start, end) = range.unwrap_or((0, rows));
    if start >= end || end > rows {
        return Err(AnalysisError::InvalidRowRange {
            sheet: sheet.name.clone(),
            start,
            end,
            rows,
        });
    }
    if end - start < 2 {
        return Err(AnalysisError::TooFewRows {
            sheet: sheet.name.clone(),
            rows: end - start,
        });
    }

    let denom = 2.0 * h;
    let values: Vec<Vec<f64>> = (start..end)
        .map(|j| {
            (0..sheet.n_cols())
                .map(|i| {
                    let x = |r: usize| sheet.value(r, i);
                    if j == 0 {
                        (x(j + 1) - x(j)) / denom
                    } else if j == end - 1 {
                        (x(j) - x(j - 1)) / denom
                    } else {
                        (x(j + 1) - x(j - 1)) / denom
                    }
                })
                .collect()
        })
        .collect();

    Ok(DerivativeTable {
        sheet: sheet.name.clone(),
        columns: sheet.columns.clone(),
        start,
        values,
    })
}

// ---------------------------------------------------------------------------
// Whole workbook
// ---------------------------------------------------------------------------

/// Differentiate every data sheet of the workbook, in sheet order.
///
/// Sheets on the configured skip-list are left out. Fails when nothing is
/// left to differentiate.
pub fn calc_derivatives(workbook: &Workbook, config: &AnalysisConfig) -> Result<Vec<DerivativeTable>> {
    config.validate()?;

    if workbook.len() < 2 {
        warn!(
            "did not get more than one sheet to read ({} found); is that correct?",
            workbook.len()
        );
    }

    let limit = config.debug_sheet_limit.unwrap_or(usize::MAX);
    let mut tables = Vec::new();
    for sheet in workbook.sheets.iter().take(limit) {
        if config.is_skipped(&sheet.name) {
            info!("skipped sheet: {}", sheet.name);
            continue;
        }
        debug!(
            "differentiating '{}' with dim: {} x {}",
            sheet.name,
            sheet.n_rows(),
            sheet.n_cols()
        );
        tables.push(differentiate(sheet, config.step_size, config.row_range)?);
    }

    if tables.is_empty() {
        return Err(AnalysisError::NotEnoughSheets {
            skipped: config.skip_sheets.clone(),
        });
    }
    info!("calculated derivatives for {} sheet(s)", tables.len());
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn sheet(name: &str, cols: &[Vec<f64>]) -> Sheet {
        let n_rows = cols[0].len();
        let rows = (0..n_rows).map(|r| cols.iter().map(|c| c[r]).collect()).collect();
        let columns = (0..cols.len()).map(|i| format!("cell {}", i + 1)).collect();
        Sheet::from_rows(name, columns, rows).unwrap()
    }

    fn squares() -> Sheet {
        sheet(
            "WT1 10µM",
            &[vec![0.0, 1.0, 4.0, 9.0, 16.0, 25.0], vec![2.0, 2.0, 2.0, 2.0, 2.0, 2.0]],
        )
    }

    #[test]
    fn shape_matches_input() {
        let out = differentiate(&squares(), 1.0, None).unwrap();
        assert_eq!(out.n_rows(), 6);
        assert_eq!(out.n_cols(), 2);
        assert_eq!(out.start, 0);
    }

    #[test]
    fn interior_rows_use_central_difference() {
        let s = squares();
        let h = 0.5;
        let out = differentiate(&s, h, None).unwrap();
        for j in 1..5 {
            let expected = (s.value(j + 1, 0) - s.value(j - 1, 0)) / (2.0 * h);
            assert!((out.values[j][0] - expected).abs() < EPS, "row {j}");
            assert!(out.values[j][1].abs() < EPS);
        }
    }

    #[test]
    fn boundaries_use_one_sided_differences() {
        let out = differentiate(&squares(), 1.0, None).unwrap();
        // forward: (1 - 0) / 2
        assert!((out.values[0][0] - 0.5).abs() < EPS);
        // backward: (25 - 16) / 2
        assert!((out.values[5][0] - 4.5).abs() < EPS);
    }

    #[test]
    fn range_end_uses_backward_difference_mid_table() {
        let out = differentiate(&squares(), 1.0, Some((2, 4))).unwrap();
        assert_eq!(out.n_rows(), 2);
        assert_eq!(out.start, 2);
        // row 2 is interior: (9 - 1) / 2
        assert!((out.values[0][0] - 4.0).abs() < EPS);
        // row 3 ends the range: (9 - 4) / 2, not (16 - 4) / 2
        assert!((out.values[1][0] - 2.5).abs() < EPS);
    }

    #[test]
    fn rejects_bad_arguments() {
        let s = squares();
        assert_eq!(
            differentiate(&s, 0.0, None),
            Err(AnalysisError::InvalidStepSize(0.0))
        );
        assert!(matches!(
            differentiate(&s, 1.0, Some((2, 9))),
            Err(AnalysisError::InvalidRowRange { end: 9, rows: 6, .. })
        ));
        assert!(matches!(
            differentiate(&s, 1.0, Some((3, 4))),
            Err(AnalysisError::TooFewRows { rows: 1, .. })
        ));
    }

    #[test]
    fn skip_list_sheets_are_never_differentiated() {
        let workbook = Workbook::from_sheets(vec![
            sheet("Sheet1", &[vec![0.0, 0.0, 0.0]]),
            sheet("CTRL1 10µM", &[vec![0.0, 1.0, 2.0]]),
            sheet("Blank", &[vec![0.0, 0.0, 0.0]]),
        ])
        .unwrap();
        let config = AnalysisConfig {
            skip_sheets: vec!["Sheet1".into(), "Blank".into()],
            ..Default::default()
        };
        let tables = calc_derivatives(&workbook, &config).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].sheet, "CTRL1 10µM");
    }

    #[test]
    fn only_skipped_sheets_is_a_precondition_error() {
        let workbook = Workbook::from_sheets(vec![sheet("Sheet1", &[vec![0.0, 1.0, 2.0]])]).unwrap();
        assert!(matches!(
            calc_derivatives(&workbook, &AnalysisConfig::default()),
            Err(AnalysisError::NotEnoughSheets { .. })
        ));
    }

    #[test]
    fn debug_limit_truncates_sheet_list() {
        let workbook = Workbook::from_sheets(vec![
            sheet("WT1 10µM", &[vec![0.0, 1.0, 2.0]]),
            sheet("WT2 10µM", &[vec![0.0, 1.0, 2.0]]),
            sheet("WT3 10µM", &[vec![0.0, 1.0, 2.0]]),
        ])
        .unwrap();
        let config = AnalysisConfig {
            debug_sheet_limit: Some(2),
            ..Default::default()
        };
        assert_eq!(calc_derivatives(&workbook, &config).unwrap().len(), 2);
    }
}
