use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sheet – one recording (coverslip) of the workbook
// ---------------------------------------------------------------------------

/// One named sheet: rows are time samples, columns are imaged cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    /// Header row (column identifiers).
    pub columns: Vec<String>,
    /// Row-major samples; every row is `columns.len()` wide.
    pub rows: Vec<Vec<f64>>,
}

impl Sheet {
    /// Build a sheet, rejecting ragged rows and non-finite samples.
    pub fn from_rows(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let name = name.into();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                bail!(
                    "Sheet '{name}', row {i}: expected {} values but found {}",
                    columns.len(),
                    row.len()
                );
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                bail!(
                    "Sheet '{name}', row {i}, column {j}: '{}' is not a number",
                    row[j]
                );
            }
        }
        Ok(Sheet { name, columns, rows })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Copy out one column as a contiguous series.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[col]).collect()
    }
}

// ---------------------------------------------------------------------------
// Workbook – ordered collection of sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Build a workbook; sheet names must be unique.
    pub fn from_sheets(sheets: Vec<Sheet>) -> Result<Self> {
        let mut seen = HashSet::new();
        for sheet in &sheets {
            if !seen.insert(sheet.name.as_str()) {
                bail!("Duplicate sheet name '{}'", sheet.name);
            }
        }
        Ok(Workbook { sheets })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DerivativeTable – finite-difference output for one sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeTable {
    /// Name of the source sheet; doubles as the coverslip label.
    pub sheet: String,
    pub columns: Vec<String>,
    /// Absolute index of the first source row covered.
    pub start: usize,
    /// Row-major derivatives, `(end - start) x columns.len()`.
    pub values: Vec<Vec<f64>>,
}

impl DerivativeTable {
    pub fn n_rows(&self) -> usize {
        self.values.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Maximum over rows of one column (NaN-ignoring).
    pub fn column_max(&self, col: usize) -> f64 {
        self.values
            .iter()
            .map(|row| row[col])
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Column-wise maxima, in column order.
    pub fn column_maxima(&self) -> Vec<f64> {
        (0..self.n_cols()).map(|c| self.column_max(c)).collect()
    }
}

// ---------------------------------------------------------------------------
// Long-format records
// ---------------------------------------------------------------------------

/// One cell's maximum derivative, labelled with its coverslip (sheet name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxRecord {
    pub max_derivative: f64,
    pub coverslip: String,
}

/// Genotype × agonist concentration bucket of a coverslip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CoverslipType {
    #[serde(rename = "CTRL 10µM")]
    Ctrl10,
    #[serde(rename = "CTRL 30µM")]
    Ctrl30,
    #[serde(rename = "WT 10µM")]
    Wt10,
    #[serde(rename = "WT 30µM")]
    Wt30,
    #[serde(rename = "EXCLUDED")]
    Excluded,
}

impl CoverslipType {
    pub const ALL: [CoverslipType; 5] = [
        CoverslipType::Ctrl10,
        CoverslipType::Ctrl30,
        CoverslipType::Wt10,
        CoverslipType::Wt30,
        CoverslipType::Excluded,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CoverslipType::Ctrl10 => "CTRL 10µM",
            CoverslipType::Ctrl30 => "CTRL 30µM",
            CoverslipType::Wt10 => "WT 10µM",
            CoverslipType::Wt30 => "WT 30µM",
            CoverslipType::Excluded => "EXCLUDED",
        }
    }
}

impl fmt::Display for CoverslipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A [`MaxRecord`] with its derived coverslip type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub max_derivative: f64,
    pub coverslip: String,
    pub coverslip_type: CoverslipType,
}

// ---------------------------------------------------------------------------
// ClassifiedTable – the output handed to the viewer and exporters
// ---------------------------------------------------------------------------

/// Column names usable for grouping/filtering the classified table.
pub const COVERSLIP_COLUMN: &str = "coverslip";
pub const COVERSLIP_TYPE_COLUMN: &str = "coverslip_type";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedTable {
    pub records: Vec<ClassifiedRecord>,
    /// For each categorical column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<String>>,
}

impl ClassifiedTable {
    /// Build column indices from the classified records.
    pub fn from_records(records: Vec<ClassifiedRecord>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for rec in &records {
            for column in [COVERSLIP_COLUMN, COVERSLIP_TYPE_COLUMN] {
                if let Some(val) = Self::value_of(rec, column) {
                    unique_values.entry(column.to_string()).or_default().insert(val);
                }
            }
        }
        ClassifiedTable {
            records,
            unique_values,
        }
    }

    /// Categorical value of `record` in `column`, if the column exists.
    pub fn value_of(record: &ClassifiedRecord, column: &str) -> Option<String> {
        match column {
            COVERSLIP_COLUMN => Some(record.coverslip.clone()),
            COVERSLIP_TYPE_COLUMN => Some(record.coverslip_type.to_string()),
            _ => None,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.unique_values.keys().cloned().collect()
    }

    /// Category order on a plot axis: coverslip types in their fixed
    /// order, any other column sorted by label.
    pub fn category_order(&self, column: &str) -> Vec<String> {
        if column == COVERSLIP_TYPE_COLUMN {
            return CoverslipType::ALL.iter().map(|t| t.to_string()).collect();
        }
        self.unique_values
            .get(column)
            .map(|vals| vals.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Maxima of the records at `indices`, grouped by their value in
    /// `column` and laid out in [`category_order`](Self::category_order).
    /// Empty groups are left out.
    pub fn grouped_maxima(&self, column: &str, indices: &[usize]) -> Vec<(String, Vec<f64>)> {
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for rec in indices.iter().filter_map(|&i| self.records.get(i)) {
            if let Some(key) = Self::value_of(rec, column) {
                groups.entry(key).or_default().push(rec.max_derivative);
            }
        }
        self.category_order(column)
            .into_iter()
            .filter_map(|cat| groups.remove(&cat).map(|values| (cat, values)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Sheet::from_rows("s", vec!["a".into(), "b".into()], vec![vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("expected 2 values"));
    }

    #[test]
    fn duplicate_sheet_names_are_rejected() {
        let s = Sheet::from_rows("WT1 10µM", vec!["a".into()], vec![vec![1.0]]).unwrap();
        assert!(Workbook::from_sheets(vec![s.clone(), s]).is_err());
    }

    #[test]
    fn column_max_scans_all_rows() {
        let table = DerivativeTable {
            sheet: "s".into(),
            columns: vec!["a".into(), "b".into()],
            start: 0,
            values: vec![vec![0.1, 3.0], vec![0.7, -1.0], vec![0.2, 2.0]],
        };
        assert_eq!(table.column_maxima(), vec![0.7, 3.0]);
    }

    #[test]
    fn non_finite_samples_are_rejected() {
        let err = Sheet::from_rows("WT1 10µM", vec!["a".into()], vec![vec![0.0], vec![f64::NAN]]).unwrap_err();
        assert!(err.to_string().contains("is not a number"));
        assert!(Sheet::from_rows("WT1 10µM", vec!["a".into()], vec![vec![f64::INFINITY]]).is_err());
    }

    fn two_coverslips() -> ClassifiedTable {
        let rec = |v: f64, label: &str, kind| ClassifiedRecord {
            max_derivative: v,
            coverslip: label.to_string(),
            coverslip_type: kind,
        };
        ClassifiedTable::from_records(vec![
            rec(0.9, "WT1 10µM", CoverslipType::Wt10),
            rec(0.3, "CTRL1 30µM", CoverslipType::Ctrl30),
            rec(0.5, "WT1 10µM", CoverslipType::Wt10),
        ])
    }

    #[test]
    fn groups_by_type_in_fixed_order() {
        let table = two_coverslips();
        let groups = table.grouped_maxima(COVERSLIP_TYPE_COLUMN, &[0, 1, 2]);
        assert_eq!(
            groups,
            vec![
                ("CTRL 30µM".to_string(), vec![0.3]),
                ("WT 10µM".to_string(), vec![0.9, 0.5]),
            ]
        );
    }

    #[test]
    fn groups_by_raw_coverslip_label() {
        let table = two_coverslips();
        assert_eq!(
            table.column_names(),
            vec![COVERSLIP_COLUMN.to_string(), COVERSLIP_TYPE_COLUMN.to_string()]
        );
        let groups = table.grouped_maxima(COVERSLIP_COLUMN, &[0, 1]);
        assert_eq!(
            groups,
            vec![
                ("CTRL1 30µM".to_string(), vec![0.3]),
                ("WT1 10µM".to_string(), vec![0.9]),
            ]
        );
        assert!(table.grouped_maxima("unknown", &[0, 1, 2]).is_empty());
    }

    #[test]
    fn classified_table_indexes_both_columns() {
        let table = ClassifiedTable::from_records(vec![
            ClassifiedRecord {
                max_derivative: 0.5,
                coverslip: "WT1 10µM".into(),
                coverslip_type: CoverslipType::Wt10,
            },
            ClassifiedRecord {
                max_derivative: 0.9,
                coverslip: "WT2 10µM".into(),
                coverslip_type: CoverslipType::Wt10,
            },
        ]);
        assert_eq!(table.unique_values[COVERSLIP_COLUMN].len(), 2);
        assert_eq!(table.unique_values[COVERSLIP_TYPE_COLUMN].len(), 1);
        assert!(table.unique_values[COVERSLIP_TYPE_COLUMN].contains("WT 10µM"));
    }
}
