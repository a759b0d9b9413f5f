use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{Sheet, Workbook};

/// Name of the column holding the sheet label in long-format files.
pub const SHEET_COLUMN: &str = "sheet";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a workbook from a directory or a file.  Dispatch by extension.
///
/// Supported layouts:
/// * directory  – every `*.csv` inside is one sheet, named after its file stem
/// * `.csv`     – long format: a `sheet` column plus one numeric column per cell
/// * `.json`    – `{ "sheets": [{ "name": ..., "columns": [...], "rows": [[...]] }] }`
/// * `.parquet` – same long format as `.csv`
pub fn load_workbook(path: &Path) -> Result<Workbook> {
    if path.is_dir() {
        return load_csv_dir(path);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_long_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Directory of per-sheet CSV files
// ---------------------------------------------------------------------------

fn load_csv_dir(dir: &Path) -> Result<Workbook> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        bail!("No .csv sheets found in {}", dir.display());
    }

    let sheets = paths
        .iter()
        .map(|p| load_sheet_csv(p))
        .collect::<Result<Vec<_>>>()?;
    Workbook::from_sheets(sheets)
}

/// One sheet per file: header row of cell ids, then one row per time sample.
fn load_sheet_csv(path: &Path) -> Result<Sheet> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("sheet file name {} is not valid UTF-8", path.display()))?
        .to_string();

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening sheet {}", path.display()))?;
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Sheet '{name}', CSV row {row_no}"))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(j, cell)| parse_cell(cell, &name, row_no, j))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    debug!("read sheet '{name}' ({} rows, {} columns)", rows.len(), columns.len());
    Sheet::from_rows(name, columns, rows)
}

/// Parse one sample; `NaN` and infinities are rejected like any other text.
fn parse_cell(cell: &str, sheet: &str, row: usize, col: usize) -> Result<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .with_context(|| format!("Sheet '{sheet}', row {row}, column {col}: '{cell}' is not a number"))
}

// ---------------------------------------------------------------------------
// Long format (shared by CSV and Parquet)
// ---------------------------------------------------------------------------

/// Accumulates long-format rows and splits them back into sheets.
///
/// Sheets keep the order in which they first appear. A column that is empty
/// for every row of a sheet is dropped from that sheet, so sheets with fewer
/// cells can share one file with wider ones.
struct LongTable {
    columns: Vec<String>,
    sheets: Vec<(String, Vec<Vec<Option<f64>>>)>,
}

impl LongTable {
    fn new(columns: Vec<String>) -> Self {
        LongTable {
            columns,
            sheets: Vec::new(),
        }
    }

    fn push(&mut self, sheet: &str, row: Vec<Option<f64>>) {
        match self.sheets.iter_mut().find(|(name, _)| name == sheet) {
            Some((_, rows)) => rows.push(row),
            None => self.sheets.push((sheet.to_string(), vec![row])),
        }
    }

    fn into_workbook(self) -> Result<Workbook> {
        let mut sheets = Vec::with_capacity(self.sheets.len());
        for (name, rows) in self.sheets {
            let keep: Vec<usize> = (0..self.columns.len())
                .filter(|&j| rows.iter().any(|r| r[j].is_some()))
                .collect();

            let mut dense = Vec::with_capacity(rows.len());
            for (row_no, row) in rows.iter().enumerate() {
                let values = keep
                    .iter()
                    .map(|&j| {
                        row[j].with_context(|| {
                            format!(
                                "Sheet '{name}', row {row_no}: missing value in column '{}'",
                                self.columns[j]
                            )
                        })
                    })
                    .collect::<Result<Vec<f64>>>()?;
                dense.push(values);
            }

            let columns = keep.iter().map(|&j| self.columns[j].clone()).collect();
            sheets.push(Sheet::from_rows(name, columns, dense)?);
        }
        Workbook::from_sheets(sheets)
    }
}

// ---------------------------------------------------------------------------
// Long-format CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with a `sheet` column; every other column is one
/// cell's trace. Empty cells mark cells a sheet does not have.
fn load_long_csv(path: &Path) -> Result<Workbook> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let sheet_idx = headers
        .iter()
        .position(|h| h == SHEET_COLUMN)
        .context("CSV missing 'sheet' column")?;
    let value_cols: Vec<usize> = (0..headers.len()).filter(|&j| j != sheet_idx).collect();

    let mut table = LongTable::new(value_cols.iter().map(|&j| headers[j].clone()).collect());

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let sheet = record.get(sheet_idx).unwrap_or("").trim().to_string();
        if sheet.is_empty() {
            bail!("CSV row {row_no}: empty sheet name");
        }
        let row = value_cols
            .iter()
            .map(|&j| {
                let cell = record.get(j).unwrap_or("").trim();
                if cell.is_empty() {
                    Ok(None)
                } else {
                    parse_cell(cell, &sheet, row_no, j).map(Some)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        table.push(&sheet, row);
    }

    table.into_workbook()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JsonWorkbook {
    sheets: Vec<JsonSheet>,
}

#[derive(Debug, Deserialize)]
struct JsonSheet {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

/// Expected JSON schema:
///
/// ```json
/// {
///   "sheets": [
///     { "name": "WT1 10µM", "columns": ["cell 1", "cell 2"], "rows": [[0.1, 0.2], [0.3, 0.4]] }
///   ]
/// }
/// ```
fn load_json(path: &Path) -> Result<Workbook> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonWorkbook = serde_json::from_str(&text).context("parsing JSON workbook")?;

    let sheets = root
        .sheets
        .into_iter()
        .map(|s| Sheet::from_rows(s.name, s.columns, s.rows))
        .collect::<Result<Vec<_>>>()?;
    Workbook::from_sheets(sheets)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a long-format Parquet file.
///
/// Expected schema:
/// - `sheet`: Utf8 / LargeUtf8 – sheet label of the row
/// - any other column: Float64, Float32, Int64 or Int32 – one cell's trace,
///   nulls where a sheet lacks that cell
///
/// Works with `pd.concat(sheets, names=["sheet"]).reset_index().to_parquet()`.
fn load_parquet(path: &Path) -> Result<Workbook> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let schema = builder.schema().clone();
    let sheet_idx = schema
        .index_of(SHEET_COLUMN)
        .map_err(|_| anyhow::anyhow!("Parquet file missing 'sheet' column"))?;
    let value_cols: Vec<(usize, String)> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != sheet_idx)
        .map(|(i, f)| (i, f.name().clone()))
        .collect();

    let mut table = LongTable::new(value_cols.iter().map(|(_, n)| n.clone()).collect());
    let reader = builder.build().context("building parquet reader")?;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let sheet_col = batch.column(sheet_idx);

        for row in 0..batch.num_rows() {
            let sheet = extract_string(sheet_col, row)
                .with_context(|| format!("Row {row}: failed to read 'sheet'"))?;
            let values = value_cols
                .iter()
                .map(|(idx, name)| {
                    extract_f64(batch.column(*idx), row)
                        .with_context(|| format!("Row {row}: failed to read '{name}'"))
                })
                .collect::<Result<Vec<_>>>()?;
            table.push(&sheet, values);
        }
    }

    table.into_workbook()
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null sheet name");
    }
    match col.data_type() {
        DataType::Utf8 => Ok(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected Utf8 sheet column, got {other:?}"),
    }
}

/// Read one numeric cell; nulls become `None`.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<Option<f64>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?
            .value(row),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .context("expected Float32Array")?
            .value(row) as f64,
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .value(row) as f64,
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .value(row) as f64,
        other => bail!("Expected numeric column, got {other:?}"),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_table_drops_columns_a_sheet_lacks() {
        let mut table = LongTable::new(vec!["c1".into(), "c2".into()]);
        table.push("WT1 10µM", vec![Some(1.0), Some(2.0)]);
        table.push("CTRL1 10µM", vec![Some(5.0), None]);
        table.push("WT1 10µM", vec![Some(3.0), Some(4.0)]);
        table.push("CTRL1 10µM", vec![Some(6.0), None]);

        let wb = table.into_workbook().unwrap();
        assert_eq!(wb.sheet_names(), vec!["WT1 10µM", "CTRL1 10µM"]);
        assert_eq!(wb.sheets[0].rows, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(wb.sheets[1].columns, vec!["c1".to_string()]);
        assert_eq!(wb.sheets[1].rows, vec![vec![5.0], vec![6.0]]);
    }

    #[test]
    fn long_table_rejects_gaps() {
        let mut table = LongTable::new(vec!["c1".into()]);
        table.push("WT1 10µM", vec![Some(1.0)]);
        table.push("WT1 10µM", vec![None]);
        let err = table.into_workbook().unwrap_err();
        assert!(err.to_string().contains("missing value"));
    }

    #[test]
    fn unsupported_extension() {
        let err = load_workbook(Path::new("recording.xls")).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }
}
