use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::json;

const FRAMES: usize = 240;
const STIMULUS_FRAME: f64 = 60.0;

/// Fluorescence ratio of one cell: flat baseline, sigmoid rise after the
/// agonist is applied, plus measurement noise.
fn generate_trace(baseline: f64, amplitude: f64, steepness: f64, noise: f64, rng: &mut SimpleRng) -> Vec<f64> {
    (0..FRAMES)
        .map(|t| {
            let rise = amplitude / (1.0 + (-(t as f64 - STIMULUS_FRAME) * steepness).exp());
            baseline + rise + rng.gauss(0.0, noise)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct GeneratedSheet {
    name: String,
    /// Column-major: one trace per cell.
    cells: Vec<Vec<f64>>,
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // (label, mean steepness, cells)
    let coverslips = [
        ("CTRL1 10µM", 0.10, 8),
        ("CTRL2 10µM", 0.11, 6),
        ("CTRL1 30µM", 0.16, 9),
        ("WT1 10µM", 0.20, 10),
        ("WT2 10µM", 0.18, 7),
        ("WT1 30µM", 0.30, 12),
        ("WT2 30µM", 0.28, 8),
    ];

    // Excel's default empty sheet comes first, as in exported workbooks.
    let mut sheets = vec![GeneratedSheet {
        name: "Sheet1".to_string(),
        cells: vec![vec![0.0; FRAMES]],
    }];

    for (label, steepness, n_cells) in coverslips {
        let cells = (0..n_cells)
            .map(|_| {
                let baseline = 0.8 + rng.next_f64() * 0.4;
                let amplitude = 1.0 + rng.next_f64() * 2.0;
                // some wildtype cells barely respond
                let k = if label.starts_with("WT") && rng.next_f64() < 0.2 {
                    steepness * 0.2
                } else {
                    steepness * (0.8 + rng.next_f64() * 0.4)
                };
                generate_trace(baseline, amplitude, k, 0.01, &mut rng)
            })
            .collect();
        sheets.push(GeneratedSheet {
            name: label.to_string(),
            cells,
        });
    }

    write_csv_dir("sample_workbook", &sheets);
    write_json("sample_workbook.json", &sheets);
    write_parquet("sample_workbook.parquet", &sheets);

    println!(
        "Wrote {} sheets ({} frames each) to sample_workbook/, sample_workbook.json and sample_workbook.parquet",
        sheets.len(),
        FRAMES
    );
}

fn cell_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("cell {i}")).collect()
}

fn write_csv_dir(dir: &str, sheets: &[GeneratedSheet]) {
    std::fs::create_dir_all(dir).expect("Failed to create output directory");
    for sheet in sheets {
        let path = std::path::Path::new(dir).join(format!("{}.csv", sheet.name));
        let mut writer = csv::Writer::from_path(&path).expect("Failed to create sheet CSV");
        writer
            .write_record(cell_names(sheet.cells.len()))
            .expect("Failed to write header");
        for t in 0..FRAMES {
            writer
                .write_record(sheet.cells.iter().map(|c| c[t].to_string()))
                .expect("Failed to write row");
        }
        writer.flush().expect("Failed to flush sheet CSV");
    }
}

fn write_json(path: &str, sheets: &[GeneratedSheet]) {
    let sheets_json: Vec<_> = sheets
        .iter()
        .map(|s| {
            let rows: Vec<Vec<f64>> = (0..FRAMES)
                .map(|t| s.cells.iter().map(|c| c[t]).collect())
                .collect();
            json!({ "name": s.name, "columns": cell_names(s.cells.len()), "rows": rows })
        })
        .collect();
    let text = serde_json::to_string(&json!({ "sheets": sheets_json })).expect("Failed to encode JSON");
    std::fs::write(path, text).expect("Failed to write JSON");
}

/// Long format: one row per (sheet, frame); cells a sheet lacks are null.
fn write_parquet(path: &str, sheets: &[GeneratedSheet]) {
    let width = sheets.iter().map(|s| s.cells.len()).max().unwrap_or(0);

    let mut sheet_names: Vec<&str> = Vec::new();
    let mut builders: Vec<Float64Builder> = (0..width).map(|_| Float64Builder::new()).collect();
    for sheet in sheets {
        for t in 0..FRAMES {
            sheet_names.push(&sheet.name);
            for (j, builder) in builders.iter_mut().enumerate() {
                match sheet.cells.get(j) {
                    Some(cell) => builder.append_value(cell[t]),
                    None => builder.append_null(),
                }
            }
        }
    }

    let mut fields = vec![Field::new("sheet", DataType::Utf8, false)];
    fields.extend(cell_names(width).into_iter().map(|n| Field::new(n, DataType::Float64, true)));
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(sheet_names))];
    columns.extend(builders.iter_mut().map(|b| Arc::new(b.finish()) as ArrayRef));

    let batch = RecordBatch::try_new(schema.clone(), columns).expect("Failed to create RecordBatch");

    let file = std::fs::File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}
