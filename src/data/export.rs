use std::path::Path;

use anyhow::{Context, Result};

use super::model::{ClassifiedRecord, DerivativeTable};

/// Write the classified long-format table as
/// `max_derivative,coverslip,coverslip_type`.
pub fn write_classified_csv(path: &Path, records: &[ClassifiedRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for rec in records {
        writer.serialize(rec).context("writing classified record")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

/// Write one derivative table: a `row` column with the absolute source row,
/// then one column per cell.
pub fn write_derivatives_csv(path: &Path, table: &DerivativeTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["row".to_string()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header).context("writing header")?;

    for (i, row) in table.values.iter().enumerate() {
        let mut fields = vec![(table.start + i).to_string()];
        fields.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&fields).context("writing derivative row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}
