use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;

use rusty_calcium::data::export::write_classified_csv;
use rusty_calcium::data::loader::load_workbook;
use rusty_calcium::{AnalysisConfig, auc_column};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        let program = args.first().map_or("ca-analyze", String::as_str);
        bail!("Usage: {program} <workbook> [config.json]");
    }
    let input = PathBuf::from(&args[1]);
    let config = match args.get(2) {
        Some(path) => AnalysisConfig::from_json_file(Path::new(path))?,
        None => AnalysisConfig::default(),
    };

    let workbook = load_workbook(&input).with_context(|| format!("loading {}", input.display()))?;
    info!("Loaded {} sheets: {:?}", workbook.len(), workbook.sheet_names());

    let output = rusty_calcium::run(&workbook, &config)?;

    println!("{:<14} {:>5} {:>10} {:>10} {:>10}", "group", "n", "max", "mean", "median");
    for (kind, s) in &output.group_summaries {
        println!(
            "{:<14} {:>5} {:>10.4} {:>10.4} {:>10.4}",
            kind.to_string(),
            s.count,
            s.max,
            s.mean,
            s.median
        );
    }

    // Area under each raw trace of the processed sheets
    for table in &output.derivatives {
        let Some(sheet) = workbook.get(&table.sheet) else {
            continue;
        };
        let areas = sheet
            .columns
            .iter()
            .map(|c| auc_column(sheet, c, config.rule, config.dx))
            .collect::<rusty_calcium::Result<Vec<f64>>>()?;
        let mean = areas.iter().sum::<f64>() / areas.len().max(1) as f64;
        info!("{}: mean {} AUC {mean:.3} over {} cells", sheet.name, config.rule, areas.len());
    }

    let out_path = classified_path(&input)?;
    write_classified_csv(&out_path, &output.classified.records)?;
    info!(
        "Wrote {} classified records to {}",
        output.classified.len(),
        out_path.display()
    );
    Ok(())
}

/// `data/run.json` → `data/run_classified.csv`; a sheet folder `data/run/`
/// gets `data/run_classified.csv` beside it, never inside where the next
/// run would pick it up as a sheet.
fn classified_path(input: &Path) -> Result<PathBuf> {
    let input = if input.is_dir() {
        input
            .canonicalize()
            .with_context(|| format!("resolving {}", input.display()))?
    } else {
        input.to_path_buf()
    };
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", input.display()))?;
    Ok(input.with_file_name(format!("{stem}_classified.csv")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_input_gets_a_sibling_csv() {
        let path = classified_path(Path::new("data/run.json")).unwrap();
        assert_eq!(path, PathBuf::from("data/run_classified.csv"));
    }

    #[test]
    fn sheet_folder_output_lands_beside_it() {
        let root = tempfile::tempdir().unwrap();
        let sheets = root.path().join("run");
        std::fs::create_dir(&sheets).unwrap();

        let path = classified_path(&sheets).unwrap();
        assert_eq!(path, root.path().canonicalize().unwrap().join("run_classified.csv"));

        // `run/.` names the same folder
        let path = classified_path(&sheets.join(".")).unwrap();
        assert_eq!(path.file_name().unwrap(), "run_classified.csv");
        assert_ne!(path.parent(), Some(sheets.canonicalize().unwrap().as_path()));
    }
}
