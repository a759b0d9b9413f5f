//! Rate-of-rise analysis of calcium-imaging workbooks.
//!
//! Each sheet of a workbook is one coverslip recording (rows are time
//! samples, columns are cells). The pipeline differentiates every cell's
//! trace, keeps each cell's maximum derivative and sorts coverslips into
//! genotype × agonist concentration groups from their sheet names.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;

pub use analysis::auc::{auc, auc_column, IntegrationRule};
pub use analysis::pipeline::{run, PipelineOutput, PipelineRun};
pub use analysis::reclassify::ThresholdPolicy;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
