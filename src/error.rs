use thiserror::Error;

/// Errors raised by the analysis stages.
///
/// Precondition and pattern errors abort the stage that raised them; argument
/// errors are reported before any computation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    // -- preconditions --
    #[error("no usable sheets left after skipping {skipped:?}")]
    NotEnoughSheets { skipped: Vec<String> },

    #[error("no derivative tables to aggregate")]
    EmptyDerivatives,

    #[error("stage '{stage}' needs '{requires}' to run first")]
    MissingStage {
        stage: &'static str,
        requires: &'static str,
    },

    // -- label patterns --
    #[error("record {index}: could not match a genotype pattern in '{label}'")]
    UnknownGenotype { index: usize, label: String },

    #[error("record {index}: could not match an agonist pattern in '{label}'")]
    UnknownConcentration { index: usize, label: String },

    // -- invalid arguments --
    #[error("step size must be finite and > 0, got {0}")]
    InvalidStepSize(f64),

    #[error("invalid row range [{start}, {end}) for sheet '{sheet}' with {rows} rows")]
    InvalidRowRange {
        sheet: String,
        start: usize,
        end: usize,
        rows: usize,
    },

    #[error("sheet '{sheet}' has {rows} row(s) in range; at least 2 are needed")]
    TooFewRows { sheet: String, rows: usize },

    #[error("threshold pair ({low}, {high}) must be finite with low <= high")]
    InvalidThreshold { low: f64, high: f64 },

    #[error("unknown integration rule '{0}' (expected 'trapezoidal' or 'simpson')")]
    UnknownRule(String),

    #[error("sample spacing must be finite and > 0, got {0}")]
    InvalidSpacing(f64),

    #[error("sheet '{sheet}' has no column '{column}'")]
    UnknownColumn { sheet: String, column: String },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
