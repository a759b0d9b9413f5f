use std::collections::BTreeMap;

use log::info;

use super::aggregate::{self, SheetSummary, Summary};
use super::derivative;
use super::reclassify::{self, Exclusion};
use crate::config::AnalysisConfig;
use crate::data::model::{ClassifiedTable, CoverslipType, DerivativeTable, MaxRecord, Workbook};
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Stage-by-stage run context
// ---------------------------------------------------------------------------

/// Outputs of one analysis run, filled in stage by stage.
///
/// Each stage consumes the run and hands back a new one. Re-running a stage
/// drops everything downstream of it, so later outputs never go stale.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    config: AnalysisConfig,
    derivatives: Option<Vec<DerivativeTable>>,
    max_table: Option<Vec<MaxRecord>>,
    classified: Option<ClassifiedTable>,
}

impl PipelineRun {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            derivatives: None,
            max_table: None,
            classified: None,
        })
    }

    pub fn calc_derivatives(self, workbook: &Workbook) -> Result<Self> {
        let derivatives = derivative::calc_derivatives(workbook, &self.config)?;
        Ok(Self {
            derivatives: Some(derivatives),
            max_table: None,
            classified: None,
            ..self
        })
    }

    pub fn get_max_derivatives(self) -> Result<Self> {
        let max_table = aggregate::get_max_derivatives(self.derivatives()?, self.config.limit)?;
        Ok(Self {
            max_table: Some(max_table),
            classified: None,
            ..self
        })
    }

    pub fn concat_coverslips(self) -> Result<Self> {
        let exclusion = self.config.exclude.then(|| Exclusion {
            threshold: self.config.threshold,
            policy: self.config.threshold_policy,
        });
        let records = reclassify::concat_coverslips(self.max_table()?, exclusion.as_ref())?;
        Ok(Self {
            classified: Some(ClassifiedTable::from_records(records)),
            ..self
        })
    }

    pub fn derivatives(&self) -> Result<&[DerivativeTable]> {
        self.derivatives.as_deref().ok_or(AnalysisError::MissingStage {
            stage: "get_max_derivatives",
            requires: "calc_derivatives",
        })
    }

    pub fn max_table(&self) -> Result<&[MaxRecord]> {
        self.max_table.as_deref().ok_or(AnalysisError::MissingStage {
            stage: "concat_coverslips",
            requires: "get_max_derivatives",
        })
    }

    pub fn classified(&self) -> Result<&ClassifiedTable> {
        self.classified.as_ref().ok_or(AnalysisError::MissingStage {
            stage: "report",
            requires: "concat_coverslips",
        })
    }

    /// Collect the finished run; fails if any stage has not run.
    pub fn finish(self) -> Result<PipelineOutput> {
        let classified = self.classified()?.clone();
        let derivatives = self.derivatives()?.to_vec();
        let max_table = self.max_table()?.to_vec();
        Ok(PipelineOutput {
            sheet_summaries: aggregate::sheet_summaries(&derivatives),
            group_summaries: aggregate::group_summaries(&classified.records),
            derivatives,
            max_table,
            classified,
        })
    }
}

// ---------------------------------------------------------------------------
// One-shot run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub derivatives: Vec<DerivativeTable>,
    pub max_table: Vec<MaxRecord>,
    pub classified: ClassifiedTable,
    pub sheet_summaries: Vec<SheetSummary>,
    pub group_summaries: BTreeMap<CoverslipType, Summary>,
}

/// Run every stage over `workbook` and log the per-sheet summaries.
pub fn run(workbook: &Workbook, config: &AnalysisConfig) -> Result<PipelineOutput> {
    let output = PipelineRun::new(config.clone())?
        .calc_derivatives(workbook)?
        .get_max_derivatives()?
        .concat_coverslips()?
        .finish()?;

    for s in &output.sheet_summaries {
        info!(
            "{} max value: {:.4}, mean value: {:.4}, median: {:.4}",
            s.sheet, s.summary.max, s.summary.mean, s.summary.median
        );
    }
    Ok(output)
}
