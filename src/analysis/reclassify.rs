//! Coverslip reclassification by genotype and agonist concentration.
//!
//! Labels are sheet names such as `"WT2 30µM"` or `"CTRL1 10µM"`. The
//! patterns below match the entire label, so they must be adjusted if the
//! naming convention of the recordings changes.

use std::sync::LazyLock;

use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::data::model::{ClassifiedRecord, CoverslipType, MaxRecord};
use crate::error::{AnalysisError, Result};

static CTRL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^CTRL[0-9A-Za-zµ ]*$").expect("valid control pattern"));

static WT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^WT[0-9A-Za-zµ ]*$").expect("valid wildtype pattern"));

static TEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9A-Za-z ]*10µM$").expect("valid 10µM pattern"));

static THIRTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9A-Za-z ]*30µM$").expect("valid 30µM pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Genotype {
    Control,
    Wildtype,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Concentration {
    Ten,
    Thirty,
}

/// Which threshold a wildtype coverslip is compared against when excluding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Both 10µM and 30µM are compared against the low threshold.
    #[default]
    LowForBoth,
    /// 10µM against the low threshold, 30µM against the high one.
    PerConcentration,
}

/// Exclusion settings for wildtype coverslips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exclusion {
    pub threshold: (f64, f64),
    pub policy: ThresholdPolicy,
}

impl Exclusion {
    fn threshold_for(&self, concentration: Concentration) -> f64 {
        match (self.policy, concentration) {
            (ThresholdPolicy::LowForBoth, _) | (ThresholdPolicy::PerConcentration, Concentration::Ten) => {
                self.threshold.0
            }
            (ThresholdPolicy::PerConcentration, Concentration::Thirty) => self.threshold.1,
        }
    }
}

fn genotype(index: usize, label: &str) -> Result<Genotype> {
    if CTRL_RE.is_match(label) {
        Ok(Genotype::Control)
    } else if WT_RE.is_match(label) {
        Ok(Genotype::Wildtype)
    } else {
        Err(AnalysisError::UnknownGenotype {
            index,
            label: label.to_string(),
        })
    }
}

fn concentration(index: usize, label: &str) -> Result<Concentration> {
    if TEN_RE.is_match(label) {
        Ok(Concentration::Ten)
    } else if THIRTY_RE.is_match(label) {
        Ok(Concentration::Thirty)
    } else {
        Err(AnalysisError::UnknownConcentration {
            index,
            label: label.to_string(),
        })
    }
}

/// Classify a single record. `index` is only used for error context.
pub fn classify(index: usize, record: &MaxRecord, exclusion: Option<&Exclusion>) -> Result<CoverslipType> {
    let label = record.coverslip.as_str();
    let genotype = genotype(index, label)?;
    let concentration = concentration(index, label)?;

    let kind = match (genotype, concentration) {
        (Genotype::Control, Concentration::Ten) => CoverslipType::Ctrl10,
        (Genotype::Control, Concentration::Thirty) => CoverslipType::Ctrl30,
        (Genotype::Wildtype, c) => {
            let below = exclusion.is_some_and(|ex| record.max_derivative < ex.threshold_for(c));
            match c {
                _ if below => CoverslipType::Excluded,
                Concentration::Ten => CoverslipType::Wt10,
                Concentration::Thirty => CoverslipType::Wt30,
            }
        }
    };
    Ok(kind)
}

/// Classify every record of the long-format table.
///
/// The first label that matches no genotype or no concentration aborts the
/// whole pass; no partial table is returned.
pub fn concat_coverslips(records: &[MaxRecord], exclusion: Option<&Exclusion>) -> Result<Vec<ClassifiedRecord>> {
    let classified = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            classify(i, rec, exclusion).map(|coverslip_type| ClassifiedRecord {
                max_derivative: rec.max_derivative,
                coverslip: rec.coverslip.clone(),
                coverslip_type,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let excluded = classified
        .iter()
        .filter(|r| r.coverslip_type == CoverslipType::Excluded)
        .count();
    info!("classified {} record(s), {excluded} excluded", classified.len());
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(value: f64, label: &str) -> MaxRecord {
        MaxRecord {
            max_derivative: value,
            coverslip: label.to_string(),
        }
    }

    fn exclusion(policy: ThresholdPolicy) -> Exclusion {
        Exclusion {
            threshold: (0.4, 0.6),
            policy,
        }
    }

    #[test]
    fn wildtype_without_exclusion() {
        assert_eq!(classify(0, &rec(0.1, "WT1 30µM"), None), Ok(CoverslipType::Wt30));
        assert_eq!(classify(0, &rec(0.1, "WT3 10µM"), None), Ok(CoverslipType::Wt10));
    }

    #[test]
    fn control_is_never_excluded() {
        let ex = exclusion(ThresholdPolicy::LowForBoth);
        assert_eq!(classify(0, &rec(0.0, "CTRL2 10µM"), None), Ok(CoverslipType::Ctrl10));
        assert_eq!(classify(0, &rec(0.0, "CTRL2 10µM"), Some(&ex)), Ok(CoverslipType::Ctrl10));
        assert_eq!(classify(0, &rec(0.0, "CTRL 30µM"), Some(&ex)), Ok(CoverslipType::Ctrl30));
    }

    #[test]
    fn low_threshold_applies_to_both_concentrations() {
        let ex = exclusion(ThresholdPolicy::LowForBoth);
        assert_eq!(classify(0, &rec(0.3, "WT1 10µM"), Some(&ex)), Ok(CoverslipType::Excluded));
        assert_eq!(classify(0, &rec(0.3, "WT1 30µM"), Some(&ex)), Ok(CoverslipType::Excluded));
        // 0.5 sits between low and high: kept for both
        assert_eq!(classify(0, &rec(0.5, "WT1 10µM"), Some(&ex)), Ok(CoverslipType::Wt10));
        assert_eq!(classify(0, &rec(0.5, "WT1 30µM"), Some(&ex)), Ok(CoverslipType::Wt30));
        // exactly at the threshold is kept
        assert_eq!(classify(0, &rec(0.4, "WT1 30µM"), Some(&ex)), Ok(CoverslipType::Wt30));
    }

    #[test]
    fn per_concentration_threshold_uses_high_for_thirty() {
        let ex = exclusion(ThresholdPolicy::PerConcentration);
        assert_eq!(classify(0, &rec(0.5, "WT1 10µM"), Some(&ex)), Ok(CoverslipType::Wt10));
        assert_eq!(classify(0, &rec(0.5, "WT1 30µM"), Some(&ex)), Ok(CoverslipType::Excluded));
    }

    #[test]
    fn unknown_genotype_aborts_the_pass() {
        let records = vec![rec(0.5, "WT1 10µM"), rec(0.5, "MUT 10µM")];
        assert_eq!(
            concat_coverslips(&records, None),
            Err(AnalysisError::UnknownGenotype {
                index: 1,
                label: "MUT 10µM".to_string()
            })
        );
    }

    #[test]
    fn unknown_concentration_is_reported_with_context() {
        assert_eq!(
            classify(4, &rec(0.5, "CTRL1 50µM"), None),
            Err(AnalysisError::UnknownConcentration {
                index: 4,
                label: "CTRL1 50µM".to_string()
            })
        );
    }

    #[test]
    fn label_must_match_entirely() {
        assert!(classify(0, &rec(0.5, "xWT1 10µM"), None).is_err());
        assert!(classify(0, &rec(0.5, "WT1 10µM-b"), None).is_err());
    }

    #[test]
    fn input_is_copied_not_mutated() {
        let records = vec![rec(0.7, "WT1 10µM"), rec(0.2, "CTRL1 30µM")];
        let before = records.clone();
        let out = concat_coverslips(&records, None).unwrap();
        assert_eq!(records, before);
        assert_eq!(out[0].coverslip_type, CoverslipType::Wt10);
        assert_eq!(out[1].coverslip_type, CoverslipType::Ctrl30);
        assert_eq!(out[1].coverslip, "CTRL1 30µM");
    }
}
