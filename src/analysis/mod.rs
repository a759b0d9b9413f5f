/// Analysis layer: derivatives, maxima, reclassification and AUC.
///
/// Architecture:
/// ```text
///   Workbook (sheets)
///        │
///        ▼
///   ┌────────────┐
///   │ derivative │  centered finite differences per column
///   └────────────┘
///        │  Vec<DerivativeTable>
///        ▼
///   ┌───────────┐
///   │ aggregate │  column maxima → long-format MaxRecords
///   └───────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ reclassify │  genotype / concentration → CoverslipType
///   └────────────┘
///        │
///        ▼
///   ClassifiedTable ──► viewer / CSV export
/// ```
///
/// `auc` stands apart: it integrates single columns of raw sheets.

pub mod aggregate;
pub mod auc;
pub mod derivative;
pub mod pipeline;
pub mod reclassify;
