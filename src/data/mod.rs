/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///  dir of .csv / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Workbook
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Workbook  │  Vec<Sheet>, one per coverslip
///   └──────────┘
///        │   (analysis)
///        ▼
///   ┌────────────────┐
///   │ ClassifiedTable │──► filter (visible indices) / export (.csv)
///   └────────────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
