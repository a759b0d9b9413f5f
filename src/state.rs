use std::collections::BTreeSet;
use std::path::PathBuf;

use rusty_calcium::data::filter::{FilterState, filtered_indices, init_filter_state};
use rusty_calcium::data::model::{COVERSLIP_TYPE_COLUMN, Workbook};
use rusty_calcium::{AnalysisConfig, PipelineOutput};

use crate::color::ColorMap;

/// What the central panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotView {
    /// Derivative traces of one sheet.
    Derivatives,
    /// Max derivatives grouped by a categorical column.
    MaxDerivatives,
}

/// How grouped maxima are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Box,
    Point,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded workbook (None until user opens one).
    pub workbook: Option<Workbook>,
    pub source: Option<PathBuf>,

    /// Settings being edited; applied on the next run.
    pub config: AnalysisConfig,

    /// Latest successful run.
    pub output: Option<PipelineOutput>,

    /// Per-column filter selections over the classified table.
    pub filters: FilterState,

    /// Indices of classified records passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    pub view: PlotView,
    pub kind: PlotKind,

    /// Classified-table column whose values form the max-derivative categories.
    pub group_by: String,

    /// Sheet shown in the derivative view.
    pub selected_sheet: Option<String>,

    /// Colours per coverslip type.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            workbook: None,
            source: None,
            config: AnalysisConfig::default(),
            output: None,
            filters: FilterState::default(),
            visible_indices: Vec::new(),
            view: PlotView::MaxDerivatives,
            kind: PlotKind::Box,
            group_by: COVERSLIP_TYPE_COLUMN.to_string(),
            selected_sheet: None,
            color_map: None,
            status_message: None,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded workbook and analyse it.
    pub fn set_workbook(&mut self, workbook: Workbook, source: PathBuf) {
        self.workbook = Some(workbook);
        self.source = Some(source);
        self.selected_sheet = None;
        self.rerun();
    }

    /// Run the whole pipeline again with the current config.
    pub fn rerun(&mut self) {
        let Some(workbook) = &self.workbook else {
            return;
        };
        match rusty_calcium::run(workbook, &self.config) {
            Ok(output) => {
                self.filters = init_filter_state(&output.classified);
                self.visible_indices = (0..output.classified.len()).collect();
                self.color_map = Some(ColorMap::new(&all_types()));
                if self
                    .selected_sheet
                    .as_ref()
                    .map_or(true, |s| output.derivatives.iter().all(|d| &d.sheet != s))
                {
                    self.selected_sheet = output.derivatives.first().map(|d| d.sheet.clone());
                }
                self.output = Some(output);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Analysis failed: {e}");
                self.output = None;
                self.visible_indices.clear();
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Recompute `visible_indices` after filter change.
    pub fn refilter(&mut self) {
        if let Some(out) = &self.output {
            self.visible_indices = filtered_indices(&out.classified, &self.filters);
        }
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        if let Some(out) = &self.output {
            if let Some(all_vals) = out.classified.unique_values.get(column) {
                self.filters.insert(column.to_string(), all_vals.clone());
                self.refilter();
            }
        }
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.filters.insert(column.to_string(), BTreeSet::new());
        self.refilter();
    }

    pub fn is_type_column(column: &str) -> bool {
        column == COVERSLIP_TYPE_COLUMN
    }
}

/// Colour assignment stays stable across runs that miss some types.
fn all_types() -> BTreeSet<String> {
    rusty_calcium::data::model::CoverslipType::ALL
        .iter()
        .map(|t| t.to_string())
        .collect()
}
