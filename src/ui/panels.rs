use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use rusty_calcium::ThresholdPolicy;
use rusty_calcium::analysis::aggregate::Summary;
use rusty_calcium::data::export::write_classified_csv;

use crate::state::{AppState, PlotKind, PlotView};

// ---------------------------------------------------------------------------
// Left side panel – analysis settings and filters
// ---------------------------------------------------------------------------

/// Render the left settings/filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            settings(ui, state);
            ui.separator();
            view_selector(ui, state);
            ui.separator();
            filters(ui, state);
        });
}

fn settings(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Analysis");

    let config = &mut state.config;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Step size h");
        ui.add(DragValue::new(&mut config.step_size).speed(0.1).range(0.001..=1000.0));
    });

    let mut use_limit = config.limit.is_some();
    ui.horizontal(|ui: &mut Ui| {
        ui.checkbox(&mut use_limit, "Limit");
        let mut limit = config.limit.unwrap_or(0.0);
        ui.add_enabled(use_limit, DragValue::new(&mut limit).speed(0.01));
        config.limit = use_limit.then_some(limit);
    });

    ui.checkbox(&mut config.exclude, "Exclude weak WT coverslips");
    ui.add_enabled_ui(config.exclude, |ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            ui.label("Low");
            ui.add(DragValue::new(&mut config.threshold.0).speed(0.01));
            ui.label("High");
            ui.add(DragValue::new(&mut config.threshold.1).speed(0.01));
        });
        egui::ComboBox::from_id_salt("threshold_policy")
            .selected_text(match config.threshold_policy {
                ThresholdPolicy::LowForBoth => "Low for both",
                ThresholdPolicy::PerConcentration => "Per concentration",
            })
            .show_ui(ui, |ui: &mut Ui| {
                ui.selectable_value(
                    &mut config.threshold_policy,
                    ThresholdPolicy::LowForBoth,
                    "Low for both",
                );
                ui.selectable_value(
                    &mut config.threshold_policy,
                    ThresholdPolicy::PerConcentration,
                    "Per concentration",
                );
            });
    });

    if ui.button("Run analysis").clicked() {
        state.rerun();
    }
}

fn view_selector(ui: &mut Ui, state: &mut AppState) {
    ui.strong("View");
    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.view, PlotView::MaxDerivatives, "Max derivatives");
        ui.selectable_value(&mut state.view, PlotView::Derivatives, "Derivatives");
    });

    match state.view {
        PlotView::MaxDerivatives => {
            ui.horizontal(|ui: &mut Ui| {
                ui.selectable_value(&mut state.kind, PlotKind::Box, "Box");
                ui.selectable_value(&mut state.kind, PlotKind::Point, "Point");
            });
            let Some(out) = &state.output else {
                return;
            };
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Group by");
                egui::ComboBox::from_id_salt("group_by")
                    .selected_text(&state.group_by)
                    .show_ui(ui, |ui: &mut Ui| {
                        for column in out.classified.column_names() {
                            let label = column.clone();
                            ui.selectable_value(&mut state.group_by, column, label);
                        }
                    });
            });
        }
        PlotView::Derivatives => {
            let Some(out) = &state.output else {
                return;
            };
            let current = state.selected_sheet.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("sheet")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for table in &out.derivatives {
                        if ui.selectable_label(current == table.sheet, &table.sheet).clicked() {
                            state.selected_sheet = Some(table.sheet.clone());
                        }
                    }
                });
        }
    }
}

fn filters(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");

    let Some(out) = &state.output else {
        ui.label("No workbook loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let unique = out.classified.unique_values.clone();
    let mut changed = false;

    for (col, all_values) in &unique {
        let n_selected = state.filters.get(col).map_or(0, |s| s.len());
        let header_text = format!("{col}  ({n_selected}/{})", all_values.len());

        egui::CollapsingHeader::new(RichText::new(header_text).strong())
            .id_salt(col)
            .default_open(AppState::is_type_column(col))
            .show(ui, |ui: &mut Ui| {
                ui.horizontal(|ui: &mut Ui| {
                    if ui.small_button("All").clicked() {
                        state.select_all(col);
                    }
                    if ui.small_button("None").clicked() {
                        state.select_none(col);
                    }
                });

                // Re-borrow after potential mutation from All/None
                let selected = state.filters.entry(col.clone()).or_default();

                for val in all_values {
                    let mut text = RichText::new(val);
                    if AppState::is_type_column(col) {
                        if let Some(cm) = &state.color_map {
                            text = text.color(cm.color_for(val));
                        }
                    }

                    let mut checked = selected.contains(val);
                    if ui.checkbox(&mut checked, text).changed() {
                        if checked {
                            selected.insert(val.clone());
                        } else {
                            selected.remove(val);
                        }
                        changed = true;
                    }
                }
            });
    }

    if changed {
        state.refilter();
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open workbook file…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open sheet folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.output.is_some(), egui::Button::new("Export classified CSV…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(wb), Some(out)) = (&state.workbook, &state.output) {
            let name = state
                .source
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ui.label(format!(
                "{name}: {} sheets, {} cells, {} visible",
                wb.len(),
                out.classified.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open workbook")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        load(state, path);
    }
}

pub fn open_folder_dialog(state: &mut AppState) {
    if let Some(path) = rfd::FileDialog::new()
        .set_title("Open folder of sheet CSVs")
        .pick_folder()
    {
        load(state, path);
    }
}

fn load(state: &mut AppState, path: std::path::PathBuf) {
    match rusty_calcium::data::loader::load_workbook(&path) {
        Ok(workbook) => {
            log::info!(
                "Loaded {} sheets from {}: {:?}",
                workbook.len(),
                path.display(),
                workbook.sheet_names()
            );
            state.set_workbook(workbook, path);
        }
        Err(e) => {
            log::error!("Failed to load workbook: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

fn export_dialog(state: &mut AppState) {
    let Some(out) = &state.output else {
        return;
    };
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export classified table")
        .add_filter("CSV", &["csv"])
        .set_file_name("classified.csv")
        .save_file()
    else {
        return;
    };

    let records: Vec<_> = state
        .visible_indices
        .iter()
        .map(|&i| out.classified.records[i].clone())
        .collect();
    match write_classified_csv(&path, &records) {
        Ok(()) => log::info!("Exported {} records to {}", records.len(), path.display()),
        Err(e) => {
            log::error!("Export failed: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Bottom panel – summary statistics
// ---------------------------------------------------------------------------

/// Max / mean / median of the maxima, per coverslip type or per sheet
/// depending on the active view.
pub fn summary_table(ui: &mut Ui, state: &AppState) {
    let Some(out) = &state.output else {
        return;
    };

    let rows: Vec<(String, Summary)> = match state.view {
        PlotView::MaxDerivatives => out
            .group_summaries
            .iter()
            .map(|(kind, s)| (kind.to_string(), *s))
            .collect(),
        PlotView::Derivatives => out
            .sheet_summaries
            .iter()
            .map(|s| (s.sheet.clone(), s.summary))
            .collect(),
    };

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(120.0))
        .columns(Column::auto().at_least(70.0), 4)
        .header(20.0, |mut header| {
            for title in ["Group", "n", "Max", "Mean", "Median"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for (name, s) in &rows {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(name);
                    });
                    row.col(|ui| {
                        ui.label(s.count.to_string());
                    });
                    for v in [s.max, s.mean, s.median] {
                        row.col(|ui| {
                            ui.label(format!("{v:.4}"));
                        });
                    }
                });
            }
        });
}
