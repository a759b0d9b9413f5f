use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points};

use crate::color::generate_palette;
use crate::state::{AppState, PlotKind, PlotView};

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the active view in the central panel.
pub fn central_plot(ui: &mut Ui, state: &AppState) {
    if state.output.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a workbook to analyse  (File → Open…)");
        });
        return;
    }
    match state.view {
        PlotView::Derivatives => derivative_plot(ui, state),
        PlotView::MaxDerivatives => max_derivative_plot(ui, state),
    }
}

// ---------------------------------------------------------------------------
// Derivative traces of one sheet
// ---------------------------------------------------------------------------

fn derivative_plot(ui: &mut Ui, state: &AppState) {
    let Some(out) = &state.output else {
        return;
    };
    let Some(table) = state
        .selected_sheet
        .as_ref()
        .and_then(|name| out.derivatives.iter().find(|d| &d.sheet == name))
    else {
        ui.label("No sheet selected.");
        return;
    };

    let colors = generate_palette(table.n_cols());

    Plot::new("derivative_plot")
        .x_axis_label("Frame")
        .y_axis_label("Derivative")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (col, color) in colors.iter().enumerate() {
                let points: PlotPoints = table
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, row)| [(table.start + i) as f64, row[col]])
                    .collect();
                plot_ui.line(Line::new(points).name(&table.columns[col]).color(*color).width(1.5));
            }
        });
}

// ---------------------------------------------------------------------------
// Max derivatives grouped by the selected column
// ---------------------------------------------------------------------------

fn max_derivative_plot(ui: &mut Ui, state: &AppState) {
    let Some(out) = &state.output else {
        return;
    };

    let groups = out
        .classified
        .grouped_maxima(&state.group_by, &state.visible_indices);
    let labels: Vec<String> = groups.iter().map(|(label, _)| label.clone()).collect();
    // Type categories keep their stable colours; raw labels get a fresh palette.
    let palette = generate_palette(groups.len());

    Plot::new("max_derivative_plot")
        .legend(Legend::default())
        .x_axis_label(state.group_by.replace('_', " "))
        .y_axis_label("Maximum derivative")
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() < 1e-6 && idx >= 0.0 {
                labels.get(idx as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (x, (label, values)) in groups.iter().enumerate() {
                let color = if AppState::is_type_column(&state.group_by) {
                    state.color_map.as_ref().map(|cm| cm.color_for(label))
                } else {
                    palette.get(x).copied()
                }
                .unwrap_or(Color32::LIGHT_BLUE);
                let x = x as f64;

                match state.kind {
                    PlotKind::Box => {
                        if let Some(spread) = box_spread(values) {
                            let elem = BoxElem::new(x, spread)
                                .name(label)
                                .box_width(0.6)
                                .fill(color.gamma_multiply(0.5))
                                .stroke(Stroke::new(2.0, color));
                            plot_ui.box_plot(BoxPlot::new(vec![elem]).name(label));
                        }
                    }
                    PlotKind::Point => {
                        let points: PlotPoints = values.iter().map(|&v| [x, v]).collect();
                        plot_ui.points(Points::new(points).radius(4.0).color(color).name(label));
                    }
                }
            }
        });
}

/// Whiskers at the extremes, box at the quartiles (linear interpolation).
fn box_spread(values: &[f64]) -> Option<BoxSpread> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let quantile = |q: f64| {
        let pos = q * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    };
    Some(BoxSpread::new(
        sorted[0],
        quantile(0.25),
        quantile(0.5),
        quantile(0.75),
        sorted[sorted.len() - 1],
    ))
}
