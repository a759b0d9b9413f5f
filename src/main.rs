mod app;
mod color;
mod state;
mod ui;

use app::RustyCalciumApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    // Optional workbook path on the command line.
    let mut app = RustyCalciumApp::default();
    if let Some(path) = std::env::args_os().nth(1).map(std::path::PathBuf::from) {
        match rusty_calcium::data::loader::load_workbook(&path) {
            Ok(workbook) => app.state.set_workbook(workbook, path),
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", path.display());
                app.state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    eframe::run_native(
        "Rusty Calcium – Rate of Rise",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
