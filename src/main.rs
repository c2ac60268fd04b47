mod app;
mod data;
mod processing;
mod render;
mod settings;
mod state;
mod ui;

use app::StarPlotApp;
use eframe::egui;
use settings::Settings;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let settings = Settings::load_or_default();
    let initial = std::env::args_os().nth(1).map(std::path::PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Star Plot")
            .with_inner_size([1200.0, 850.0])
            .with_min_inner_size([640.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Star Plot",
        options,
        Box::new(|cc| Ok(Box::new(StarPlotApp::new(cc, settings, initial)))),
    )
}
