// src/main.rs
mod drivers;
mod engine;
mod gui;
mod settings;
mod types;
use eframe::egui;
use settings::Settings;
fn main() -> eframe::Result<()> {
    env_logger::init();
    let settings_path = Settings::store_path();
    let settings = Settings::load_or_default(&settings_path);
    log::info!(
        "history {} samples, refresh every {:?}",
        settings.history_length,
        settings.refresh_period()
    );
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([900.0, 700.0])
        .with_min_inner_size([600.0, 400.0])
        .with_title("UART Data Visualizer");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "UART Data Visualizer",
        options,
        Box::new(move |cc| {
            Box::new(gui::VisualizerApp::new(
                &cc.egui_ctx,
                settings,
                settings_path,
            ))
        }),
    )
}
