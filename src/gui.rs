// src/gui.rs
use crate::drivers::{
    available_ports, parse_baud_rate, transport_available, Layout, PlotSurface, RenderError,
    SourceConfig, TickOutcome,
};
use crate::engine::STOP_TIMEOUT;
use crate::settings::Settings;
use crate::types::{AppState, ReaderEvent};
use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const CLOSE_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
const LOG_LINES: usize = 8;

/// egui_plot backed surface: one stacked plot per subplot, one line per channel.
pub struct EguiPlotSurface {
    ctx: Option<egui::Context>,
    layout: Option<Layout>,
    // y-values, indexed like `Layout::channels`
    lines: Vec<Vec<f64>>,
}

impl EguiPlotSurface {
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            ctx: Some(ctx),
            layout: None,
            lines: Vec::new(),
        }
    }

    /// Called once the window is closing; later calls report `TargetDestroyed`.
    pub fn detach(&mut self) {
        self.ctx = None;
    }

    fn alive(&self) -> Result<&egui::Context, RenderError> {
        self.ctx.as_ref().ok_or(RenderError::TargetDestroyed)
    }

    fn show(&self, ui: &mut egui::Ui) {
        let Some(layout) = &self.layout else {
            ui.centered_and_justified(|ui| ui.label("Load config to start"));
            return;
        };
        let spacing = ui.spacing().item_spacing.y;
        let count = layout.subplots.len().max(1) as f32;
        // Title row plus the plot itself.
        let per_plot = (ui.available_height() / count - 2.0 * spacing - 18.0).max(60.0);
        for (idx, subplot) in layout.subplots.iter().enumerate() {
            ui.label(egui::RichText::new(&subplot.title).strong());
            Plot::new(("subplot", idx))
                .height(per_plot)
                .legend(Legend::default())
                .y_axis_label(subplot.y_label.clone())
                .auto_bounds_x()
                .auto_bounds_y()
                .show(ui, |plot_ui| {
                    for (line, channel) in layout.channels_in(idx) {
                        let values = self.lines.get(line).map_or(&[][..], Vec::as_slice);
                        plot_ui.line(
                            Line::new(PlotPoints::from_ys_f64(values)).name(channel.legend_label()),
                        );
                    }
                });
        }
    }
}

impl PlotSurface for EguiPlotSurface {
    fn rebuild(&mut self, layout: &Layout) -> Result<(), RenderError> {
        self.alive()?;
        self.lines = vec![Vec::new(); layout.channels.len()];
        self.layout = Some(layout.clone());
        Ok(())
    }

    fn set_line(&mut self, subplot: usize, line: usize, values: &[f64]) -> Result<(), RenderError> {
        self.alive()?;
        match self.lines.get_mut(line) {
            Some(entry) => {
                entry.clear();
                entry.extend_from_slice(values);
            }
            None => debug!("no plot line {line} in subplot {subplot}, layout out of sync"),
        }
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), RenderError> {
        self.alive()?.request_repaint();
        Ok(())
    }
}

pub struct VisualizerApp {
    state: AppState,
    surface: EguiPlotSurface,
    settings: Settings,
    settings_path: PathBuf,
    available_ports: Vec<String>,
    selected_port: String,
    baud_text: String,
    dummy_mode: bool,
    show_about: bool,
    log_messages: Vec<String>,
}

impl VisualizerApp {
    pub fn new(ctx: &egui::Context, settings: Settings, settings_path: PathBuf) -> Self {
        let mut app = Self {
            state: AppState::new(settings.history_length, settings.refresh_period()),
            surface: EguiPlotSurface::new(ctx.clone()),
            selected_port: settings.port.clone(),
            baud_text: settings.baud_rate.to_string(),
            dummy_mode: settings.dummy || !transport_available(),
            available_ports: Vec::new(),
            show_about: false,
            log_messages: vec!["UART Visualizer ready.".to_owned()],
            settings,
            settings_path,
        };
        app.refresh_ports();
        if let Some(path) = app.settings.last_layout.clone() {
            if path.exists() {
                app.load_layout(&path);
            }
        }
        app
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn refresh_ports(&mut self) {
        self.available_ports = available_ports();
        if !self.available_ports.contains(&self.selected_port) {
            if let Some(first) = self.available_ports.first() {
                self.selected_port = first.clone();
            }
        }
    }

    fn start_reader(&mut self) {
        let baud_rate = match parse_baud_rate(&self.baud_text) {
            Ok(baud) => baud,
            Err(e) => {
                self.log(&format!("Error: {e}"));
                return;
            }
        };
        let config = SourceConfig {
            port: self.selected_port.clone(),
            baud_rate,
            dummy: self.dummy_mode,
        };
        self.settings.port = config.port.clone();
        self.settings.baud_rate = config.baud_rate;
        self.settings.dummy = config.dummy;
        self.persist_settings();
        if !self.state.start_reader(config) {
            self.log("Reader already running.");
        }
    }

    fn stop_reader(&mut self) {
        if !self.state.stop_reader(STOP_TIMEOUT) {
            self.log("Reader did not stop in time.");
        }
    }

    fn pick_layout(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON Files", &["json"])
            .pick_file()
        {
            self.load_layout(&path);
        }
    }

    fn load_layout(&mut self, path: &Path) {
        match self.state.load_layout(path, &mut self.surface) {
            Ok(()) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.log(&format!("Loaded config {name}"));
                self.settings.last_layout = Some(path.to_path_buf());
                self.persist_settings();
            }
            Err(e) => {
                warn!("{e}");
                self.log(&format!("Config error: {e}"));
            }
        }
    }

    fn persist_settings(&self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            warn!("could not save settings: {e:#}");
        }
    }

    fn handle_reader_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                ReaderEvent::Started(name) => self.log(&format!("Started: {name}")),
                ReaderEvent::OpenFailed(e) => self.log(&format!("UART open error: {e}")),
                ReaderEvent::Failed(e) => self.log(&format!("Reader error: {e}")),
                ReaderEvent::FramesDropped(total) => {
                    self.log(&format!("Discarded {total} malformed frame(s) so far."))
                }
                ReaderEvent::Stopped => self.log("Stopped."),
                // drain_events keeps samples in the buffer
                ReaderEvent::Samples(_) => {}
            }
        }
    }

    fn on_close(&mut self) {
        self.state.shutdown(CLOSE_JOIN_TIMEOUT);
        self.surface.detach();
        self.persist_settings();
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let reading = self.state.is_reading();
        ui.horizontal(|ui| {
            ui.label("Port:");
            egui::ComboBox::from_id_source("port")
                .width(110.0)
                .selected_text(self.selected_port.clone())
                .show_ui(ui, |ui| {
                    for port in &self.available_ports {
                        ui.selectable_value(&mut self.selected_port, port.clone(), port);
                    }
                });
            if ui.small_button("⟳").on_hover_text("Refresh ports").clicked() {
                self.refresh_ports();
            }
            ui.label("Baud:");
            ui.add(egui::TextEdit::singleline(&mut self.baud_text).desired_width(70.0));
            ui.add_enabled(
                transport_available(),
                egui::Checkbox::new(&mut self.dummy_mode, "Dummy Mode"),
            );
            if ui.add_enabled(!reading, egui::Button::new("Start")).clicked() {
                self.start_reader();
            }
            if ui.add_enabled(reading, egui::Button::new("Stop")).clicked() {
                self.stop_reader();
            }
        });
    }
}

impl eframe::App for VisualizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.state.is_closing() {
            self.on_close();
        }
        if self.state.is_closing() {
            return;
        }

        // 1. Reader events -> rolling buffer
        self.handle_reader_events();

        // 2. Render tick, paced by the render loop period
        let now = Instant::now();
        if self.state.render_tick(now, &mut self.surface) == TickOutcome::TargetLost {
            self.log("Plot surface lost.");
        }
        ctx.request_repaint_after(self.state.render_loop().next_due_in(Instant::now()));

        // 3. UI
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Load Config").clicked() {
                        ui.close_menu();
                        self.pick_layout();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ui.close_menu();
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        ui.close_menu();
                        self.show_about = true;
                    }
                });
            });
            self.controls(ui);
        });

        egui::TopBottomPanel::bottom("log").show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .max_height(100.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for m in &self.log_messages {
                        ui.monospace(m);
                    }
                });
        });

        egui::CentralPanel::default().show(ctx, |ui| self.surface.show(ui));

        egui::Window::new("About")
            .open(&mut self.show_about)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "UART Visualizer v{} with JSON Config",
                    env!("CARGO_PKG_VERSION")
                ));
                if !transport_available() {
                    ui.colored_label(Color32::YELLOW, "Built without serial support.");
                }
            });
    }
}

impl Drop for VisualizerApp {
    fn drop(&mut self) {
        self.state.shutdown(CLOSE_JOIN_TIMEOUT);
    }
}
