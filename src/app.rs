use std::path::PathBuf;
use std::time::Instant;

use eframe::egui;

use crate::data::loader::SUPPORTED_EXTENSIONS;
use crate::render::plot_interaction::PlotInteraction;
use crate::settings::Settings;
use crate::state::app_state::{AppState, VERSION};
use crate::ui::control_panel::{self, ControlAction};
use crate::ui::plot_panel;

/// The main star plot application.
pub struct StarPlotApp {
    pub state: AppState,
    interaction: PlotInteraction,
    /// Whether to show the About window (hidden menu).
    pub show_about: bool,
}

impl StarPlotApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings, initial: Option<PathBuf>) -> Self {
        let mut state = AppState::new(settings);

        let ctx = &cc.egui_ctx;
        let mut style = (*ctx.style()).clone();
        style.text_styles.insert(egui::TextStyle::Body, egui::FontId::proportional(15.0));
        style.text_styles.insert(egui::TextStyle::Button, egui::FontId::proportional(14.5));
        style.text_styles.insert(egui::TextStyle::Heading, egui::FontId::proportional(20.0));
        style.spacing.button_padding = egui::vec2(10.0, 5.0);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        ctx.set_style(style);
        ctx.set_visuals(state.theme.visuals());

        if let Some(path) = initial {
            state.open_path(&path);
        }

        Self {
            state,
            interaction: PlotInteraction::new(),
            show_about: false,
        }
    }

    fn open_file_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Data Files", &SUPPORTED_EXTENSIONS)
            .add_filter("All Files", &["*"])
            .pick_file()
        {
            self.state.open_path(&path);
        }
    }
}

impl eframe::App for StarPlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(self.state.theme.visuals());
        let now = Instant::now();

        // Dropped files: the last supported one wins.
        let dropped: Option<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .filter(|p| {
                    p.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                        .unwrap_or(false)
                })
                .last()
        });
        if let Some(path) = dropped {
            self.state.open_path(&path);
        }

        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(16, 8)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let heading = ui.heading("Star Plot");
                    heading.context_menu(|ui| {
                        if ui.button("About").clicked() {
                            self.show_about = true;
                            ui.close_menu();
                        }
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let theme_label = match self.state.theme {
                            crate::state::theme::Theme::Dark => "Light Mode",
                            crate::state::theme::Theme::Light => "Dark Mode",
                        };
                        if ui.button(theme_label).clicked() {
                            self.state.theme = self.state.theme.toggle();
                        }
                        ui.separator();
                        ui.small(format!("v{VERSION}"));
                    });
                });
            });

        let mut action = None;
        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    action = control_panel::show(ui, &mut self.state);
                });
            });
        if action == Some(ControlAction::OpenFile) {
            self.open_file_dialog();
        }

        let mut repaint = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                repaint = plot_panel::show(ui, &mut self.state, &mut self.interaction, now);
            });
        match repaint {
            Some(delay) if delay.is_zero() => ctx.request_repaint(),
            Some(delay) => ctx.request_repaint_after(delay),
            None => {}
        }

        if let Some(msg) = self.state.error_message.clone() {
            let mut open = true;
            egui::Window::new("Error")
                .open(&mut open)
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.colored_label(egui::Color32::from_rgb(255, 80, 80), msg);
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        self.state.error_message = None;
                    }
                });
            if !open {
                self.state.error_message = None;
            }
        }

        if self.show_about {
            egui::Window::new("About Star Plot")
                .open(&mut self.show_about)
                .collapsible(false)
                .resizable(false)
                .default_width(320.0)
                .show(ctx, |ui| {
                    ui.label(format!("Version: {VERSION}"));
                    ui.add_space(4.0);
                    ui.label("Drag an axis to reorder it.");
                    ui.label("Drag on empty space to select lines.");
                    ui.label("  Shift adds, Ctrl subtracts.");
                });
        }
    }
}
