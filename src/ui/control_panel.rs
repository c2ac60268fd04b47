use std::collections::BTreeSet;

use eframe::egui;

use crate::state::app_state::AppState;
use crate::state::dataset::ScaleMode;
use crate::state::palette::to_color32;

/// Requests the panel cannot carry out itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    OpenFile,
}

/// Dataset summary, scaling, class and attribute controls.
pub fn show(ui: &mut egui::Ui, state: &mut AppState) -> Option<ControlAction> {
    let mut action = None;

    let open_btn = egui::Button::new(egui::RichText::new("Open File...").strong())
        .min_size(egui::vec2(140.0, 28.0));
    if ui.add(open_btn).on_hover_text("Load an ARFF, CSV or Excel file").clicked() {
        action = Some(ControlAction::OpenFile);
    }

    let Some(dataset) = &state.dataset else {
        ui.add_space(8.0);
        ui.label(egui::RichText::new("No data loaded.").weak());
        return action;
    };

    ui.add_space(8.0);
    ui.heading(dataset.relation());
    if let Some(name) = state.source_path.as_ref().and_then(|p| p.file_name()) {
        ui.label(egui::RichText::new(name.to_string_lossy()).weak());
    }
    ui.label(format!(
        "{} of {} rows shown",
        dataset.active_indices().len(),
        dataset.rows().len()
    ));

    ui.separator();
    ui.label(egui::RichText::new("Scaling").strong());
    let mut mode = state.scale_mode();
    ui.horizontal(|ui| {
        for option in [ScaleMode::Local, ScaleMode::Global] {
            ui.radio_value(&mut mode, option, option.label())
                .on_hover_text(match option {
                    ScaleMode::Local => "Each axis spans its own attribute range",
                    ScaleMode::Global => "All axes share one range",
                });
        }
    });

    ui.separator();
    ui.label(egui::RichText::new(format!("Classes ({})", dataset.class_name())).strong());
    let mut visibility: Vec<(String, bool)> = Vec::new();
    let mut recolor: Vec<(String, [u8; 4])> = Vec::new();
    for (label, color, visible, count, selected) in state.class_summary() {
        ui.horizontal(|ui| {
            let mut shown = visible;
            if ui.checkbox(&mut shown, "").changed() {
                visibility.push((label.clone(), shown));
            }
            let mut c = to_color32(color);
            if egui::color_picker::color_edit_button_srgba(ui, &mut c, egui::color_picker::Alpha::OnlyBlend).changed() {
                recolor.push((label.clone(), c.to_srgba_unmultiplied()));
            }
            ui.label(format!("{label} ({count})"));
        });
        ui.add(
            egui::ProgressBar::new(selected as f32)
                .desired_height(6.0)
                .fill(to_color32([color[0], color[1], color[2], 200])),
        )
        .on_hover_text(format!("{:.0}% selected", selected * 100.0));
    }

    ui.separator();
    ui.label(egui::RichText::new("Attributes").strong());
    let mut attributes: BTreeSet<String> = BTreeSet::new();
    let mut attributes_changed = false;
    for (i, attr) in dataset.attributes().iter().enumerate() {
        let mut active = dataset.is_attribute_active(i);
        if attr.is_numeric() && ui.checkbox(&mut active, attr.name.as_str()).changed() {
            attributes_changed = true;
        }
        if active {
            attributes.insert(attr.name.clone());
        }
    }

    ui.add_space(8.0);
    let mut reset = false;
    let mut clear = false;
    ui.horizontal(|ui| {
        reset = ui.button("Reset Filters").on_hover_text("Show every class and attribute").clicked();
        clear = ui.button("Clear Selection").clicked();
    });

    // Apply after the dataset borrow ends.
    state.set_scale_mode(mode);
    for (label, shown) in visibility {
        state.set_class_visible(&label, shown);
    }
    for (label, color) in recolor {
        state.palette.set_color(&label, color);
    }
    if attributes_changed {
        if let Some(dataset) = &mut state.dataset {
            dataset.set_attribute_filter(&attributes);
        }
    }
    if reset {
        if let Some(dataset) = &mut state.dataset {
            dataset.reset_filters();
        }
    }
    if clear {
        state.plot.clear_selection();
    }

    action
}
