use std::time::{Duration, Instant};

use eframe::egui;
use egui::epaint::TextShape;
use egui::{Align2, Color32, FontId, Pos2, Rect, Stroke};
use glam::DVec2;

use crate::processing::statistics::AttributeStats;
use crate::render::layout::direction;
use crate::render::plot_interaction::{to_screen, PlotInteraction};
use crate::state::app_state::AppState;
use crate::state::palette::to_color32;

const AXIS_WIDTH: f32 = 1.0;
const AXIS_WIDTH_HOVERED: f32 = 3.0;
const LINE_WIDTH: f32 = 1.0;
const LINE_WIDTH_HIGHLIGHTED: f32 = 3.0;
const HIGHLIGHT_ALPHA: u8 = 200;
const LABEL_GAP: f32 = 6.0;

/// Labels on the left half are turned upside down so they stay readable.
pub fn label_flipped(rotation: f64) -> bool {
    rotation > 90.0 && rotation < 270.0
}

/// Draw the star plot into the remaining space and route pointer input.
/// Returns when the next repaint is due, if any.
pub fn show(ui: &mut egui::Ui, state: &mut AppState, interaction: &mut PlotInteraction, now: Instant) -> Option<Duration> {
    let rect = ui.available_rect_before_wrap();
    let response = ui.interact(rect, egui::Id::new("star_plot"), egui::Sense::click_and_drag());
    let center = rect.center();
    let hover_radius = state.settings.hover_radius;

    state.sync_plot();
    state.plot.set_viewport(DVec2::new(rect.width() as f64, rect.height() as f64), now);
    interaction.handle_input(&mut state.plot, &response, center, hover_radius, now);
    let repaint = state.plot.tick(now);

    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, state.theme.plot_bg());

    let text_color = ui.visuals().text_color();
    let message = match (&state.dataset, &state.plot_message) {
        (None, _) => Some("Open an ARFF, CSV or Excel file, or drop one here."),
        (Some(_), Some(msg)) => Some(msg.as_str()),
        _ => None,
    };
    if let Some(message) = message {
        painter.text(center, Align2::CENTER_CENTER, message, FontId::proportional(15.0), text_color.gamma_multiply(0.6));
        return repaint;
    }

    draw_polylines(&painter, state, center);
    draw_axes(&painter, state, center, text_color);

    if let Some(band) = interaction.band_rect(center) {
        painter.rect_filled(band, 0.0, state.theme.band_fill());
        painter.rect_stroke(band, 0.0, Stroke::new(1.0, state.theme.axis_color()), egui::StrokeKind::Inside);
    }

    if !state.plot.is_dragging() && !interaction.is_selecting() {
        if let Some(pos) = interaction.hover {
            draw_hover(&painter, state, center, pos, text_color);
        }
    }

    repaint
}

fn draw_polylines(painter: &egui::Painter, state: &AppState, center: Pos2) {
    let projection = state.plot.projection();
    // Highlighted lines go on top.
    for highlighted in [false, true] {
        for line in projection.polylines().iter().filter(|l| l.highlighted == highlighted) {
            let [r, g, b, a] = state.palette.color_for(&line.label);
            let stroke = if highlighted {
                Stroke::new(LINE_WIDTH_HIGHLIGHTED, Color32::from_rgba_unmultiplied(r, g, b, HIGHLIGHT_ALPHA))
            } else {
                Stroke::new(LINE_WIDTH, Color32::from_rgba_unmultiplied(r, g, b, a))
            };
            for segment in &line.segments {
                let (start, end) = projection.segment_endpoints(segment);
                painter.line_segment([to_screen(start, center), to_screen(end, center)], stroke);
            }
        }
    }
}

fn draw_axes(painter: &egui::Painter, state: &AppState, center: Pos2, text_color: Color32) {
    let layout = state.plot.layout();
    let active = layout.hovered().or(state.plot.reorder().dragged_axis());
    let font = FontId::proportional(13.0);

    for &id in layout.order() {
        let (Some(axis), Some(tip)) = (layout.axis(id), layout.tip(id)) else {
            continue;
        };
        let width = if active == Some(id) { AXIS_WIDTH_HOVERED } else { AXIS_WIDTH };
        let tip = to_screen(tip, center);
        painter.line_segment([center, tip], Stroke::new(width, state.theme.axis_color()));

        let galley = painter.layout_no_wrap(axis.name.clone(), font.clone(), text_color);
        let size = galley.rect.size();
        let dir = direction(axis.rotation);
        let dir = egui::vec2(dir.x as f32, dir.y as f32);
        let perp = egui::vec2(-dir.y, dir.x);
        let (pos, angle) = if label_flipped(axis.rotation) {
            (tip + dir * (LABEL_GAP + size.x) + perp * (size.y / 2.0), axis.rotation + 180.0)
        } else {
            (tip + dir * LABEL_GAP - perp * (size.y / 2.0), axis.rotation)
        };
        painter.add(TextShape::new(pos, galley, text_color).with_angle(angle.to_radians() as f32));
    }
}

fn draw_hover(painter: &egui::Painter, state: &mut AppState, center: Pos2, pos: DVec2, text_color: Color32) {
    let Some(dataset) = &state.dataset else {
        return;
    };
    let radius = state.settings.hover_radius;

    if let Some(ids) = state.plot.hover_point(pos, radius) {
        let Some(point) = ids.first().and_then(|&id| state.plot.projection().points().get(id)) else {
            return;
        };
        let Some(line) = state.plot.projection().polylines().get(point.polyline) else {
            return;
        };
        let Some(row) = dataset.rows().get(line.source) else {
            return;
        };
        let mut text: String = dataset
            .attributes()
            .iter()
            .zip(&row.values)
            .map(|(attr, value)| format!("{} = {value}\n", attr.name))
            .collect();
        text.push_str(&format!("{} = {}", dataset.class_name(), row.label));
        if ids.len() > 1 {
            text.push_str(&format!("\n(+{} more rows at this point)", ids.len() - 1));
        }

        let color = to_color32(state.palette.color_for(&row.label));
        let screen = to_screen(point.pos, center);
        painter.circle_filled(screen, 5.0, color);
        painter.circle_stroke(screen, 5.0, Stroke::new(1.0, Color32::WHITE));
        draw_tooltip(painter, screen, text, text_color, color);
    } else if let Some(axis) = state.plot.layout().hovered().and_then(|id| state.plot.layout().axis(id)) {
        let text = AttributeStats::for_attribute(dataset, axis.attribute)
            .map(|s| s.report(&axis.name))
            .unwrap_or_else(|| axis.name.clone());
        draw_tooltip(painter, to_screen(pos, center), text, text_color, state.theme.axis_color());
    }
}

fn draw_tooltip(painter: &egui::Painter, anchor: Pos2, text: String, text_color: Color32, border: Color32) {
    let font = FontId::proportional(11.0);
    let galley = painter.layout_no_wrap(text, font, text_color);
    let size = galley.rect.size();
    let pos = Pos2::new(anchor.x + 10.0, anchor.y - size.y - 8.0);
    let bg_rect = Rect::from_min_size(
        Pos2::new(pos.x - 4.0, pos.y - 2.0),
        egui::vec2(size.x + 8.0, size.y + 4.0),
    );

    let bg_color = painter.ctx().style().visuals.window_fill;
    painter.rect_filled(bg_rect, 3.0, bg_color.gamma_multiply(0.9));
    painter.rect_stroke(bg_rect, 3.0, Stroke::new(0.5, border), egui::StrokeKind::Outside);
    painter.galley(pos, galley, text_color);
}
