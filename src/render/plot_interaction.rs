use std::time::Instant;

use egui::{Pos2, Rect};
use glam::DVec2;

use crate::processing::selection::SelectionModifier;
use crate::render::star_plot::StarPlot;

/// Convert a screen position into plot space (relative to `center`).
pub fn to_plot(pos: Pos2, center: Pos2) -> DVec2 {
    DVec2::new((pos.x - center.x) as f64, (pos.y - center.y) as f64)
}

/// Convert a plot-space position back to the screen.
pub fn to_screen(p: DVec2, center: Pos2) -> Pos2 {
    Pos2::new(center.x + p.x as f32, center.y + p.y as f32)
}

/// Exactly Shift adds, exactly Ctrl (Cmd on macOS) subtracts.
pub fn selection_modifier(modifiers: egui::Modifiers) -> SelectionModifier {
    SelectionModifier::from_keys(modifiers.shift, modifiers.command || modifiers.ctrl)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RubberBand {
    start: DVec2,
    end: DVec2,
}

/// Turns egui pointer input on the plot area into axis drags, rubber-band
/// selections and hover updates.
#[derive(Debug, Clone, Default)]
pub struct PlotInteraction {
    band: Option<RubberBand>,
    /// Last pointer position over the plot, in plot space.
    pub hover: Option<DVec2>,
}

impl PlotInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle mouse input on the plot area.
    pub fn handle_input(
        &mut self,
        plot: &mut StarPlot,
        response: &egui::Response,
        center: Pos2,
        hover_radius: f64,
        now: Instant,
    ) {
        let ctx = &response.ctx;

        // Grab or start a rubber band where the button went down, not where
        // the drag threshold was crossed.
        if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ctx
                .input(|i| i.pointer.press_origin())
                .or_else(|| response.interact_pointer_pos());
            if let Some(origin) = origin {
                let p = to_plot(origin, center);
                if plot.pointer_down(p, hover_radius).is_none() {
                    self.band = Some(RubberBand { start: p, end: p });
                }
            }
        }

        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                let p = to_plot(pos, center);
                if plot.is_dragging() {
                    plot.pointer_move(p);
                } else if let Some(band) = &mut self.band {
                    band.end = p;
                }
            }
        }

        if response.drag_stopped_by(egui::PointerButton::Primary) {
            if plot.is_dragging() {
                plot.pointer_up(now);
            }
            if let Some(band) = self.band.take() {
                let modifier = ctx.input(|i| selection_modifier(i.modifiers));
                plot.select_area(band.start, band.end, modifier);
            }
        }

        self.hover = response.hover_pos().map(|p| to_plot(p, center));
        if !plot.is_dragging() {
            plot.hover_axis(self.hover, hover_radius);
        }
    }

    /// Screen rectangle of the rubber band being drawn, if any.
    pub fn band_rect(&self, center: Pos2) -> Option<Rect> {
        self.band
            .map(|b| Rect::from_two_pos(to_screen(b.start, center), to_screen(b.end, center)))
    }

    pub fn is_selecting(&self) -> bool {
        self.band.is_some()
    }
}
