use std::collections::HashSet;
use std::time::{Duration, Instant};

use glam::DVec2;

use crate::data::DataError;
use crate::processing::kd_tree::HoverTree;
use crate::processing::selection::{SelectRect, SelectionEngine, SelectionModifier};
use crate::render::layout::{AxisId, RadialLayout};
use crate::render::projection::{PointId, Projection};
use crate::render::reorder::{ReorderController, ReorderPlan, TickResult};
use crate::state::dataset::Dataset;

/// Everything drawn in the plot area: axes, polylines, the reorder state
/// machine, the selection engine and the hover index.
///
/// All positions are relative to the plot center.
pub struct StarPlot {
    layout: RadialLayout,
    projection: Projection,
    reorder: ReorderController,
    selection: SelectionEngine,
    hover: Option<(u64, HoverTree)>,
    dataset_revision: Option<u64>,
}

impl Default for StarPlot {
    fn default() -> Self {
        Self::new(RadialLayout::default(), ReorderController::default())
    }
}

impl StarPlot {
    pub fn new(layout: RadialLayout, reorder: ReorderController) -> Self {
        Self {
            layout,
            projection: Projection::new(),
            reorder,
            selection: SelectionEngine::new(),
            hover: None,
            dataset_revision: None,
        }
    }

    pub fn layout(&self) -> &RadialLayout {
        &self.layout
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn reorder(&self) -> &ReorderController {
        &self.reorder
    }

    pub fn selection_mut(&mut self) -> &mut SelectionEngine {
        &mut self.selection
    }

    /// Forget the current dataset so the next sync rebuilds everything.
    pub fn invalidate(&mut self) {
        self.dataset_revision = None;
    }

    /// Rebuild axes and polylines if the dataset changed since the last call.
    ///
    /// Highlights survive the rebuild for rows that are still plotted. On
    /// error the plot is emptied.
    pub fn sync_dataset(&mut self, dataset: &Dataset) -> Result<bool, DataError> {
        if self.dataset_revision == Some(dataset.revision()) {
            return Ok(false);
        }
        self.dataset_revision = Some(dataset.revision());

        let highlighted: HashSet<usize> = self.selection.highlighted_rows(&self.projection).into_iter().collect();
        self.reorder.reset();
        self.hover = None;

        let rows = match dataset.normalized_rows() {
            Ok(rows) => rows,
            Err(e) => {
                self.layout.rebuild(&[]);
                self.projection = Projection::new();
                return Err(e);
            }
        };

        let axes: Vec<(usize, String)> = dataset
            .axis_attributes()
            .into_iter()
            .map(|i| (i, dataset.attributes()[i].name.clone()))
            .collect();
        self.layout.rebuild(&axes);
        self.projection.build(rows, &self.layout);
        for line in self.projection.polylines_mut() {
            line.highlighted = highlighted.contains(&line.source);
        }

        tracing::info!(
            axes = self.layout.len(),
            polylines = self.projection.polylines().len(),
            "star plot rebuilt"
        );
        Ok(true)
    }

    /// Apply a new plot-area size. Hit-testing follows at once; points are
    /// redrawn at the new size once the resize debounce fires in `tick`.
    pub fn set_viewport(&mut self, size: DVec2, now: Instant) {
        self.layout.set_viewport(size, now);
    }

    /// Advance animations and bring point positions up to date.
    ///
    /// Returns how long until the next frame is needed, if at all.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        if self.reorder.tick(&mut self.layout, now) == TickResult::Settled {
            self.projection.reparent(&self.layout);
        }
        if self.layout.poll_resize(now) {
            tracing::debug!(length = self.layout.drawn_length(), "resize applied");
        }
        self.projection.sync(&self.layout);

        if self.reorder.is_animating() {
            Some(Duration::ZERO)
        } else {
            self.layout.resize_pending(now)
        }
    }

    /// Grab the axis under `pos`, if any.
    pub fn pointer_down(&mut self, pos: DVec2, tolerance: f64) -> Option<AxisId> {
        let axis = self.layout.axis_at(pos, tolerance)?;
        self.reorder.pointer_down(&self.layout, axis, pos).then_some(axis)
    }

    pub fn pointer_move(&mut self, pos: DVec2) {
        self.reorder.pointer_move(&mut self.layout, pos);
    }

    pub fn pointer_up(&mut self, now: Instant) -> Option<ReorderPlan> {
        self.reorder.pointer_up(&mut self.layout, now)
    }

    pub fn is_dragging(&self) -> bool {
        self.reorder.is_dragging()
    }

    pub fn select_area(&mut self, a: DVec2, b: DVec2, modifier: SelectionModifier) -> usize {
        self.projection.sync(&self.layout);
        self.selection
            .select_area(&mut self.projection, SelectRect::from_corners(a, b), modifier)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear(&mut self.projection);
    }

    pub fn highlighted_rows(&self) -> Vec<usize> {
        self.selection.highlighted_rows(&self.projection)
    }

    pub fn selection_stats(&self, dataset: &Dataset, label: &str) -> f64 {
        self.selection.selection_stats(&self.projection, dataset, label)
    }

    /// Track the axis under the pointer for the widened pen.
    pub fn hover_axis(&mut self, pos: Option<DVec2>, tolerance: f64) -> Option<AxisId> {
        let hovered = pos.and_then(|p| self.layout.axis_at(p, tolerance));
        self.layout.set_hovered(hovered);
        hovered
    }

    /// Plotted points stacked on the spot within `radius` of `pos`. The index
    /// is rebuilt lazily whenever the geometry changed.
    pub fn hover_point(&mut self, pos: DVec2, radius: f64) -> Option<Vec<PointId>> {
        let version = self.layout.geometry_version();
        self.projection.sync(&self.layout);
        if self.hover.as_ref().map(|(v, _)| *v) != Some(version) {
            self.hover = Some((version, HoverTree::build(self.projection.points())));
        }
        self.hover
            .as_ref()
            .and_then(|(_, tree)| tree.within(pos, radius))
            .map(<[PointId]>::to_vec)
    }
}
