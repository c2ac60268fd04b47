use glam::DVec2;

use crate::render::layout::{direction, AxisId, RadialLayout};
use crate::state::dataset::NormalizedRow;

pub type PointId = usize;

/// Position of a normalized value on an axis, relative to the plot center.
/// Missing values sit on the center.
pub fn project(value: Option<f64>, length: f64, rotation: f64) -> DVec2 {
    direction(rotation) * (value.unwrap_or(0.0) * length)
}

/// One row's value on one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotPoint {
    pub axis: AxisId,
    pub polyline: usize,
    pub value: Option<f64>,
    pub pos: DVec2,
}

/// Line between two points of the same polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: PointId,
    pub end: PointId,
}

/// Closed line through one row's points on every axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    /// Index of the row in the dataset's full row set.
    pub source: usize,
    pub label: String,
    /// Point handles indexed by axis id.
    pub points: Vec<PointId>,
    pub segments: Vec<Segment>,
    pub highlighted: bool,
}

/// Arena of plotted points and polylines derived from the normalized rows and
/// the current axis geometry.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    points: Vec<PlotPoint>,
    polylines: Vec<Polyline>,
    /// Layout geometry version the point positions were computed for.
    synced_version: Option<u64>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every point and polyline from scratch.
    pub fn build(&mut self, rows: &[NormalizedRow], layout: &RadialLayout) {
        self.points.clear();
        self.polylines.clear();
        self.synced_version = None;

        if layout.is_empty() {
            return;
        }

        for (line_idx, row) in rows.iter().enumerate() {
            let first = self.points.len();
            for (axis_id, axis) in layout.axes().iter().enumerate() {
                let value = row.values.get(axis.attribute).and_then(|v| v.as_f64());
                self.points.push(PlotPoint {
                    axis: axis_id,
                    polyline: line_idx,
                    value,
                    pos: DVec2::ZERO,
                });
            }
            let points: Vec<PointId> = (first..self.points.len()).collect();
            let segments = points
                .iter()
                .map(|&start| Segment { start, end: start })
                .collect();
            self.polylines.push(Polyline {
                source: row.source,
                label: row.label.clone(),
                points,
                segments,
                highlighted: false,
            });
        }

        self.reparent(layout);
        self.sync(layout);
    }

    /// Recompute point positions if the layout geometry changed since the
    /// last sync. Returns whether anything was recomputed.
    pub fn sync(&mut self, layout: &RadialLayout) -> bool {
        let version = layout.geometry_version();
        if self.synced_version == Some(version) {
            return false;
        }
        let length = layout.drawn_length();
        for point in &mut self.points {
            if let Some(axis) = layout.axis(point.axis) {
                point.pos = project(point.value, length, axis.rotation);
            }
        }
        self.synced_version = Some(version);
        true
    }

    /// Reconnect every polyline following the live circular axis order:
    /// segments are sorted by the rotation of their start axis and each one
    /// ends where the next one starts.
    pub fn reparent(&mut self, layout: &RadialLayout) {
        let rotation_of = |points: &[PlotPoint], id: PointId| {
            layout
                .axis(points[id].axis)
                .map(|a| a.rotation)
                .unwrap_or(0.0)
        };

        for polyline in &mut self.polylines {
            let segments = &mut polyline.segments;
            segments.sort_by(|a, b| {
                rotation_of(&self.points, a.start)
                    .total_cmp(&rotation_of(&self.points, b.start))
                    .then(self.points[a.start].axis.cmp(&self.points[b.start].axis))
            });
            let n = segments.len();
            for i in 0..n {
                segments[i].end = segments[(i + 1) % n].start;
            }
        }
    }

    pub fn points(&self) -> &[PlotPoint] {
        &self.points
    }

    pub fn point(&self, id: PointId) -> &PlotPoint {
        &self.points[id]
    }

    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    pub fn polylines_mut(&mut self) -> &mut [Polyline] {
        &mut self.polylines
    }

    pub fn segment_endpoints(&self, segment: &Segment) -> (DVec2, DVec2) {
        (self.points[segment.start].pos, self.points[segment.end].pos)
    }

    /// Whether following segment ends from any start visits every point of
    /// the polyline exactly once before returning.
    pub fn is_closed(&self, polyline: &Polyline) -> bool {
        let n = polyline.segments.len();
        if n == 0 || n != polyline.points.len() {
            return false;
        }
        let Some(first) = polyline.segments.first() else {
            return false;
        };
        let mut current = first.start;
        for step in 0..n {
            let Some(seg) = polyline.segments.iter().find(|s| s.start == current) else {
                return false;
            };
            current = seg.end;
            if current == first.start {
                return step == n - 1;
            }
        }
        false
    }
}
