use glam::DVec2;

use crate::render::projection::Projection;
use crate::state::dataset::Dataset;

/// How a rubber-band selection combines with the existing highlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionModifier {
    /// Clear everything, then highlight the hits.
    #[default]
    Replace,
    Add,
    Subtract,
}

impl SelectionModifier {
    /// Shift adds, Ctrl/Cmd subtracts, anything else replaces.
    pub fn from_keys(shift: bool, command: bool) -> Self {
        match (shift, command) {
            (true, false) => SelectionModifier::Add,
            (false, true) => SelectionModifier::Subtract,
            _ => SelectionModifier::Replace,
        }
    }
}

/// Axis-aligned rectangle in center-relative plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectRect {
    pub min: DVec2,
    pub max: DVec2,
}

impl SelectRect {
    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    pub fn area(&self) -> f64 {
        let size = self.max - self.min;
        size.x * size.y
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    fn corners(&self) -> [DVec2; 4] {
        [
            self.min,
            DVec2::new(self.max.x, self.min.y),
            self.max,
            DVec2::new(self.min.x, self.max.y),
        ]
    }

    /// True if any part of segment `a..b` lies inside or on the rectangle.
    pub fn intersects_segment(&self, a: DVec2, b: DVec2) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }
        // Quick reject on bounding boxes.
        if a.x.max(b.x) < self.min.x
            || a.x.min(b.x) > self.max.x
            || a.y.max(b.y) < self.min.y
            || a.y.min(b.y) > self.max.y
        {
            return false;
        }
        let c = self.corners();
        (0..4).any(|i| segments_intersect(a, b, c[i], c[(i + 1) % 4]))
    }
}

fn orientation(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

fn on_segment(a: DVec2, b: DVec2, p: DVec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Segment intersection including touching and collinear overlap.
fn segments_intersect(p1: DVec2, p2: DVec2, q1: DVec2, q2: DVec2) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Sent to selection listeners after every effective change.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEvent {
    /// `None` when the selection was cleared.
    pub modifier: Option<SelectionModifier>,
    /// Number of polylines hit by the gesture.
    pub hits: usize,
    /// Number of polylines highlighted afterwards.
    pub highlighted: usize,
}

type SelectionListener = Box<dyn FnMut(&SelectionEvent)>;

/// Applies rubber-band selections to the polylines of a projection.
#[derive(Default)]
pub struct SelectionEngine {
    listeners: Vec<SelectionListener>,
}

impl std::fmt::Debug for SelectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionEngine")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_selection_changed(&mut self, listener: impl FnMut(&SelectionEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, event: SelectionEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Highlight (or un-highlight) every polyline with a segment touching
    /// `rect`. Zero-area rectangles are ignored. Returns the number of hits.
    pub fn select_area(
        &mut self,
        projection: &mut Projection,
        rect: SelectRect,
        modifier: SelectionModifier,
    ) -> usize {
        if rect.area() <= 0.0 {
            return 0;
        }

        let hit: Vec<bool> = projection
            .polylines()
            .iter()
            .map(|line| {
                line.segments.iter().any(|seg| {
                    let (a, b) = projection.segment_endpoints(seg);
                    rect.intersects_segment(a, b)
                })
            })
            .collect();
        let hits = hit.iter().filter(|h| **h).count();

        for (line, hit) in projection.polylines_mut().iter_mut().zip(hit) {
            match modifier {
                SelectionModifier::Replace => line.highlighted = hit,
                SelectionModifier::Add => line.highlighted |= hit,
                SelectionModifier::Subtract => line.highlighted &= !hit,
            }
        }

        let highlighted = count_highlighted(projection);
        tracing::debug!(?modifier, hits, highlighted, "area selected");
        self.notify(SelectionEvent {
            modifier: Some(modifier),
            hits,
            highlighted,
        });
        hits
    }

    /// Remove every highlight.
    pub fn clear(&mut self, projection: &mut Projection) {
        if count_highlighted(projection) == 0 {
            return;
        }
        for line in projection.polylines_mut() {
            line.highlighted = false;
        }
        self.notify(SelectionEvent {
            modifier: None,
            hits: 0,
            highlighted: 0,
        });
    }

    /// Dataset row indices of the highlighted polylines.
    pub fn highlighted_rows(&self, projection: &Projection) -> Vec<usize> {
        projection
            .polylines()
            .iter()
            .filter(|l| l.highlighted)
            .map(|l| l.source)
            .collect()
    }

    /// Fraction of the active rows of class `label` that are highlighted.
    pub fn selection_stats(&self, projection: &Projection, dataset: &Dataset, label: &str) -> f64 {
        let total = dataset.count_active(label);
        if total == 0 {
            return 0.0;
        }
        let highlighted = projection
            .polylines()
            .iter()
            .filter(|l| l.highlighted && l.label == label)
            .count();
        highlighted as f64 / total as f64
    }
}

fn count_highlighted(projection: &Projection) -> usize {
    projection.polylines().iter().filter(|l| l.highlighted).count()
}
