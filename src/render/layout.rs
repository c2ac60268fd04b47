use std::time::{Duration, Instant};

use glam::DVec2;

/// Index of an axis in creation order. Stable until the next rebuild.
pub type AxisId = usize;

pub const DEFAULT_PADDING: f64 = 30.0;
pub const DEFAULT_RESIZE_DELAY: Duration = Duration::from_millis(150);

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Shortest signed difference `to - from` in degrees, in `(-180, 180]`.
pub fn shortest_delta(from: f64, to: f64) -> f64 {
    let d = normalize_degrees(to - from);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Unit vector for an angle in degrees. Screen space: y points down, so
/// increasing angles turn clockwise.
pub fn direction(deg: f64) -> DVec2 {
    DVec2::from_angle(deg.to_radians())
}

/// One spoke of the star plot.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Index of the attribute this axis draws.
    pub attribute: usize,
    pub name: String,
    /// Live rotation in degrees, moved by dragging and animation.
    pub rotation: f64,
    /// Slot the axis rests in or is animating toward.
    pub target: f64,
}

impl Axis {
    pub fn direction(&self) -> DVec2 {
        direction(self.rotation)
    }
}

/// Coalesces bursts of resize events into one deferred redraw.
#[derive(Debug, Clone)]
pub struct ResizeDebounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl ResizeDebounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    /// Restart the delay from `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// True exactly once after the delay has elapsed since the last schedule.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}

/// Angular positions and lengths of all axes around a common center.
///
/// Geometry is expressed relative to the center. Every change to the drawn
/// length or a rotation bumps `geometry_version`, which projections compare
/// against to decide whether their cached points are stale.
///
/// `length` follows the viewport at once and drives hit-testing;
/// `drawn_length` only catches up once the resize debounce fires.
#[derive(Debug, Clone)]
pub struct RadialLayout {
    axes: Vec<Axis>,
    order: Vec<AxisId>,
    viewport: DVec2,
    padding: f64,
    length: f64,
    drawn_length: f64,
    geometry_version: u64,
    resize: ResizeDebounce,
    hovered: Option<AxisId>,
}

impl Default for RadialLayout {
    fn default() -> Self {
        Self::new(DEFAULT_PADDING, DEFAULT_RESIZE_DELAY)
    }
}

impl RadialLayout {
    pub fn new(padding: f64, resize_delay: Duration) -> Self {
        Self {
            axes: Vec::new(),
            order: Vec::new(),
            viewport: DVec2::ZERO,
            padding,
            length: 0.0,
            drawn_length: 0.0,
            geometry_version: 0,
            resize: ResizeDebounce::new(resize_delay),
            hovered: None,
        }
    }

    /// Replace the axis set. `attributes` are `(attribute index, name)` pairs.
    ///
    /// When the axis count is unchanged the new axes inherit the previous
    /// rotations index by index, so a reload keeps the user's orientation.
    pub fn rebuild(&mut self, attributes: &[(usize, String)]) {
        let n = attributes.len();
        let seeded: Option<Vec<f64>> = (n > 0 && n == self.axes.len())
            .then(|| self.axes.iter().map(|a| a.target).collect());
        let spacing = if n > 0 { 360.0 / n as f64 } else { 0.0 };

        self.axes = attributes
            .iter()
            .enumerate()
            .map(|(i, (attribute, name))| {
                let angle = seeded
                    .as_ref()
                    .map(|s| s[i])
                    .unwrap_or(i as f64 * spacing);
                Axis {
                    attribute: *attribute,
                    name: name.clone(),
                    rotation: angle,
                    target: angle,
                }
            })
            .collect();
        self.hovered = None;
        self.sort_order();
        tracing::debug!(axes = n, seeded = seeded.is_some(), "axes rebuilt");
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, id: AxisId) -> Option<&Axis> {
        self.axes.get(id)
    }

    /// Axis ids in circular rendering order.
    pub fn order(&self) -> &[AxisId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Angular distance between neighboring slots.
    pub fn spacing(&self) -> f64 {
        if self.axes.is_empty() {
            0.0
        } else {
            360.0 / self.axes.len() as f64
        }
    }

    /// The evenly spaced slot angles `0, s, 2s, ...`.
    pub fn slot_angles(&self) -> Vec<f64> {
        let spacing = self.spacing();
        (0..self.axes.len()).map(|i| i as f64 * spacing).collect()
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Length the axes and points are drawn at.
    pub fn drawn_length(&self) -> f64 {
        self.drawn_length
    }

    pub fn viewport(&self) -> DVec2 {
        self.viewport
    }

    pub fn geometry_version(&self) -> u64 {
        self.geometry_version
    }

    /// Update the viewport size. The hit-testing length applies immediately;
    /// the drawn length waits for the resize debounce, except for the first
    /// sizing of an undrawn layout.
    pub fn set_viewport(&mut self, size: DVec2, now: Instant) {
        if size == self.viewport {
            return;
        }
        self.viewport = size;
        self.length = (size.x.min(size.y) / 2.0 - self.padding).max(0.0);
        if self.drawn_length == 0.0 {
            self.commit_length();
        } else {
            self.resize.schedule(now);
        }
    }

    /// Apply the pending length once the resize delay has elapsed after the
    /// last viewport change. Returns whether it was applied.
    pub fn poll_resize(&mut self, now: Instant) -> bool {
        if !self.resize.poll(now) {
            return false;
        }
        self.commit_length();
        true
    }

    fn commit_length(&mut self) {
        if self.drawn_length != self.length {
            self.drawn_length = self.length;
            self.geometry_version += 1;
        }
    }

    pub fn resize_pending(&self, now: Instant) -> Option<Duration> {
        self.resize.remaining(now)
    }

    pub fn set_rotation(&mut self, id: AxisId, deg: f64) {
        if let Some(axis) = self.axes.get_mut(id) {
            axis.rotation = normalize_degrees(deg);
            self.geometry_version += 1;
        }
    }

    pub fn set_target(&mut self, id: AxisId, deg: f64) {
        if let Some(axis) = self.axes.get_mut(id) {
            axis.target = normalize_degrees(deg);
        }
    }

    /// Snap every live rotation onto its target.
    pub fn settle(&mut self) {
        for axis in &mut self.axes {
            axis.rotation = axis.target;
        }
        self.geometry_version += 1;
    }

    /// Recompute the rendering order from live rotations.
    pub fn sort_order(&mut self) {
        let mut order: Vec<AxisId> = (0..self.axes.len()).collect();
        order.sort_by(|&a, &b| {
            self.axes[a]
                .rotation
                .total_cmp(&self.axes[b].rotation)
                .then(a.cmp(&b))
        });
        self.order = order;
        self.geometry_version += 1;
    }

    /// Drawn end point of an axis relative to the center.
    pub fn tip(&self, id: AxisId) -> Option<DVec2> {
        self.axes.get(id).map(|a| a.direction() * self.drawn_length)
    }

    /// Axis whose spoke passes within `tolerance` of `point` (center-relative).
    pub fn axis_at(&self, point: DVec2, tolerance: f64) -> Option<AxisId> {
        self.axes
            .iter()
            .enumerate()
            .map(|(id, axis)| {
                let dir = axis.direction();
                let along = point.dot(dir).clamp(0.0, self.length);
                (id, point.distance(dir * along))
            })
            .filter(|&(_, dist)| dist <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn hovered(&self) -> Option<AxisId> {
        self.hovered
    }

    pub fn set_hovered(&mut self, id: Option<AxisId>) {
        self.hovered = id;
    }
}
