use std::time::{Duration, Instant};

use glam::DVec2;

use crate::render::layout::{normalize_degrees, shortest_delta, AxisId, RadialLayout};

pub const DEFAULT_ANIMATION: Duration = Duration::from_millis(600);

/// Rotations closer than this are treated as equal.
const ANGLE_EPSILON: f64 = 1e-6;

/// Quadratic ease-in-out on `[0, 1]`.
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Angle of a center-relative pointer position, in degrees `[0, 360)`.
pub fn pointer_angle(pointer: DVec2) -> f64 {
    normalize_degrees(pointer.y.atan2(pointer.x).to_degrees())
}

/// Round an angle onto the nearest multiple of `spacing`.
fn snap_to_slot(angle: f64, spacing: f64) -> f64 {
    normalize_degrees((angle / spacing).round() * spacing)
}

/// Relative rotation of one axis: `angle(t) = start + delta * ease(t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAnimation {
    pub start: f64,
    pub delta: f64,
    pub started_at: Instant,
    pub duration: Duration,
}

impl AxisAnimation {
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn angle_at(&self, now: Instant) -> f64 {
        normalize_degrees(self.start + self.delta * ease_in_out(self.progress(now)))
    }

    pub fn finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    Clockwise,
    CounterClockwise,
}

impl SweepDirection {
    fn sign(self) -> f64 {
        match self {
            SweepDirection::Clockwise => 1.0,
            SweepDirection::CounterClockwise => -1.0,
        }
    }
}

/// Target slots computed for a released drag.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderPlan {
    pub direction: Option<SweepDirection>,
    pub num_steps: usize,
    pub targets: Vec<f64>,
}

/// Decide the new slot of every axis after `grabbed` was dragged from
/// `origin` to `rotation`.
///
/// The displacement is read clockwise when it is at most 180 degrees and
/// counter-clockwise otherwise. Every other axis lying between the origin and
/// the release angle (plus half a slot) moves one slot back against the drag,
/// and the grabbed axis advances by the number of slots vacated.
pub fn plan_reorder(targets: &[f64], grabbed: AxisId, origin: f64, rotation: f64) -> ReorderPlan {
    let n = targets.len();
    let mut planned = targets.to_vec();
    if grabbed >= n {
        return ReorderPlan { direction: None, num_steps: 0, targets: planned };
    }
    planned[grabbed] = origin;

    let raw = normalize_degrees(rotation - origin);
    if n < 2 || raw < ANGLE_EPSILON || 360.0 - raw < ANGLE_EPSILON {
        return ReorderPlan { direction: None, num_steps: 0, targets: planned };
    }

    let spacing = 360.0 / n as f64;
    let (direction, magnitude) = if raw <= 180.0 {
        (SweepDirection::Clockwise, raw)
    } else {
        (SweepDirection::CounterClockwise, 360.0 - raw)
    };
    let sign = direction.sign();

    let mut num_steps = 0usize;
    for (id, &target) in targets.iter().enumerate() {
        if id == grabbed {
            continue;
        }
        let rel = normalize_degrees((target - origin) * sign);
        if rel > ANGLE_EPSILON && rel < magnitude + spacing / 2.0 {
            planned[id] = snap_to_slot(target - sign * spacing, spacing);
            num_steps += 1;
        }
    }
    planned[grabbed] = snap_to_slot(origin + sign * num_steps as f64 * spacing, spacing);

    ReorderPlan {
        direction: Some(direction),
        num_steps,
        targets: planned,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReorderState {
    Idle,
    Dragging {
        axis: AxisId,
        origin_rotation: f64,
        /// Angle between the pointer and the axis at grab time.
        grab_offset: f64,
    },
    Animating,
}

/// Result of one animation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// Nothing was animating.
    Idle,
    /// Rotations moved; more frames are needed.
    Running,
    /// The last animation finished; rendering order has been re-sorted and
    /// polylines must be reconnected.
    Settled,
}

/// Drag-to-reorder state machine for the radial axes.
#[derive(Debug, Clone)]
pub struct ReorderController {
    state: ReorderState,
    animations: Vec<(AxisId, AxisAnimation)>,
    duration: Duration,
    /// A release happened and the axis order has not been re-sorted since.
    settle_pending: bool,
}

impl Default for ReorderController {
    fn default() -> Self {
        Self::new(DEFAULT_ANIMATION)
    }
}

impl ReorderController {
    pub fn new(duration: Duration) -> Self {
        Self {
            state: ReorderState::Idle,
            animations: Vec::new(),
            duration,
            settle_pending: false,
        }
    }

    pub fn state(&self) -> ReorderState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ReorderState::Dragging { .. })
    }

    pub fn is_animating(&self) -> bool {
        !self.animations.is_empty()
    }

    pub fn dragged_axis(&self) -> Option<AxisId> {
        match self.state {
            ReorderState::Dragging { axis, .. } => Some(axis),
            _ => None,
        }
    }

    /// Drop any drag and animation, e.g. after the axes were rebuilt.
    pub fn reset(&mut self) {
        self.state = ReorderState::Idle;
        self.animations.clear();
        self.settle_pending = false;
    }

    /// Grab `axis`. Ignored while another axis is being dragged.
    pub fn pointer_down(&mut self, layout: &RadialLayout, axis: AxisId, pointer: DVec2) -> bool {
        if self.is_dragging() {
            return false;
        }
        let Some(grabbed) = layout.axis(axis) else {
            return false;
        };
        // A grab mid-animation starts from the slot the axis was heading to.
        self.animations.retain(|(id, _)| *id != axis);
        self.state = ReorderState::Dragging {
            axis,
            origin_rotation: grabbed.target,
            grab_offset: shortest_delta(grabbed.rotation, pointer_angle(pointer)),
        };
        tracing::debug!(axis, origin = grabbed.target, "axis grabbed");
        true
    }

    /// Rotate the grabbed axis to follow the pointer. Ignored when not dragging.
    pub fn pointer_move(&mut self, layout: &mut RadialLayout, pointer: DVec2) {
        let ReorderState::Dragging { axis, grab_offset, .. } = self.state else {
            return;
        };
        if pointer.length_squared() < f64::EPSILON {
            return;
        }
        layout.set_rotation(axis, pointer_angle(pointer) - grab_offset);
    }

    /// Release the grabbed axis: compute the new slots and start animating
    /// every axis whose live rotation differs from its new target.
    pub fn pointer_up(&mut self, layout: &mut RadialLayout, now: Instant) -> Option<ReorderPlan> {
        let ReorderState::Dragging { axis, origin_rotation, .. } = self.state else {
            return None;
        };
        let Some(rotation) = layout.axis(axis).map(|a| a.rotation) else {
            self.state = ReorderState::Idle;
            return None;
        };

        let targets: Vec<f64> = layout.axes().iter().map(|a| a.target).collect();
        let plan = plan_reorder(&targets, axis, origin_rotation, rotation);

        for (id, &target) in plan.targets.iter().enumerate() {
            layout.set_target(id, target);
            let live = layout.axes()[id].rotation;
            let delta = shortest_delta(live, target);
            let retargeted = (targets[id] - target).abs() > ANGLE_EPSILON || id == axis;
            if retargeted && delta.abs() > ANGLE_EPSILON {
                // Restart from the live angle so a superseded animation never drifts.
                self.animations.retain(|(other, _)| *other != id);
                self.animations.push((id, AxisAnimation {
                    start: live,
                    delta,
                    started_at: now,
                    duration: self.duration,
                }));
            }
        }

        tracing::info!(
            axis,
            steps = plan.num_steps,
            direction = ?plan.direction,
            "axis released"
        );

        self.settle_pending = true;
        self.state = if self.animations.is_empty() {
            ReorderState::Idle
        } else {
            ReorderState::Animating
        };
        Some(plan)
    }

    /// Advance running animations to `now`.
    ///
    /// The order is re-sorted once nothing is animating or dragged after a
    /// release, even when that release started no animation of its own.
    pub fn tick(&mut self, layout: &mut RadialLayout, now: Instant) -> TickResult {
        if self.animations.is_empty() && !self.settle_pending {
            return TickResult::Idle;
        }

        for (id, animation) in &self.animations {
            let angle = if animation.finished(now) {
                layout.axis(*id).map(|a| a.target).unwrap_or(animation.start)
            } else {
                animation.angle_at(now)
            };
            layout.set_rotation(*id, angle);
        }
        self.animations.retain(|(_, animation)| !animation.finished(now));

        if !self.animations.is_empty() || self.is_dragging() {
            return TickResult::Running;
        }

        layout.settle();
        layout.sort_order();
        self.settle_pending = false;
        self.state = ReorderState::Idle;
        tracing::debug!(order = ?layout.order(), "axis order settled");
        TickResult::Settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(n: usize) -> RadialLayout {
        let mut layout = RadialLayout::default();
        let attrs: Vec<(usize, String)> = (0..n).map(|i| (i, format!("a{i}"))).collect();
        layout.rebuild(&attrs);
        layout.set_viewport(DVec2::new(400.0, 400.0), Instant::now());
        layout
    }

    fn at(deg: f64) -> DVec2 {
        crate::render::layout::direction(deg) * 100.0
    }

    /// Drag `axis` from its slot to `to` degrees and run the animation to the end.
    fn drag(ctrl: &mut ReorderController, layout: &mut RadialLayout, axis: AxisId, to: f64) -> ReorderPlan {
        let from = layout.axes()[axis].rotation;
        assert!(ctrl.pointer_down(layout, axis, at(from)));
        ctrl.pointer_move(layout, at(to));
        let now = Instant::now();
        let plan = ctrl.pointer_up(layout, now).unwrap();
        ctrl.tick(layout, now + DEFAULT_ANIMATION + Duration::from_millis(1));
        plan
    }

    fn sorted_targets(layout: &RadialLayout) -> Vec<f64> {
        let mut t: Vec<f64> = layout.axes().iter().map(|a| a.target).collect();
        t.sort_by(f64::total_cmp);
        t
    }

    #[test]
    fn test_ease_endpoints() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(1.0), 1.0);
        assert!((ease_in_out(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_small_drag_snaps_back() {
        let mut layout = layout(4);
        let mut ctrl = ReorderController::default();
        let plan = drag(&mut ctrl, &mut layout, 0, 30.0);
        assert_eq!(plan.num_steps, 0);
        assert_eq!(plan.direction, Some(SweepDirection::Clockwise));
        assert!(layout.axes()[0].rotation.abs() < 1e-9);
        assert_eq!(layout.order(), &[0, 1, 2, 3]);
        assert_eq!(ctrl.state(), ReorderState::Idle);
    }

    #[test]
    fn test_clockwise_drag_swaps_neighbor() {
        let mut layout = layout(4);
        let mut ctrl = ReorderController::default();
        let plan = drag(&mut ctrl, &mut layout, 0, 100.0);
        assert_eq!(plan.num_steps, 1);
        assert_eq!(layout.axes()[0].rotation, 90.0);
        assert_eq!(layout.axes()[1].rotation, 0.0);
        assert_eq!(layout.order(), &[1, 0, 2, 3]);
    }

    #[test]
    fn test_counter_clockwise_drag() {
        let mut layout = layout(4);
        let mut ctrl = ReorderController::default();
        let plan = drag(&mut ctrl, &mut layout, 0, 170.0 + 90.0);
        assert_eq!(plan.direction, Some(SweepDirection::CounterClockwise));
        assert_eq!(plan.num_steps, 1);
        assert_eq!(layout.axes()[0].rotation, 270.0);
        assert_eq!(layout.axes()[3].rotation, 0.0);
    }

    #[test]
    fn test_multi_step_drag() {
        let mut layout = layout(6);
        let mut ctrl = ReorderController::default();
        // Spacing 60: passing axes at 60 and 120 lands on 120.
        let plan = drag(&mut ctrl, &mut layout, 0, 130.0);
        assert_eq!(plan.num_steps, 2);
        assert_eq!(layout.axes()[0].rotation, 120.0);
        assert_eq!(layout.axes()[1].rotation, 0.0);
        assert_eq!(layout.axes()[2].rotation, 60.0);
    }

    #[test]
    fn test_zero_displacement_keeps_order() {
        let mut layout = layout(3);
        let mut ctrl = ReorderController::default();
        assert!(ctrl.pointer_down(&layout, 1, at(120.0)));
        let plan = ctrl.pointer_up(&mut layout, Instant::now()).unwrap();
        assert_eq!(plan.direction, None);
        assert_eq!(plan.num_steps, 0);
        assert!(!ctrl.is_animating());
        assert_eq!(layout.order(), &[0, 1, 2]);
    }

    #[test]
    fn test_targets_stay_a_permutation_of_slots() {
        let mut layout = layout(5);
        let mut ctrl = ReorderController::default();
        let slots = layout.slot_angles();
        for (axis, to) in [(0, 200.0), (3, 10.0), (2, 359.0), (4, 95.0), (1, 181.0)] {
            drag(&mut ctrl, &mut layout, axis, to);
            let targets = sorted_targets(&layout);
            for (t, s) in targets.iter().zip(&slots) {
                assert!((t - s).abs() < 1e-9, "targets {targets:?} vs slots {slots:?}");
            }
        }
    }

    #[test]
    fn test_move_while_idle_is_ignored() {
        let mut layout = layout(3);
        let mut ctrl = ReorderController::default();
        ctrl.pointer_move(&mut layout, at(45.0));
        assert_eq!(layout.axes()[0].rotation, 0.0);
        assert!(ctrl.pointer_up(&mut layout, Instant::now()).is_none());
    }

    #[test]
    fn test_single_drag_at_a_time() {
        let layout = layout(3);
        let mut ctrl = ReorderController::default();
        assert!(ctrl.pointer_down(&layout, 0, at(0.0)));
        assert!(!ctrl.pointer_down(&layout, 1, at(120.0)));
        assert_eq!(ctrl.dragged_axis(), Some(0));
    }

    #[test]
    fn test_single_axis_is_noop() {
        let mut layout = layout(1);
        let mut ctrl = ReorderController::default();
        let plan = drag(&mut ctrl, &mut layout, 0, 90.0);
        assert_eq!(plan.num_steps, 0);
        assert!(layout.axes()[0].rotation.abs() < 1e-9);
    }

    #[test]
    fn test_animation_is_eased_and_relative() {
        let mut layout = layout(4);
        let mut ctrl = ReorderController::default();
        ctrl.pointer_down(&layout, 0, at(0.0));
        ctrl.pointer_move(&mut layout, at(100.0));
        let t0 = Instant::now();
        ctrl.pointer_up(&mut layout, t0);
        assert_eq!(ctrl.state(), ReorderState::Animating);

        assert_eq!(ctrl.tick(&mut layout, t0 + DEFAULT_ANIMATION / 2), TickResult::Running);
        // Axis 0 goes 100 -> 90, halfway through the ease.
        assert!((layout.axes()[0].rotation - 95.0).abs() < 1e-6);
        // Axis 1 goes 90 -> 0.
        assert!((layout.axes()[1].rotation - 45.0).abs() < 1e-6);

        assert_eq!(ctrl.tick(&mut layout, t0 + DEFAULT_ANIMATION), TickResult::Settled);
        assert_eq!(ctrl.tick(&mut layout, t0 + DEFAULT_ANIMATION * 2), TickResult::Idle);
    }

    #[test]
    fn test_regrab_during_animation_uses_target_slot() {
        let mut layout = layout(4);
        let mut ctrl = ReorderController::default();
        ctrl.pointer_down(&layout, 0, at(0.0));
        ctrl.pointer_move(&mut layout, at(100.0));
        let t0 = Instant::now();
        ctrl.pointer_up(&mut layout, t0);
        ctrl.tick(&mut layout, t0 + DEFAULT_ANIMATION / 2);

        // Grab axis 1 mid-flight (heading to 0) and drop it straight away.
        let live = layout.axes()[1].rotation;
        assert!(ctrl.pointer_down(&layout, 1, at(live)));
        match ctrl.state() {
            ReorderState::Dragging { origin_rotation, .. } => assert_eq!(origin_rotation, 0.0),
            other => panic!("unexpected state {other:?}"),
        }
        let plan = ctrl.pointer_up(&mut layout, t0 + DEFAULT_ANIMATION / 2).unwrap();
        // The live angle sits 45 degrees clockwise of its slot: snapped back.
        assert_eq!(plan.num_steps, 0);
        ctrl.tick(&mut layout, t0 + DEFAULT_ANIMATION * 3);
        let targets = sorted_targets(&layout);
        assert_eq!(targets, vec![0.0, 90.0, 180.0, 270.0]);
        assert_eq!(layout.axes()[1].rotation, 0.0);
    }

    #[test]
    fn test_release_while_others_finish_still_resorts() {
        let mut layout = layout(4);
        let mut ctrl = ReorderController::default();
        ctrl.pointer_down(&layout, 0, at(0.0));
        ctrl.pointer_move(&mut layout, at(100.0));
        let t0 = Instant::now();
        ctrl.pointer_up(&mut layout, t0);
        assert_eq!(ctrl.tick(&mut layout, t0 + Duration::from_millis(100)), TickResult::Running);

        // Hold axis 2 until the swap has finished, then drop it where it was.
        assert!(ctrl.pointer_down(&layout, 2, at(180.0)));
        assert_eq!(ctrl.tick(&mut layout, t0 + Duration::from_millis(1200)), TickResult::Running);
        assert_eq!(layout.order(), &[0, 1, 2, 3]);
        let plan = ctrl.pointer_up(&mut layout, t0 + Duration::from_millis(1300)).unwrap();
        assert_eq!(plan.num_steps, 0);
        assert!(!ctrl.is_animating());

        assert_eq!(ctrl.tick(&mut layout, t0 + Duration::from_millis(1310)), TickResult::Settled);
        assert_eq!(ctrl.tick(&mut layout, t0 + Duration::from_millis(1320)), TickResult::Idle);
        assert_eq!(layout.order(), &[1, 0, 2, 3]);
        let rotations: Vec<f64> = layout.axes().iter().map(|a| a.rotation).collect();
        assert_eq!(rotations, vec![90.0, 0.0, 180.0, 270.0]);
    }
}
