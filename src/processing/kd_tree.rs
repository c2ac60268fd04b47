use std::collections::HashMap;

use glam::DVec2;
use kiddo::KdTree;
use kiddo::SquaredEuclidean;

use crate::render::projection::{PlotPoint, PointId};

/// Positions are turned by this many radians before insertion so points on
/// a horizontal or vertical spoke never share a split coordinate. Rotation
/// keeps distances, so lookups are unaffected.
const TILT: f64 = 1.0;

/// 2D KD-tree over plotted points for nearest-point hover lookup.
///
/// Points stacked on the same spot share one tree entry; the entry's item
/// indexes the stack, in point order.
pub struct HoverTree {
    tree: KdTree<f64, 2>,
    stacks: Vec<Vec<PointId>>,
    tilt: DVec2,
}

impl HoverTree {
    /// Build from projected points. Only finite positions are kept.
    pub fn build(points: &[PlotPoint]) -> Self {
        let tilt = DVec2::from_angle(TILT);
        let mut tree: KdTree<f64, 2> = KdTree::new();
        let mut stacks: Vec<Vec<PointId>> = Vec::new();
        let mut by_spot: HashMap<(i64, i64), usize> = HashMap::new();

        for (id, point) in points.iter().enumerate() {
            let pos = point.pos;
            if !pos.is_finite() {
                continue;
            }
            let key = ((pos.x * 1e6).round() as i64, (pos.y * 1e6).round() as i64);
            if let Some(&stack) = by_spot.get(&key) {
                stacks[stack].push(id);
                continue;
            }
            by_spot.insert(key, stacks.len());
            let p = tilt.rotate(pos);
            tree.add(&[p.x, p.y], stacks.len() as u64);
            stacks.push(vec![id]);
        }

        Self { tree, stacks, tilt }
    }

    pub fn len(&self) -> usize {
        self.tree.size() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nearest spot to `query` as `(stacked point ids, distance)`.
    pub fn nearest(&self, query: DVec2) -> Option<(&[PointId], f64)> {
        if self.is_empty() {
            return None;
        }
        let q = self.tilt.rotate(query);
        let result = self.tree.nearest_one::<SquaredEuclidean>(&[q.x, q.y]);
        let stack = self.stacks.get(result.item as usize)?;
        Some((stack.as_slice(), result.distance.sqrt()))
    }

    /// Points at the nearest spot no farther than `radius` from `query`.
    pub fn within(&self, query: DVec2, radius: f64) -> Option<&[PointId]> {
        self.nearest(query)
            .filter(|&(_, dist)| dist <= radius)
            .map(|(ids, _)| ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64) -> PlotPoint {
        PlotPoint {
            axis: 0,
            polyline: 0,
            value: Some(0.0),
            pos: DVec2::new(x, y),
        }
    }

    #[test]
    fn test_nearest() {
        let tree = HoverTree::build(&[point(0.0, 0.0), point(10.0, 0.0), point(0.0, 10.0)]);
        let (ids, dist) = tree.nearest(DVec2::new(9.0, 1.0)).unwrap();
        assert_eq!(ids, &[1]);
        assert!((dist - 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(tree.within(DVec2::new(5.0, 5.0), 3.0), None);
    }

    #[test]
    fn test_collinear_and_stacked_points() {
        // Many points on the horizontal spoke plus a pile at the center.
        let mut points: Vec<PlotPoint> = (0..200).map(|i| point(i as f64 * 0.5, 0.0)).collect();
        points.extend((0..100).map(|_| point(0.0, 0.0)));
        let tree = HoverTree::build(&points);
        assert_eq!(tree.len(), 200);
        assert_eq!(tree.within(DVec2::new(50.2, 0.1), 1.0), Some(&[100][..]));
    }

    #[test]
    fn test_stacked_points_are_all_reported() {
        let tree = HoverTree::build(&[point(3.0, 4.0), point(10.0, 0.0), point(3.0, 4.0), point(3.0, 4.0)]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.within(DVec2::new(3.5, 4.0), 1.0), Some(&[0, 2, 3][..]));
        assert_eq!(tree.within(DVec2::new(10.0, 0.5), 1.0), Some(&[1][..]));
    }

    #[test]
    fn test_empty() {
        let tree = HoverTree::build(&[point(f64::NAN, 0.0)]);
        assert!(tree.is_empty());
        assert_eq!(tree.nearest(DVec2::ZERO), None);
    }
}
