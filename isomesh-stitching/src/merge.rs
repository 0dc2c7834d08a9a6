//! Tolerance-based geometric point merging
//!
//! Points are visited in index order. A point joins the lowest-indexed
//! existing master within the merge distance, or becomes a new master. Two
//! masters are therefore always further apart than the merge distance,
//! which makes merging idempotent.

use isomesh_core::Point3d;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A master point in the merge tree
#[derive(Debug, Clone, Copy, PartialEq)]
struct MasterPoint {
    position: [f64; 3],
    index: usize,
}

impl RTreeObject for MasterPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for MasterPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Result of [`merge_points`]
#[derive(Debug, Clone, PartialEq)]
pub struct MergedPoints {
    /// Merged point for every input point
    pub old_to_new: Vec<usize>,
    /// Merged positions (the position of each cluster's first point)
    pub points: Vec<Point3d>,
    /// First input point of every merged point
    pub new_to_old: Vec<usize>,
}

impl MergedPoints {
    /// True if any two input points were merged
    pub fn has_merged(&self) -> bool {
        self.points.len() < self.old_to_new.len()
    }
}

/// Merge points closer than `distance` to each other
pub fn merge_points(points: &[Point3d], distance: f64) -> MergedPoints {
    let distance_sqr = distance * distance;
    let mut tree: RTree<MasterPoint> = RTree::new();

    let mut old_to_new = Vec::with_capacity(points.len());
    let mut merged = Vec::new();
    let mut new_to_old = Vec::new();

    for (i, p) in points.iter().enumerate() {
        let query = [p.x, p.y, p.z];
        let master = tree
            .locate_within_distance(query, distance_sqr)
            .map(|m| m.index)
            .min();

        match master {
            Some(index) => old_to_new.push(index),
            None => {
                let index = merged.len();
                tree.insert(MasterPoint {
                    position: query,
                    index,
                });
                merged.push(*p);
                new_to_old.push(i);
                old_to_new.push(index);
            }
        }
    }

    MergedPoints {
        old_to_new,
        points: merged,
        new_to_old,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_merges_within_distance() {
        let points = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1e-9, 0.0, 0.0),
            Point3d::new(1.0, 5e-10, 0.0),
            Point3d::new(2.0, 0.0, 0.0),
        ];
        let merged = merge_points(&points, 1e-6);
        assert_eq!(merged.points.len(), 3);
        assert_eq!(merged.old_to_new, vec![0, 1, 0, 1, 2]);
        assert_eq!(merged.new_to_old, vec![0, 1, 4]);
        assert_eq!(merged.points[0], points[0]);
        assert!(merged.has_merged());
    }

    #[test]
    fn test_chain_joins_first_master() {
        // 0 -- 1 -- 2 spaced just under the distance: 1 joins 0, 2 is out of
        // reach of master 0 and starts its own cluster
        let points = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(0.9, 0.0, 0.0),
            Point3d::new(1.8, 0.0, 0.0),
        ];
        let merged = merge_points(&points, 1.0);
        assert_eq!(merged.old_to_new, vec![0, 0, 1]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut points = Vec::new();
        for _ in 0..500 {
            let p = Point3d::new(
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
            );
            points.push(p);
            // near-duplicates of some points
            if rng.gen_bool(0.3) {
                points.push(p + isomesh_core::Vector3d::new(rng.gen_range(-1e-4..1e-4), 0.0, 0.0));
            }
        }

        let distance = 0.02;
        let once = merge_points(&points, distance);
        let twice = merge_points(&once.points, distance);

        assert!(once.has_merged());
        assert!(!twice.has_merged());
        assert_eq!(twice.points, once.points);
    }

    #[test]
    fn test_empty_input() {
        let merged = merge_points(&[], 1.0);
        assert!(merged.points.is_empty());
        assert!(!merged.has_merged());
    }
}
