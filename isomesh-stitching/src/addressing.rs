//! Edge addressing and connected regions of triangle surfaces

use isomesh_core::TriSurface;
use itertools::Itertools;
use std::collections::{HashMap, VecDeque};

/// Edges of a triangle surface and the triangles using them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeAddressing {
    /// Vertex pair of every edge, smaller index first
    pub edges: Vec<(usize, usize)>,
    /// Edge starting at each corner of every triangle
    pub face_edges: Vec<[usize; 3]>,
    /// Triangles using every edge, in ascending order
    pub edge_faces: Vec<Vec<usize>>,
}

impl EdgeAddressing {
    pub fn new(surface: &TriSurface) -> Self {
        let mut edge_index: HashMap<(usize, usize), usize> = HashMap::new();
        let mut addressing = EdgeAddressing::default();

        for (tri_idx, tri) in surface.triangles.iter().enumerate() {
            let mut f_edges = [0; 3];
            for (fp, (a, b)) in tri
                .vertices
                .iter()
                .copied()
                .circular_tuple_windows()
                .enumerate()
            {
                let key = (a.min(b), a.max(b));
                let edge_idx = *edge_index.entry(key).or_insert_with(|| {
                    addressing.edges.push(key);
                    addressing.edge_faces.push(Vec::new());
                    addressing.edges.len() - 1
                });
                addressing.edge_faces[edge_idx].push(tri_idx);
                f_edges[fp] = edge_idx;
            }
            addressing.face_edges.push(f_edges);
        }
        addressing
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// Edges used by more than two triangles
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = usize> + '_ {
        self.edge_faces
            .iter()
            .enumerate()
            .filter(|(_, faces)| faces.len() > 2)
            .map(|(edge_idx, _)| edge_idx)
    }

    /// Triangles sharing an edge with `tri_idx`, in edge order
    pub fn face_faces(&self, tri_idx: usize) -> Vec<usize> {
        let mut nbrs = Vec::new();
        for &edge_idx in &self.face_edges[tri_idx] {
            for &other in &self.edge_faces[edge_idx] {
                if other != tri_idx && !nbrs.contains(&other) {
                    nbrs.push(other);
                }
            }
        }
        nbrs
    }
}

/// Edge-connected regions of a surface
#[derive(Debug, Clone, PartialEq)]
pub struct Zones {
    pub n_zones: usize,
    /// Zone of every triangle
    pub zone: Vec<usize>,
}

/// Split the triangles into regions connected through shared edges
pub fn mark_zones(surface: &TriSurface) -> Zones {
    let addressing = EdgeAddressing::new(surface);
    let n = surface.triangles.len();
    let mut zone = vec![usize::MAX; n];
    let mut n_zones = 0;
    let mut queue = VecDeque::new();

    for seed in 0..n {
        if zone[seed] != usize::MAX {
            continue;
        }
        zone[seed] = n_zones;
        queue.push_back(seed);

        while let Some(tri_idx) = queue.pop_front() {
            for nbr in addressing.face_faces(tri_idx) {
                if zone[nbr] == usize::MAX {
                    zone[nbr] = n_zones;
                    queue.push_back(nbr);
                }
            }
        }
        n_zones += 1;
    }

    Zones { n_zones, zone }
}

/// The two vertices shared by two triangles, if they share an edge
pub fn common_edge(surface: &TriSurface, a: usize, b: usize) -> Option<(usize, usize)> {
    let ta = &surface.triangles[a];
    let tb = &surface.triangles[b];
    let shared: Vec<usize> = ta
        .vertices
        .iter()
        .copied()
        .filter(|v| tb.vertices.contains(v))
        .collect();
    match shared.as_slice() {
        [p, q] => Some((*p, *q)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isomesh_core::{LabelledTri, Point3d};

    fn make_strip_and_island() -> TriSurface {
        TriSurface::from_points_and_triangles(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(1.0, 1.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
                Point3d::new(5.0, 0.0, 0.0),
                Point3d::new(6.0, 0.0, 0.0),
                Point3d::new(5.0, 1.0, 0.0),
            ],
            vec![
                LabelledTri::new(0, 1, 2),
                LabelledTri::new(0, 2, 3),
                LabelledTri::new(4, 5, 6),
            ],
        )
    }

    #[test]
    fn test_edge_addressing() {
        let surf = make_strip_and_island();
        let addr = EdgeAddressing::new(&surf);
        assert_eq!(addr.n_edges(), 8);
        let diagonal = addr.face_edges[0][2];
        assert_eq!(addr.edges[diagonal], (0, 2));
        assert_eq!(addr.edge_faces[diagonal], vec![0, 1]);
        assert_eq!(addr.face_faces(0), vec![1]);
        assert_eq!(addr.non_manifold_edges().count(), 0);
    }

    #[test]
    fn test_zones() {
        let surf = make_strip_and_island();
        let zones = mark_zones(&surf);
        assert_eq!(zones.n_zones, 2);
        assert_eq!(zones.zone, vec![0, 0, 1]);
    }

    #[test]
    fn test_point_contact_is_not_connected() {
        let surf = TriSurface::from_points_and_triangles(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
                Point3d::new(-1.0, 0.0, 0.0),
                Point3d::new(0.0, -1.0, 0.0),
            ],
            vec![LabelledTri::new(0, 1, 2), LabelledTri::new(0, 3, 4)],
        );
        assert_eq!(mark_zones(&surf).n_zones, 2);
        assert_eq!(common_edge(&surf, 0, 1), None);
    }

    #[test]
    fn test_common_edge() {
        let surf = make_strip_and_island();
        assert_eq!(common_edge(&surf, 0, 1), Some((0, 2)));
        assert_eq!(common_edge(&surf, 0, 2), None);
    }
}
