//! Experimental surface cleanup: dangling-triangle removal and a
//! consistent-orientation walk
//!
//! Orientation is seeded once per edge-connected component and the seed
//! keeps its winding, so separate components are not oriented relative to
//! each other.

use crate::addressing::EdgeAddressing;
use isomesh_core::{LabelledTri, TriSurface};

/// A subset of a surface with its addressing back to the original
#[derive(Debug, Clone, Default)]
pub struct SurfaceSubset {
    pub surface: TriSurface,
    /// Original triangle of every kept triangle
    pub new_to_old_faces: Vec<usize>,
    /// Original point of every kept point
    pub new_to_old_points: Vec<usize>,
}

/// A triangle is dangling when 1 to 3 of its edges are used by no other
/// triangle
pub fn is_dangling(addressing: &EdgeAddressing, tri_idx: usize) -> bool {
    let n_open = addressing.face_edges[tri_idx]
        .iter()
        .filter(|&&e| addressing.edge_faces[e].len() == 1)
        .count();
    (1..=3).contains(&n_open)
}

/// Mark dangling triangles attached to non-manifold edges for removal.
/// Returns the keep flags and the number of triangles marked.
pub fn mark_dangling_triangles(addressing: &EdgeAddressing) -> (Vec<bool>, usize) {
    let mut keep = vec![true; addressing.face_edges.len()];
    let mut n_dangling = 0;

    for edge_idx in addressing.non_manifold_edges() {
        for &tri_idx in &addressing.edge_faces[edge_idx] {
            if keep[tri_idx] && is_dangling(addressing, tri_idx) {
                keep[tri_idx] = false;
                n_dangling += 1;
            }
        }
    }
    (keep, n_dangling)
}

/// Keep the listed triangles and the points they use, renumbered in order
/// of first use
pub fn subset_surface(surface: &TriSurface, new_to_old_faces: &[usize]) -> SurfaceSubset {
    let mut old_to_new_points = vec![usize::MAX; surface.points.len()];
    let mut new_to_old_points = Vec::new();
    let mut triangles = Vec::with_capacity(new_to_old_faces.len());

    for &old_face in new_to_old_faces {
        let tri = &surface.triangles[old_face];
        let mut renumbered = LabelledTri {
            vertices: tri.vertices,
            region: tri.region,
        };
        for v in renumbered.vertices.iter_mut() {
            if old_to_new_points[*v] == usize::MAX {
                old_to_new_points[*v] = new_to_old_points.len();
                new_to_old_points.push(*v);
            }
            *v = old_to_new_points[*v];
        }
        triangles.push(renumbered);
    }

    let points = new_to_old_points
        .iter()
        .map(|&p| surface.points[p])
        .collect();

    SurfaceSubset {
        surface: TriSurface::from_points_and_triangles(points, triangles),
        new_to_old_faces: new_to_old_faces.to_vec(),
        new_to_old_points,
    }
}

/// Repeatedly remove dangling triangles until none are left
pub fn remove_dangling_triangles(surface: &TriSurface) -> SurfaceSubset {
    let mut current = SurfaceSubset {
        surface: surface.clone(),
        new_to_old_faces: (0..surface.triangles.len()).collect(),
        new_to_old_points: (0..surface.points.len()).collect(),
    };

    loop {
        let addressing = EdgeAddressing::new(&current.surface);
        let (keep, n_dangling) = mark_dangling_triangles(&addressing);
        tracing::debug!(n_dangling, "dangling triangle pass");
        if n_dangling == 0 {
            return current;
        }

        let kept: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter(|(_, &k)| k)
            .map(|(i, _)| i)
            .collect();
        let next = subset_surface(&current.surface, &kept);

        current = SurfaceSubset {
            new_to_old_faces: next
                .new_to_old_faces
                .iter()
                .map(|&f| current.new_to_old_faces[f])
                .collect(),
            new_to_old_points: next
                .new_to_old_points
                .iter()
                .map(|&p| current.new_to_old_points[p])
                .collect(),
            surface: next.surface,
        };
    }
}

/// Flip triangles so that edge-neighbours traverse their shared edge in
/// opposite directions. Returns the number of flipped triangles.
pub fn orient_surface(surface: &mut TriSurface) -> usize {
    let addressing = EdgeAddressing::new(surface);
    let n = surface.triangles.len();

    #[derive(Clone, Copy, PartialEq)]
    enum FlipState {
        Unvisited,
        Keep,
        Flip,
    }
    let mut state = vec![FlipState::Unvisited; n];

    for seed in 0..n {
        if state[seed] != FlipState::Unvisited {
            continue;
        }
        state[seed] = FlipState::Keep;
        let mut changed = vec![seed];

        while !changed.is_empty() {
            let mut next_changed = Vec::new();
            for &tri_idx in &changed {
                let tri = surface.triangles[tri_idx];
                for (fp, &edge_idx) in addressing.face_edges[tri_idx].iter().enumerate() {
                    let faces = &addressing.edge_faces[edge_idx];
                    // Only the first two triangles on an edge are walked
                    let nbr = match faces.as_slice() {
                        [a, b, ..] if *a == tri_idx => *b,
                        [a, ..] if *a != tri_idx => *a,
                        _ => continue,
                    };
                    if state[nbr] != FlipState::Unvisited {
                        continue;
                    }

                    let (p0, p1) = tri.edge(fp);
                    let nbr_tri = &surface.triangles[nbr];
                    let Some(nbr_fp) = nbr_tri.find(p0) else {
                        continue;
                    };
                    let nbr_prev = nbr_tri.vertices[(nbr_fp + 2) % 3];
                    let same_orientation = p1 == nbr_prev;

                    state[nbr] = match (state[tri_idx], same_orientation) {
                        (FlipState::Keep, true) | (FlipState::Flip, false) => FlipState::Keep,
                        _ => FlipState::Flip,
                    };
                    next_changed.push(nbr);
                }
            }
            changed = next_changed;
        }
    }

    let mut n_flipped = 0;
    for (tri, s) in surface.triangles.iter_mut().zip(&state) {
        if *s == FlipState::Flip {
            tri.flip();
            n_flipped += 1;
        }
    }
    n_flipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use isomesh_core::Point3d;

    fn make_square_with_fin() -> TriSurface {
        // two triangles forming a square plus a fin on the diagonal
        TriSurface::from_points_and_triangles(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(1.0, 1.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
                Point3d::new(0.5, 0.5, 1.0),
            ],
            vec![
                LabelledTri::new(0, 1, 2),
                LabelledTri::new(0, 2, 3),
                LabelledTri::new(0, 2, 4),
            ],
        )
    }

    #[test]
    fn test_dangling_fin_removed() {
        let surf = make_square_with_fin();
        let addr = EdgeAddressing::new(&surf);
        assert_eq!(addr.non_manifold_edges().count(), 1);

        let cleaned = remove_dangling_triangles(&surf);
        // every triangle on the non-manifold diagonal has open edges
        assert_eq!(cleaned.surface.face_count(), 0);
    }

    #[test]
    fn test_closed_tetrahedron_is_kept() {
        let surf = TriSurface::from_points_and_triangles(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
                Point3d::new(0.0, 0.0, 1.0),
            ],
            vec![
                LabelledTri::new(0, 2, 1),
                LabelledTri::new(0, 1, 3),
                LabelledTri::new(0, 3, 2),
                LabelledTri::new(1, 2, 3),
            ],
        );
        let cleaned = remove_dangling_triangles(&surf);
        assert_eq!(cleaned.surface.face_count(), 4);
        assert_eq!(cleaned.new_to_old_faces, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_subset_renumbers_points() {
        let surf = make_square_with_fin();
        let subset = subset_surface(&surf, &[2]);
        assert_eq!(subset.surface.vertex_count(), 3);
        assert_eq!(subset.new_to_old_points, vec![0, 2, 4]);
        assert_eq!(subset.surface.triangles[0].vertices, [0, 1, 2]);
    }

    #[test]
    fn test_orientation_walk_flips_inconsistent_neighbour() {
        let mut surf = TriSurface::from_points_and_triangles(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(1.0, 1.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
            ],
            vec![LabelledTri::new(0, 1, 2), LabelledTri::new(0, 3, 2)],
        );
        assert_eq!(orient_surface(&mut surf), 1);
        assert_eq!(surf.triangles[1].vertices, [0, 2, 3]);
        for n in surf.face_normals() {
            assert!(n.z > 0.0);
        }
        assert_eq!(orient_surface(&mut surf), 0);
    }
}
