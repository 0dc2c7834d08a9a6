//! Stitching of triangle soups into indexed surfaces

use crate::merge::merge_points;
use isomesh_core::{Error, LabelledTri, Point3d, Result, TriSurface};
use std::collections::HashMap;

/// An indexed surface built from a triangle soup
#[derive(Debug, Clone, Default)]
pub struct StitchedSurface {
    pub surface: TriSurface,
    /// Surface point for every soup point; `None` when the soup triangle was
    /// dropped as degenerate or duplicate
    pub tri_point_merge_map: Vec<Option<usize>>,
    /// Soup triangle of every surface triangle
    pub tri_map: Vec<usize>,
    /// First soup point of every surface point
    pub point_origin: Vec<usize>,
    /// Triangles dropped because two corners merged
    pub n_degenerate: usize,
    /// Triangles dropped as duplicates of a lower-indexed triangle
    pub n_duplicates: usize,
}

/// Merge the points of a triangle soup (three consecutive points per
/// triangle) within `merge_distance`, drop degenerate triangles and, when
/// `check_duplicates` is set, triangles using the same three vertices as a
/// lower-indexed one
pub fn stitch_tri_points(
    tri_points: &[Point3d],
    merge_distance: f64,
    check_duplicates: bool,
) -> Result<StitchedSurface> {
    if tri_points.len() % 3 != 0 {
        return Err(Error::Algorithm(format!(
            "number of triangle points {} is not a multiple of 3",
            tri_points.len()
        )));
    }
    let n_tris = tri_points.len() / 3;

    let merged = merge_points(tri_points, merge_distance);

    if cfg!(debug_assertions) {
        let remerged = merge_points(&merged.points, merge_distance);
        if remerged.has_merged() {
            return Err(Error::Algorithm(format!(
                "re-merging at distance {} shrank {} merged points to {}",
                merge_distance,
                merged.points.len(),
                remerged.points.len()
            )));
        }
    }

    let mut tris = Vec::with_capacity(n_tris);
    let mut tri_map = Vec::with_capacity(n_tris);
    for (old_tri, corners) in merged.old_to_new.chunks_exact(3).enumerate() {
        let tri = LabelledTri::new(corners[0], corners[1], corners[2]);
        if tri.is_valid() {
            tris.push(tri);
            tri_map.push(old_tri);
        }
    }
    let n_degenerate = n_tris - tris.len();

    let mut n_duplicates = 0;
    if check_duplicates {
        // Kept triangles using each point
        let mut point_tris: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut kept = Vec::with_capacity(tris.len());
        let mut kept_map = Vec::with_capacity(tris.len());

        for (tri, &old_tri) in tris.iter().zip(&tri_map) {
            let is_duplicate = point_tris
                .get(&tri[0])
                .map_or(false, |others| others.iter().any(|&k| kept[k] == tri.sorted_vertices()));

            if is_duplicate {
                n_duplicates += 1;
                continue;
            }

            let k = kept.len();
            kept.push(tri.sorted_vertices());
            kept_map.push((*tri, old_tri));
            for &v in &tri.vertices {
                point_tris.entry(v).or_default().push(k);
            }
        }

        tris = kept_map.iter().map(|(t, _)| *t).collect();
        tri_map = kept_map.into_iter().map(|(_, old)| old).collect();
    }

    // Compact out points no surviving triangle uses
    let mut old_to_compact = vec![None; merged.points.len()];
    let mut points = Vec::new();
    let mut point_origin = Vec::new();
    for tri in &mut tris {
        for v in tri.vertices.iter_mut() {
            let old = *v;
            *v = *old_to_compact[old].get_or_insert_with(|| {
                points.push(merged.points[old]);
                point_origin.push(merged.new_to_old[old]);
                points.len() - 1
            });
        }
    }

    let mut tri_point_merge_map = vec![None; tri_points.len()];
    for &old_tri in &tri_map {
        for corner in 3 * old_tri..3 * old_tri + 3 {
            tri_point_merge_map[corner] = old_to_compact[merged.old_to_new[corner]];
        }
    }

    tracing::trace!(
        n_tris,
        n_degenerate,
        n_duplicates,
        n_points = points.len(),
        "stitched triangle soup"
    );

    Ok(StitchedSurface {
        surface: TriSurface::from_points_and_triangles(points, tris),
        tri_point_merge_map,
        tri_map,
        point_origin,
        n_degenerate,
        n_duplicates,
    })
}

/// Report triangles with out-of-range or repeated vertices, or with the
/// same vertices as an edge-neighbour. Returns the number of invalid
/// triangles.
pub fn validate_triangles(surface: &TriSurface) -> usize {
    let n_points = surface.points.len();
    let mut point_tris: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut n_invalid = 0;

    for (i, tri) in surface.triangles.iter().enumerate() {
        if tri.vertices.iter().any(|&v| v >= n_points) {
            tracing::warn!(
                "triangle {} vertices {:?} uses point indices outside point range 0..{}",
                i,
                tri.vertices,
                n_points
            );
            n_invalid += 1;
            continue;
        }
        if !tri.is_valid() {
            tracing::warn!("triangle {} uses non-unique vertices {:?}", i, tri.vertices);
            n_invalid += 1;
            continue;
        }
        let duplicate = point_tris
            .get(&tri[0])
            .and_then(|others| {
                others
                    .iter()
                    .find(|&&j| surface.triangles[j].same_vertices(tri))
            })
            .copied();
        if let Some(j) = duplicate {
            tracing::warn!(
                "triangle {} vertices {:?} has the same vertices as triangle {}",
                i,
                tri.vertices,
                j
            );
            n_invalid += 1;
        }
        for &v in &tri.vertices {
            point_tris.entry(v).or_default().push(i);
        }
    }
    n_invalid
}
