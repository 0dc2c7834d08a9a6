//! Regularisation: collapsing intersection clusters to single snap points
//!
//! For every cut cell, and every cut vertex away from the domain boundary,
//! the tetrahedron edges leaving the cell centre (or vertex) are
//! intersected with the contour. Intersections on the near half of their
//! edge form a small local surface. When that surface is a single
//! connected patch it is replaced by one snap point, which the triangle
//! generator then substitutes for every near-half intersection.

use crate::adapter::{neighbour_source, AdaptedField, CoupledTopology, FieldSources};
use crate::config::ParallelConfig;
use crate::cut::CutClassification;
use crate::generate::SnapValues;
use crate::parallel::parallel_map_range;
use crate::stencil::{Source, Stencil};
use crate::sync::{swap_boundary_rows, sync_point_rows};
use isomesh_core::{
    Communicator, FieldValue, MessageTag, Point3d, PolyMesh, Result, Vector3d, VSMALL,
};
use isomesh_stitching::{common_edge, mark_zones, stitch_tri_points};

/// Fraction along the edge from `s0` to `s1` where the contour crosses, or
/// -1 when the end values are indistinguishable
pub fn iso_fraction(s0: f64, s1: f64, iso: f64) -> f64 {
    let d = s1 - s0;
    if d.abs() > VSMALL {
        (iso - s0) / d
    } else {
        -1.0
    }
}

/// Crossing lies on the near half of its edge
fn is_near(s: f64) -> bool {
    (0.0..=0.5).contains(&s)
}

/// Intersections close to one cell centre or vertex
#[derive(Debug, Clone, Default)]
pub struct SnapCandidates {
    /// Triangles whose three corners are all near
    pub triangles: Vec<[Stencil; 3]>,
    /// Near intersections outside complete triangles
    pub other: Vec<Stencil>,
}

/// Everything the regulariser reads
#[derive(Debug, Clone, Copy)]
pub struct RegulariseInput<'a> {
    pub mesh: &'a PolyMesh,
    pub topology: &'a CoupledTopology,
    pub cell_values: &'a AdaptedField<f64>,
    pub point_values: &'a [f64],
    pub coords: FieldSources<'a, Vector3d>,
    pub cuts: &'a CutClassification,
    pub iso: f64,
    pub merge_distance: f64,
}

impl RegulariseInput<'_> {
    fn position(&self, stencil: &Stencil) -> Point3d {
        Point3d::from(stencil.evaluate(&self.coords))
    }

    /// Near intersections around the centre of `cell`
    pub fn cell_candidates(&self, cell: usize) -> SnapCandidates {
        let mesh = self.mesh;
        let owner = mesh.owner();
        let cc = Source::Cell(cell);
        let c_val = self.cell_values.cells[cell];
        let mut candidates = SnapCandidates::default();

        for &face in &mesh.cell_faces()[cell] {
            let nbr = if mesh.is_internal_face(face) && owner[face] != cell {
                Source::Cell(owner[face])
            } else {
                neighbour_source(mesh, face)
            };
            let nbr_val = match nbr {
                Source::Cell(c) => self.cell_values.cells[c],
                Source::Boundary(b) => self.cell_values.boundary[b],
                Source::Point(p) => self.point_values[p],
            };

            let s2 = iso_fraction(c_val, nbr_val, self.iso);
            let to_nbr = Stencil::lerp(cc, nbr, s2);

            let f = &mesh.faces()[face];
            let n = f.len();
            for fp in 0..n {
                let p0 = f[fp];
                let p1 = f[(fp + 1) % n];
                let s = [
                    iso_fraction(c_val, self.point_values[p0], self.iso),
                    iso_fraction(c_val, self.point_values[p1], self.iso),
                    s2,
                ];
                let pts = [
                    Stencil::lerp(cc, Source::Point(p0), s[0]),
                    Stencil::lerp(cc, Source::Point(p1), s[1]),
                    to_nbr.clone(),
                ];

                if s.iter().all(|&si| is_near(si)) {
                    candidates.triangles.push(pts);
                } else {
                    for (si, pt) in s.iter().zip(pts) {
                        if is_near(*si) {
                            candidates.other.push(pt);
                        }
                    }
                }
            }
        }
        candidates
    }

    /// Near intersections around vertex `point`
    pub fn point_candidates(&self, point: usize) -> SnapCandidates {
        let mesh = self.mesh;
        let pv = self.point_values[point];
        let here = Source::Point(point);
        let mut candidates = SnapCandidates::default();

        for &face in &mesh.point_faces()[point] {
            let f = &mesh.faces()[face];
            let n = f.len();
            let Some(fp) = f.iter().position(|&p| p == point) else {
                continue;
            };
            let next = f[(fp + 1) % n];
            let prev = f[(fp + n - 1) % n];
            let own = mesh.owner()[face];

            let s = [
                iso_fraction(pv, self.cell_values.cells[own], self.iso),
                iso_fraction(pv, self.cell_values.neighbour_value(mesh, face), self.iso),
                iso_fraction(pv, self.point_values[next], self.iso),
                iso_fraction(pv, self.point_values[prev], self.iso),
            ];
            let pts = [
                Stencil::lerp(here, Source::Cell(own), s[0]),
                Stencil::lerp(here, neighbour_source(mesh, face), s[1]),
                Stencil::lerp(here, Source::Point(next), s[2]),
                Stencil::lerp(here, Source::Point(prev), s[3]),
            ];

            if is_near(s[0]) && is_near(s[1]) {
                if is_near(s[2]) {
                    candidates
                        .triangles
                        .push([pts[0].clone(), pts[1].clone(), pts[2].clone()]);
                }
                if is_near(s[3]) {
                    candidates
                        .triangles
                        .push([pts[3].clone(), pts[0].clone(), pts[1].clone()]);
                }
            }
            for (si, pt) in s.iter().zip(pts) {
                if is_near(*si) {
                    candidates.other.push(pt);
                }
            }
        }
        candidates
    }

    /// Collapse candidates to one snap point, or `None` when they do not
    /// form a single connected patch
    pub fn collapse(&self, candidates: &SnapCandidates) -> Result<Option<Stencil>> {
        let tris = &candidates.triangles;
        match tris.len() {
            0 => return Ok(Stencil::average(&candidates.other)),
            1 => return Ok(Stencil::average(&tris[0])),
            _ => {}
        }

        let positions: Vec<Point3d> = tris
            .iter()
            .flat_map(|tri| tri.iter().map(|s| self.position(s)))
            .collect();
        let stitched = stitch_tri_points(&positions, self.merge_distance, false)?;
        let surf = &stitched.surface;

        let single_patch = match surf.face_count() {
            0 => false,
            1 => true,
            2 => common_edge(surf, 0, 1).is_some(),
            _ => mark_zones(surf).n_zones == 1,
        };
        if !single_patch {
            tracing::trace!(
                n_triangles = tris.len(),
                n_merged = surf.face_count(),
                "candidates do not form a single patch"
            );
            return Ok(None);
        }

        let centroids: Vec<Stencil> = stitched
            .tri_map
            .iter()
            .filter_map(|&t| Stencil::average(&tris[t]))
            .collect();
        Ok(Stencil::average(&centroids))
    }
}

/// Vertices on faces of uncoupled or separated coupled patches. These are
/// never snapped so the surface keeps its exact boundary curve.
pub fn boundary_points(mesh: &PolyMesh, topology: &CoupledTopology) -> Vec<bool> {
    let mut is_boundary = vec![false; mesh.n_points()];
    for (patchi, patch) in mesh.patches().iter().enumerate() {
        if topology.coupling(patchi).is_some_and(|c| c.collocated) {
            continue;
        }
        for face in patch.faces() {
            for &p in &mesh.faces()[face] {
                is_boundary[p] = true;
            }
        }
    }
    is_boundary
}

/// Snap stencil of every cut cell
pub fn snap_cells(
    input: &RegulariseInput,
    parallel: &ParallelConfig,
) -> Result<Vec<Option<Stencil>>> {
    let cell_cut_type = &input.cuts.cell_cut_type;
    parallel_map_range(parallel, input.mesh.n_cells(), |cell| {
        if !cell_cut_type[cell].is_cut() {
            return Ok(None);
        }
        input.collapse(&input.cell_candidates(cell))
    })
    .into_iter()
    .collect()
}

/// Local snap stencil of every cut vertex away from the boundary
pub fn snap_points(
    input: &RegulariseInput,
    parallel: &ParallelConfig,
) -> Result<Vec<Option<Stencil>>> {
    let mesh = input.mesh;
    let is_boundary = boundary_points(mesh, input.topology);
    let face_cut_type = &input.cuts.face_cut_type;
    let point_faces = mesh.point_faces();

    parallel_map_range(parallel, mesh.n_points(), |point| {
        if is_boundary[point] || !point_faces[point].iter().any(|&f| face_cut_type[f].is_cut()) {
            return Ok(None);
        }
        input.collapse(&input.point_candidates(point))
    })
    .into_iter()
    .collect()
}

/// Snap stencils of every cell and vertex
#[derive(Debug, Clone, Default)]
pub struct SnapStencils {
    pub cell: Vec<Option<Stencil>>,
    /// Local candidate of every vertex, before partitions agree
    pub point: Vec<Option<Stencil>>,
}

impl SnapStencils {
    pub fn compute(input: &RegulariseInput, parallel: &ParallelConfig) -> Result<Self> {
        Ok(Self {
            cell: snap_cells(input, parallel)?,
            point: snap_points(input, parallel)?,
        })
    }

    /// Evaluate the stencils on `values`.
    ///
    /// Neighbour cell snaps are swapped across coupled patches. Vertex
    /// candidates are reduced as rows `[position, value]` so every
    /// partition keeps the value of the same winning candidate.
    pub fn evaluate<T: FieldValue>(
        &self,
        mesh: &PolyMesh,
        topology: &CoupledTopology,
        comm: &dyn Communicator,
        coords: &FieldSources<Vector3d>,
        values: &FieldSources<T>,
    ) -> Result<SnapValues<T>> {
        let cell: Vec<Option<T>> = self
            .cell
            .iter()
            .map(|s| s.as_ref().map(|s| s.evaluate(values)))
            .collect();

        let stride = 1 + T::N_COMPONENTS;
        let mut rows = Vec::with_capacity(mesh.n_boundary_faces() * stride);
        for face in mesh.n_internal_faces()..mesh.n_faces() {
            match cell[mesh.owner()[face]] {
                Some(v) => {
                    rows.push(1.0);
                    v.write_components(&mut rows);
                }
                None => rows.extend(std::iter::repeat(0.0).take(stride)),
            }
        }
        let swapped =
            swap_boundary_rows(mesh, topology, comm, MessageTag::CellSnaps, &rows, stride)?;
        let neighbour_cell = swapped
            .chunks_exact(stride)
            .map(|row| (row[0] != 0.0).then(|| T::from_components(&row[1..])))
            .collect();

        let stride = 3 + T::N_COMPONENTS;
        let mut rows = Vec::with_capacity(mesh.n_points() * stride);
        for snap in &self.point {
            match snap {
                Some(s) => {
                    s.evaluate(coords).write_components(&mut rows);
                    s.evaluate(values).write_components(&mut rows);
                }
                None => rows.extend(std::iter::repeat(f64::INFINITY).take(stride)),
            }
        }
        sync_point_rows(mesh, topology, comm, MessageTag::PointSnaps, &mut rows, stride)?;
        let point = rows
            .chunks_exact(stride)
            .map(|row| row[0].is_finite().then(|| T::from_components(&row[3..])))
            .collect();

        Ok(SnapValues {
            cell,
            neighbour_cell,
            point,
        })
    }
}
