//! Polyhedral mesh in owner/neighbour face addressing
//!
//! Faces are stored as ordered vertex loops. Internal faces come first, each
//! with an owner and a neighbour cell; boundary faces follow, grouped into
//! contiguous patches. Face normals point out of the owner cell.

use crate::error::{Error, Result};
use crate::field::{CellField, PointField};
use crate::point::{Point3d, Vector3d, VSMALL};
use crate::traits::{BoundBox, Bounded};
use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::OnceLock;

/// Boundary patch classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatchKind {
    /// Plain boundary (walls, inlets, outlets): values come from the field
    Wall,
    /// Direction without extent (2D/1D cases)
    Empty,
    /// Coupled to another patch of the same partition
    Cyclic {
        neighbour_patch: usize,
        /// Maps neighbour-side coordinates onto this side
        transform: Transform3D,
    },
    /// Coupled to a patch on another partition
    Processor {
        neighbour_rank: usize,
        /// Maps neighbour-side coordinates onto this side
        transform: Transform3D,
    },
}

impl PatchKind {
    pub fn is_coupled(&self) -> bool {
        matches!(self, PatchKind::Cyclic { .. } | PatchKind::Processor { .. })
    }

    /// Coupling transform of a coupled patch
    pub fn transform(&self) -> Option<&Transform3D> {
        match self {
            PatchKind::Cyclic { transform, .. } | PatchKind::Processor { transform, .. } => {
                Some(transform)
            }
            _ => None,
        }
    }
}

/// A contiguous range of boundary faces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub name: String,
    pub start: usize,
    pub size: usize,
    pub kind: PatchKind,
}

impl Patch {
    pub fn new(name: impl Into<String>, start: usize, size: usize, kind: PatchKind) -> Self {
        Self {
            name: name.into(),
            start,
            size,
            kind,
        }
    }

    /// Mesh face indices of this patch
    pub fn faces(&self) -> Range<usize> {
        self.start..self.start + self.size
    }

    pub fn is_coupled(&self) -> bool {
        self.kind.is_coupled()
    }
}

/// A point shared by more than two partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedPoint {
    pub point: usize,
    pub global_slot: usize,
}

/// Unstructured polyhedral mesh
#[derive(Debug, Clone)]
pub struct PolyMesh {
    points: Vec<Point3d>,
    faces: Vec<Vec<usize>>,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<Patch>,
    n_cells: usize,
    shared_points: Vec<SharedPoint>,
    n_global_shared_points: usize,

    face_centres: Vec<Point3d>,
    face_areas: Vec<Vector3d>,
    cell_centres: Vec<Point3d>,

    // Demand-driven addressing
    cell_faces: OnceLock<Vec<Vec<usize>>>,
    cell_points: OnceLock<Vec<Vec<usize>>>,
    point_faces: OnceLock<Vec<Vec<usize>>>,
    point_cells: OnceLock<Vec<Vec<usize>>>,
    boundary_patch: OnceLock<Vec<usize>>,
}

impl PolyMesh {
    /// Create a mesh, validating the addressing and computing face and
    /// cell geometry
    pub fn new(
        points: Vec<Point3d>,
        faces: Vec<Vec<usize>>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<Patch>,
    ) -> Result<Self> {
        if owner.len() != faces.len() {
            return Err(Error::size_mismatch("face owners", faces.len(), owner.len()));
        }
        if neighbour.len() > faces.len() {
            return Err(Error::InvalidData(format!(
                "{} neighbours for {} faces",
                neighbour.len(),
                faces.len()
            )));
        }

        for (facei, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(Error::InvalidData(format!(
                    "face {} has only {} vertices",
                    facei,
                    face.len()
                )));
            }
            if let Some(&bad) = face.iter().find(|&&p| p >= points.len()) {
                return Err(Error::InvalidData(format!(
                    "face {} uses point {} outside range 0..{}",
                    facei,
                    bad,
                    points.len()
                )));
            }
        }

        let n_cells = owner
            .iter()
            .chain(neighbour.iter())
            .map(|&c| c + 1)
            .max()
            .unwrap_or(0);

        let mut next = neighbour.len();
        for (patchi, patch) in patches.iter().enumerate() {
            if patch.start != next {
                return Err(Error::InvalidData(format!(
                    "patch {} ({}) starts at face {}, expected {}",
                    patchi, patch.name, patch.start, next
                )));
            }
            next += patch.size;

            if let PatchKind::Cyclic { neighbour_patch, .. } = patch.kind {
                let nbr = patches.get(neighbour_patch).ok_or_else(|| {
                    Error::InvalidData(format!(
                        "cyclic patch {} refers to missing patch {}",
                        patch.name, neighbour_patch
                    ))
                })?;
                let points_back = matches!(
                    nbr.kind,
                    PatchKind::Cyclic { neighbour_patch: back, .. } if back == patchi
                );
                if neighbour_patch == patchi || !points_back || nbr.size != patch.size {
                    return Err(Error::InvalidData(format!(
                        "cyclic patches {} and {} are not a matching pair",
                        patch.name, nbr.name
                    )));
                }
            }
        }
        if next != faces.len() {
            return Err(Error::InvalidData(format!(
                "patches cover faces up to {}, mesh has {}",
                next,
                faces.len()
            )));
        }

        let (face_centres, face_areas) = face_geometry(&points, &faces);

        let mut mesh = Self {
            points,
            faces,
            owner,
            neighbour,
            patches,
            n_cells,
            shared_points: Vec::new(),
            n_global_shared_points: 0,
            face_centres,
            face_areas,
            cell_centres: Vec::new(),
            cell_faces: OnceLock::new(),
            cell_points: OnceLock::new(),
            point_faces: OnceLock::new(),
            point_cells: OnceLock::new(),
            boundary_patch: OnceLock::new(),
        };
        mesh.cell_centres = mesh.compute_cell_centres();
        Ok(mesh)
    }

    /// Declare points shared by more than two partitions, as
    /// `(local point, global slot)` pairs
    pub fn with_shared_points(
        mut self,
        shared: Vec<(usize, usize)>,
        n_global: usize,
    ) -> Result<Self> {
        for &(point, slot) in &shared {
            if point >= self.points.len() || slot >= n_global {
                return Err(Error::InvalidData(format!(
                    "shared point ({}, {}) out of range ({} points, {} global slots)",
                    point,
                    slot,
                    self.points.len(),
                    n_global
                )));
            }
        }
        self.shared_points = shared
            .into_iter()
            .map(|(point, global_slot)| SharedPoint { point, global_slot })
            .collect();
        self.n_global_shared_points = n_global;
        Ok(self)
    }

    pub fn points(&self) -> &[Point3d] {
        &self.points
    }

    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    pub fn owner(&self) -> &[usize] {
        &self.owner
    }

    pub fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn shared_points(&self) -> &[SharedPoint] {
        &self.shared_points
    }

    pub fn n_global_shared_points(&self) -> usize {
        self.n_global_shared_points
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    pub fn n_boundary_faces(&self) -> usize {
        self.faces.len() - self.neighbour.len()
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn is_internal_face(&self, face: usize) -> bool {
        face < self.neighbour.len()
    }

    pub fn face_centres(&self) -> &[Point3d] {
        &self.face_centres
    }

    /// Face area vectors, pointing out of the owner cell
    pub fn face_areas(&self) -> &[Vector3d] {
        &self.face_areas
    }

    pub fn cell_centres(&self) -> &[Point3d] {
        &self.cell_centres
    }

    /// Faces of every cell
    pub fn cell_faces(&self) -> &[Vec<usize>] {
        self.cell_faces.get_or_init(|| {
            let mut cf = vec![Vec::new(); self.n_cells];
            for (facei, &own) in self.owner.iter().enumerate() {
                cf[own].push(facei);
            }
            for (facei, &nei) in self.neighbour.iter().enumerate() {
                cf[nei].push(facei);
            }
            cf
        })
    }

    /// Unique vertices of every cell, in order of first use
    pub fn cell_points(&self) -> &[Vec<usize>] {
        self.cell_points.get_or_init(|| {
            self.cell_faces()
                .iter()
                .map(|faces| {
                    let mut pts: Vec<usize> = Vec::new();
                    for &facei in faces {
                        for &p in &self.faces[facei] {
                            if !pts.contains(&p) {
                                pts.push(p);
                            }
                        }
                    }
                    pts
                })
                .collect()
        })
    }

    /// Faces using every vertex, in ascending face order
    pub fn point_faces(&self) -> &[Vec<usize>] {
        self.point_faces.get_or_init(|| {
            let mut pf = vec![Vec::new(); self.points.len()];
            for (facei, face) in self.faces.iter().enumerate() {
                for &p in face {
                    pf[p].push(facei);
                }
            }
            pf
        })
    }

    /// Cells using every vertex, in ascending cell order
    pub fn point_cells(&self) -> &[Vec<usize>] {
        self.point_cells.get_or_init(|| {
            let mut pc = vec![Vec::new(); self.points.len()];
            for (celli, pts) in self.cell_points().iter().enumerate() {
                for &p in pts {
                    pc[p].push(celli);
                }
            }
            pc
        })
    }

    /// Patch index of every boundary face, indexed by `face - n_internal_faces`
    pub fn boundary_patch(&self) -> &[usize] {
        self.boundary_patch.get_or_init(|| {
            let mut region = vec![0; self.n_boundary_faces()];
            let n_internal = self.n_internal_faces();
            for (patchi, patch) in self.patches.iter().enumerate() {
                for facei in patch.faces() {
                    region[facei - n_internal] = patchi;
                }
            }
            region
        })
    }

    /// Patch containing `face`, `None` for internal faces
    pub fn which_patch(&self, face: usize) -> Option<usize> {
        if self.is_internal_face(face) {
            None
        } else {
            Some(self.boundary_patch()[face - self.n_internal_faces()])
        }
    }

    /// Cell centres with face centres on every boundary face
    pub fn cell_centre_field(&self) -> CellField<Vector3d> {
        CellField::geometric(
            self.cell_centres.iter().map(|c| c.coords).collect(),
            self.face_centres[self.n_internal_faces()..]
                .iter()
                .map(|c| c.coords)
                .collect(),
        )
    }

    /// Vertex coordinates as a point field
    pub fn point_field(&self) -> PointField<Vector3d> {
        PointField::new(self.points.iter().map(|p| p.coords).collect())
    }

    fn compute_cell_centres(&self) -> Vec<Point3d> {
        let mut estimate = vec![Vector3d::zeros(); self.n_cells];
        let mut n_cell_faces = vec![0usize; self.n_cells];

        let faces_of = |facei: usize| {
            std::iter::once(self.owner[facei]).chain(self.neighbour.get(facei).copied())
        };

        for facei in 0..self.faces.len() {
            for c in faces_of(facei) {
                estimate[c] += self.face_centres[facei].coords;
                n_cell_faces[c] += 1;
            }
        }
        for (e, &n) in estimate.iter_mut().zip(&n_cell_faces) {
            if n > 0 {
                *e /= n as f64;
            }
        }

        let mut centre_sum = vec![Vector3d::zeros(); self.n_cells];
        let mut volume = vec![0.0; self.n_cells];

        for facei in 0..self.faces.len() {
            let fc = self.face_centres[facei].coords;
            let sf = self.face_areas[facei];

            let own = self.owner[facei];
            let pyr3_vol = sf.dot(&(fc - estimate[own])).max(VSMALL);
            centre_sum[own] += pyr3_vol * (0.75 * fc + 0.25 * estimate[own]);
            volume[own] += pyr3_vol;

            if let Some(&nei) = self.neighbour.get(facei) {
                let pyr3_vol = sf.dot(&(estimate[nei] - fc)).max(VSMALL);
                centre_sum[nei] += pyr3_vol * (0.75 * fc + 0.25 * estimate[nei]);
                volume[nei] += pyr3_vol;
            }
        }

        centre_sum
            .into_iter()
            .zip(volume)
            .zip(estimate)
            .map(|((sum, vol), est)| {
                if vol > VSMALL {
                    Point3d::from(sum / vol)
                } else {
                    Point3d::from(est)
                }
            })
            .collect()
    }
}

impl Bounded for PolyMesh {
    fn bounding_box(&self) -> BoundBox {
        BoundBox::from_points(&self.points)
    }
}

fn face_geometry(points: &[Point3d], faces: &[Vec<usize>]) -> (Vec<Point3d>, Vec<Vector3d>) {
    faces
        .iter()
        .map(|face| {
            let n = face.len();
            if n == 3 {
                let (a, b, c) = (points[face[0]], points[face[1]], points[face[2]]);
                let centre = Point3d::from((a.coords + b.coords + c.coords) / 3.0);
                return (centre, 0.5 * (b - a).cross(&(c - a)));
            }

            let average = face
                .iter()
                .fold(Vector3d::zeros(), |acc, &p| acc + points[p].coords)
                / n as f64;

            let mut sum_n = Vector3d::zeros();
            let mut sum_a = 0.0;
            let mut sum_ac = Vector3d::zeros();

            for i in 0..n {
                let this = points[face[i]].coords;
                let next = points[face[(i + 1) % n]].coords;

                let c = this + next + average;
                let tri_n = (next - this).cross(&(average - this));
                let a = tri_n.norm();

                sum_n += tri_n;
                sum_a += a;
                sum_ac += a * c;
            }

            let centre = if sum_a > VSMALL {
                sum_ac / (3.0 * sum_a)
            } else {
                average
            };
            (Point3d::from(centre), 0.5 * sum_n)
        })
        .unzip()
}
