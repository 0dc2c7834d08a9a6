//! Triangle generation over the cut faces
//!
//! Each cut face contributes one virtual tetrahedron per face edge, made
//! of the edge's two vertices plus the owner and neighbour cell centres.
//! Internal faces are walked first, then boundary faces in patch order,
//! so the triangle order is the same for every field carried through.

use crate::adapter::{neighbour_source, AdaptedField, CoupledTopology, FieldSources};
use crate::config::ParallelConfig;
use crate::cut::CutType;
use crate::parallel::parallel_map_range;
use crate::stencil::{Source, SourceValues};
use crate::tet::{evaluate_tet, TetCorner};
use isomesh_core::{Error, FieldValue, PolyMesh, Result};

/// Snap values of one carried field
#[derive(Debug, Clone, PartialEq)]
pub struct SnapValues<T> {
    /// Per cell
    pub cell: Vec<Option<T>>,
    /// Per boundary face: the snap of the partner face's owner cell
    pub neighbour_cell: Vec<Option<T>>,
    /// Per vertex
    pub point: Vec<Option<T>>,
}

impl<T> SnapValues<T> {
    /// No snapping at all
    pub fn none(mesh: &PolyMesh) -> Self {
        Self {
            cell: std::iter::repeat_with(|| None).take(mesh.n_cells()).collect(),
            neighbour_cell: std::iter::repeat_with(|| None)
                .take(mesh.n_boundary_faces())
                .collect(),
            point: std::iter::repeat_with(|| None).take(mesh.n_points()).collect(),
        }
    }

    fn check(&self, mesh: &PolyMesh) -> Result<()> {
        isomesh_core::check_size("cell snaps", mesh.n_cells(), self.cell.len())?;
        isomesh_core::check_size(
            "neighbour cell snaps",
            mesh.n_boundary_faces(),
            self.neighbour_cell.len(),
        )?;
        isomesh_core::check_size("point snaps", mesh.n_points(), self.point.len())
    }
}

/// Unstitched triangles, three points each, with the cell that produced
/// every triangle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleSoup<T> {
    pub points: Vec<T>,
    pub owner_cells: Vec<usize>,
}

impl<T> TriangleSoup<T> {
    pub fn n_triangles(&self) -> usize {
        self.owner_cells.len()
    }
}

/// Scalar field driving the contour
#[derive(Debug, Clone, Copy)]
pub struct Contour<'a> {
    pub cell_values: &'a AdaptedField<f64>,
    pub point_values: &'a [f64],
    pub face_cut_type: &'a [CutType],
    pub iso: f64,
}

/// Generate the triangle points of every cut face, carrying `field`
/// through the same interpolation as the contour itself
pub fn generate_tri_points<T: FieldValue>(
    mesh: &PolyMesh,
    topology: &CoupledTopology,
    contour: &Contour,
    field: FieldSources<T>,
    snaps: &SnapValues<T>,
    parallel: &ParallelConfig,
) -> Result<TriangleSoup<T>> {
    if contour.face_cut_type.len() != mesh.n_faces() {
        return Err(Error::size_mismatch(
            "face cut types",
            mesh.n_faces(),
            contour.face_cut_type.len(),
        ));
    }
    isomesh_core::check_size("point values", mesh.n_points(), contour.point_values.len())?;
    isomesh_core::check_size("field points", mesh.n_points(), field.points.len())?;
    snaps.check(mesh)?;

    let per_face = parallel_map_range(parallel, mesh.n_faces(), |face| {
        let mut points = Vec::new();
        if contour.face_cut_type[face].is_cut() {
            face_tri_points(mesh, topology, contour, field, snaps, face, &mut points);
        }
        points
    });

    let owner = mesh.owner();
    let mut soup = TriangleSoup {
        points: Vec::new(),
        owner_cells: Vec::new(),
    };
    for (face, points) in per_face.into_iter().enumerate() {
        let n_tris = points.len() / 3;
        soup.owner_cells
            .extend(std::iter::repeat(owner[face]).take(n_tris));
        soup.points.extend(points);
    }
    Ok(soup)
}

fn face_tri_points<T: FieldValue>(
    mesh: &PolyMesh,
    topology: &CoupledTopology,
    contour: &Contour,
    field: FieldSources<T>,
    snaps: &SnapValues<T>,
    face: usize,
    out: &mut Vec<T>,
) {
    let own = mesh.owner()[face];
    let nbr = neighbour_source(mesh, face);

    let own_corner = TetCorner::new(
        contour.cell_values.cells[own],
        field.value(Source::Cell(own)),
        snaps.cell[own],
    );
    let nbr_snap = match nbr {
        Source::Cell(nei) => snaps.cell[nei],
        Source::Boundary(b) if topology.is_collocated_face(mesh, face) => snaps.neighbour_cell[b],
        _ => None,
    };
    let nbr_corner = TetCorner::new(
        contour.cell_values.neighbour_value(mesh, face),
        field.value(nbr),
        nbr_snap,
    );

    let point_corner = |p: usize| {
        TetCorner::new(contour.point_values[p], field.points[p], snaps.point[p])
    };

    let f = &mesh.faces()[face];
    let n = f.len();
    for fp in 0..n {
        let corners = [
            point_corner(f[fp]),
            point_corner(f[(fp + 1) % n]),
            own_corner,
            nbr_corner,
        ];
        evaluate_tet(contour.iso, &corners, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::adapt_field;
    use crate::cut::classify;
    use approx::assert_abs_diff_eq;
    use isomesh_core::{BlockMesh, CellField, Point3d, SerialCommunicator, Vector3d};

    fn make_soup(
        mesh: &PolyMesh,
        f: impl Fn(&Point3d) -> f64,
        iso: f64,
    ) -> TriangleSoup<Vector3d> {
        let topology = CoupledTopology::default();
        let boundary = mesh.face_centres()[mesh.n_internal_faces()..]
            .iter()
            .map(&f)
            .collect();
        let cells = CellField::new(mesh.cell_centres().iter().map(&f).collect())
            .with_boundary(boundary);
        let cells = adapt_field(mesh, &topology, &SerialCommunicator, &cells).unwrap();
        let points: Vec<f64> = mesh.points().iter().map(&f).collect();
        let cuts = classify(
            mesh,
            &topology,
            &SerialCommunicator,
            &cells,
            &points,
            iso,
            &ParallelConfig::default(),
        )
        .unwrap();

        let coords =
            adapt_field(mesh, &topology, &SerialCommunicator, &mesh.cell_centre_field()).unwrap();
        let point_coords = mesh.point_field().values;
        let contour = Contour {
            cell_values: &cells,
            point_values: &points,
            face_cut_type: &cuts.face_cut_type,
            iso,
        };
        generate_tri_points(
            mesh,
            &topology,
            &contour,
            coords.with_points(&point_coords),
            &SnapValues::none(mesh),
            &ParallelConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_plane_through_block() {
        let mesh = BlockMesh::new(Point3d::origin(), Vector3d::new(1.0, 1.0, 1.0), [2, 2, 2])
            .build()
            .unwrap();
        let soup = make_soup(&mesh, |p| p.x + 0.5 * p.y + 0.25 * p.z, 0.8);

        assert!(soup.n_triangles() > 0);
        assert_eq!(soup.points.len(), 3 * soup.n_triangles());
        for p in &soup.points {
            assert_abs_diff_eq!(p.x + 0.5 * p.y + 0.25 * p.z, 0.8, epsilon = 1e-12);
        }
        for &cell in &soup.owner_cells {
            assert!(cell < mesh.n_cells());
        }
    }

    #[test]
    fn test_no_cut_faces_no_triangles() {
        let mesh = BlockMesh::new(Point3d::origin(), Vector3d::new(1.0, 1.0, 1.0), [2, 1, 1])
            .build()
            .unwrap();
        let soup = make_soup(&mesh, |p| p.x, 5.0);
        assert_eq!(soup.n_triangles(), 0);
        assert!(soup.points.is_empty());
    }

    #[test]
    fn test_snap_replaces_near_half_crossings() {
        let mesh = BlockMesh::new(Point3d::origin(), Vector3d::new(1.0, 1.0, 1.0), [1, 1, 1])
            .build()
            .unwrap();
        let topology = CoupledTopology::default();
        let cells = adapt_field(
            &mesh,
            &topology,
            &SerialCommunicator,
            &CellField::new(vec![0.5]),
        )
        .unwrap();
        let points: Vec<f64> = mesh.points().iter().map(|p| p.z).collect();
        let cut = vec![CutType::Cut; mesh.n_faces()];
        let contour = Contour {
            cell_values: &cells,
            point_values: &points,
            face_cut_type: &cut,
            iso: 0.45,
        };
        let coords =
            adapt_field(&mesh, &topology, &SerialCommunicator, &mesh.cell_centre_field()).unwrap();
        let point_coords = mesh.point_field().values;

        let snap = Vector3d::new(0.5, 0.5, 0.45);
        let mut snaps = SnapValues::none(&mesh);
        snaps.cell[0] = Some(snap);

        let soup = generate_tri_points(
            &mesh,
            &topology,
            &contour,
            coords.with_points(&point_coords),
            &snaps,
            &ParallelConfig::default(),
        )
        .unwrap();

        // every crossing between the centre and a bottom vertex lies at 90%
        // towards the centre, so it takes the cell snap
        assert!(soup.points.iter().any(|p| *p == snap));
        assert!(soup.points.iter().all(|p| p.z <= 0.45 + 1e-12));
    }

    #[test]
    fn test_size_checks() {
        let mesh = BlockMesh::new(Point3d::origin(), Vector3d::new(1.0, 1.0, 1.0), [1, 1, 1])
            .build()
            .unwrap();
        let topology = CoupledTopology::default();
        let cells = adapt_field(
            &mesh,
            &topology,
            &SerialCommunicator,
            &CellField::new(vec![0.5]),
        )
        .unwrap();
        let points = vec![0.0; mesh.n_points()];
        let short_cut = vec![CutType::Cut; 2];
        let contour = Contour {
            cell_values: &cells,
            point_values: &points,
            face_cut_type: &short_cut,
            iso: 0.5,
        };
        let values = vec![0.0; mesh.n_points()];
        let err = generate_tri_points(
            &mesh,
            &topology,
            &contour,
            cells.with_points(&values),
            &SnapValues::none(&mesh),
            &ParallelConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }
}
