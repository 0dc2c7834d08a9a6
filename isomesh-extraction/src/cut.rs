//! Conservative classification of faces and cells crossed by the contour

use crate::adapter::{AdaptedField, CoupledTopology};
use crate::config::ParallelConfig;
use crate::parallel::parallel_map_range;
use crate::sync::swap_boundary_rows;
use isomesh_core::{Communicator, Error, MessageTag, PolyMesh, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CutType {
    NotCut,
    Cut,
}

impl CutType {
    pub fn is_cut(self) -> bool {
        self == CutType::Cut
    }

    fn from_flag(cut: bool) -> Self {
        if cut {
            CutType::Cut
        } else {
            CutType::NotCut
        }
    }
}

/// Cut classification of every face and cell
#[derive(Debug, Clone, PartialEq)]
pub struct CutClassification {
    pub face_cut_type: Vec<CutType>,
    pub cell_cut_type: Vec<CutType>,
    pub n_cut_cells: usize,
}

/// Whether the tetrahedra of `face` can be crossed by the contour. A face
/// is cut if its owner and neighbour values lie on different sides, or if
/// any face vertex differs in side from the owner, the neighbour or the
/// next vertex.
pub fn classify_face(
    face: &[usize],
    own_value: f64,
    nbr_value: f64,
    point_values: &[f64],
    iso: f64,
) -> CutType {
    let own_lower = own_value < iso;
    let nei_lower = nbr_value < iso;
    if own_lower != nei_lower {
        return CutType::Cut;
    }

    let n = face.len();
    let cut = (0..n).any(|fp| {
        let fp_lower = point_values[face[fp]] < iso;
        let next_lower = point_values[face[(fp + 1) % n]] < iso;
        fp_lower != own_lower || fp_lower != nei_lower || fp_lower != next_lower
    });
    CutType::from_flag(cut)
}

/// Classify every face and cell. Collocated coupled faces must agree with
/// their partner face; a disagreement is a [`Error::ParallelDesync`].
pub fn classify(
    mesh: &PolyMesh,
    topology: &CoupledTopology,
    comm: &dyn Communicator,
    cell_values: &AdaptedField<f64>,
    point_values: &[f64],
    iso: f64,
    parallel: &ParallelConfig,
) -> Result<CutClassification> {
    let faces = mesh.faces();
    let owner = mesh.owner();

    let face_cut_type = parallel_map_range(parallel, mesh.n_faces(), |face| {
        classify_face(
            &faces[face],
            cell_values.cells[owner[face]],
            cell_values.neighbour_value(mesh, face),
            point_values,
            iso,
        )
    });

    check_coupled_cut_types(mesh, topology, comm, &face_cut_type)?;

    let mut cell_cut_type = vec![CutType::NotCut; mesh.n_cells()];
    for (face, cut) in face_cut_type.iter().enumerate() {
        if cut.is_cut() {
            cell_cut_type[owner[face]] = CutType::Cut;
            if let Some(&nei) = mesh.neighbour().get(face) {
                cell_cut_type[nei] = CutType::Cut;
            }
        }
    }
    let n_cut_cells = cell_cut_type.iter().filter(|c| c.is_cut()).count();

    Ok(CutClassification {
        face_cut_type,
        cell_cut_type,
        n_cut_cells,
    })
}

fn check_coupled_cut_types(
    mesh: &PolyMesh,
    topology: &CoupledTopology,
    comm: &dyn Communicator,
    face_cut_type: &[CutType],
) -> Result<()> {
    let n_internal = mesh.n_internal_faces();
    let flags: Vec<f64> = face_cut_type[n_internal..]
        .iter()
        .map(|c| if c.is_cut() { 1.0 } else { 0.0 })
        .collect();
    let partner_flags = swap_boundary_rows(mesh, topology, comm, MessageTag::CutTypes, &flags, 1)?;

    for (patchi, coupling) in topology.coupled_patches() {
        if !coupling.collocated {
            continue;
        }
        let patch = &mesh.patches()[patchi];
        for face in patch.faces() {
            let b = face - n_internal;
            if flags[b] != partner_flags[b] {
                return Err(Error::ParallelDesync(format!(
                    "face {} of patch {} is {:?} but its partner face is {:?}",
                    face - patch.start,
                    patch.name,
                    face_cut_type[face],
                    CutType::from_flag(partner_flags[b] != 0.0)
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::adapt_field;
    use isomesh_core::{BlockMesh, CellField, Point3d, SerialCommunicator, Vector3d};

    #[test]
    fn test_face_sign_change_between_cells() {
        let face = [0, 1, 2, 3];
        let points = [1.0; 4];
        assert_eq!(classify_face(&face, 0.0, 1.0, &points, 0.5), CutType::Cut);
    }

    #[test]
    fn test_face_sign_change_on_vertex() {
        let face = [0, 1, 2, 3];
        let points = [1.0, 1.0, 0.0, 1.0];
        assert_eq!(classify_face(&face, 1.0, 1.0, &points, 0.5), CutType::Cut);
    }

    #[test]
    fn test_uniform_face_not_cut() {
        let face = [0, 1, 2];
        let points = [2.0, 3.0, 4.0];
        assert_eq!(classify_face(&face, 1.0, 1.0, &points, 0.5), CutType::NotCut);
        assert_eq!(classify_face(&face, 1.0, 1.0, &[0.0; 3], 0.5), CutType::Cut);
    }

    #[test]
    fn test_classify_block() {
        // contour x = 1.25 through a 3x1x1 block; the last cell sits
        // entirely on the upper side
        let mesh = BlockMesh::new(Point3d::origin(), Vector3d::new(3.0, 1.0, 1.0), [3, 1, 1])
            .build()
            .unwrap();
        let cells: Vec<f64> = mesh.cell_centres().iter().map(|c| c.x).collect();
        let points: Vec<f64> = mesh.points().iter().map(|p| p.x).collect();

        let topology = CoupledTopology::default();
        let adapted =
            adapt_field(&mesh, &topology, &SerialCommunicator, &CellField::new(cells)).unwrap();
        let cuts = classify(
            &mesh,
            &topology,
            &SerialCommunicator,
            &adapted,
            &points,
            1.25,
            &ParallelConfig::default(),
        )
        .unwrap();

        assert_eq!(
            cuts.cell_cut_type,
            vec![CutType::Cut, CutType::Cut, CutType::NotCut]
        );
        assert_eq!(cuts.n_cut_cells, 2);
        // internal face at x = 1 separates cell values 0.5 and 1.5
        assert_eq!(cuts.face_cut_type[0], CutType::Cut);

        let none = classify(
            &mesh,
            &topology,
            &SerialCommunicator,
            &adapted,
            &points,
            10.0,
            &ParallelConfig::default(),
        )
        .unwrap();
        assert_eq!(none.n_cut_cells, 0);
        assert!(none.face_cut_type.iter().all(|c| !c.is_cut()));
    }
}
