//! Uniform owner/neighbour view of cell fields
//!
//! Every face gets a neighbour-side value: the neighbour cell for internal
//! faces and a synthesised value for boundary faces.
//!
//! - empty patches: the owner value (zero gradient); geometric fields keep
//!   the face centre
//! - plain patches: the field's boundary value
//! - collocated coupled patches: the true neighbour cell value
//! - separated coupled patches: owner and neighbour values weighted by
//!   their normal distances to the face; geometric fields keep the face
//!   centre

use crate::stencil::{Source, SourceValues};
use crate::sync::swap_boundary_values;
use isomesh_core::{
    CellField, Communicator, Error, FieldValue, Message, MessageTag, PatchKind, PolyMesh, Result,
    VSMALL,
};

/// Which partition holds the other side of a coupled patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouplingPartner {
    /// Another patch of this partition
    Local { patch: usize },
    /// A patch on another partition
    Remote { rank: usize },
}

/// Classification of one coupled patch, computed once per extraction
#[derive(Debug, Clone, PartialEq)]
pub struct PatchCoupling {
    pub partner: CouplingPartner,
    /// Both sides touch directly (identity transform within tolerance)
    pub collocated: bool,
    /// Owner weight `d_nbr / (d_own + d_nbr)` of every face
    pub owner_weights: Vec<f64>,
}

/// Coupling classification of every patch; `None` for uncoupled patches
#[derive(Debug, Clone, Default)]
pub struct CoupledTopology {
    patches: Vec<Option<PatchCoupling>>,
}

impl CoupledTopology {
    /// Classify the coupled patches of `mesh`, exchanging face counts,
    /// classifications and owner distances with the partner side
    pub fn new(
        mesh: &PolyMesh,
        merge_tolerance: f64,
        merge_distance: f64,
        comm: &dyn Communicator,
    ) -> Result<Self> {
        let owner_distances: Vec<Vec<f64>> = mesh
            .patches()
            .iter()
            .map(|patch| patch.faces().map(|f| owner_distance(mesh, f)).collect())
            .collect();

        let collocated: Vec<bool> = mesh
            .patches()
            .iter()
            .map(|patch| {
                patch
                    .kind
                    .transform()
                    .is_some_and(|t| t.is_collocated(merge_tolerance, merge_distance))
            })
            .collect();

        for (patchi, patch) in mesh.patches().iter().enumerate() {
            if let PatchKind::Processor { neighbour_rank, .. } = patch.kind {
                let mut data = Vec::with_capacity(patch.size + 2);
                data.push(patch.size as f64);
                data.push(if collocated[patchi] { 1.0 } else { 0.0 });
                data.extend_from_slice(&owner_distances[patchi]);
                comm.send(neighbour_rank, Message::new(MessageTag::PatchInfo, data))?;
            }
        }

        let mut patches = Vec::with_capacity(mesh.patches().len());
        for (patchi, patch) in mesh.patches().iter().enumerate() {
            let coupling = match patch.kind {
                PatchKind::Processor { neighbour_rank, .. } => {
                    let data = comm.receive(neighbour_rank, MessageTag::PatchInfo)?;
                    if data.len() != patch.size + 2 || data[0] as usize != patch.size {
                        return Err(Error::ParallelDesync(format!(
                            "patch {} has {} faces but its partner on rank {} sent {} values",
                            patch.name,
                            patch.size,
                            neighbour_rank,
                            data.len()
                        )));
                    }
                    if (data[1] != 0.0) != collocated[patchi] {
                        return Err(Error::ParallelDesync(format!(
                            "patch {} and its partner on rank {} disagree on collocation",
                            patch.name, neighbour_rank
                        )));
                    }
                    Some(PatchCoupling {
                        partner: CouplingPartner::Remote {
                            rank: neighbour_rank,
                        },
                        collocated: collocated[patchi],
                        owner_weights: owner_weights(&owner_distances[patchi], &data[2..]),
                    })
                }
                PatchKind::Cyclic {
                    neighbour_patch, ..
                } => {
                    let partner = mesh.patches().get(neighbour_patch).ok_or_else(|| {
                        Error::InvalidData(format!(
                            "cyclic patch {} refers to missing patch {}",
                            patch.name, neighbour_patch
                        ))
                    })?;
                    let points_back = matches!(
                        partner.kind,
                        PatchKind::Cyclic { neighbour_patch: back, .. } if back == patchi
                    );
                    if !points_back || partner.size != patch.size {
                        return Err(Error::InvalidData(format!(
                            "cyclic patches {} and {} are not a matching pair",
                            patch.name, partner.name
                        )));
                    }
                    Some(PatchCoupling {
                        partner: CouplingPartner::Local {
                            patch: neighbour_patch,
                        },
                        collocated: collocated[patchi],
                        owner_weights: owner_weights(
                            &owner_distances[patchi],
                            &owner_distances[neighbour_patch],
                        ),
                    })
                }
                PatchKind::Wall | PatchKind::Empty => None,
            };
            patches.push(coupling);
        }

        let topology = Self { patches };
        tracing::debug!(
            n_coupled = topology.coupled_patches().count(),
            n_collocated = topology
                .coupled_patches()
                .filter(|(_, c)| c.collocated)
                .count(),
            "classified coupled patches"
        );
        Ok(topology)
    }

    /// Coupling of patch `patchi`, `None` if it is not coupled
    pub fn coupling(&self, patchi: usize) -> Option<&PatchCoupling> {
        self.patches.get(patchi).and_then(|c| c.as_ref())
    }

    pub fn coupled_patches(&self) -> impl Iterator<Item = (usize, &PatchCoupling)> + '_ {
        self.patches
            .iter()
            .enumerate()
            .filter_map(|(patchi, c)| c.as_ref().map(|c| (patchi, c)))
    }

    /// True for boundary faces of collocated coupled patches
    pub fn is_collocated_face(&self, mesh: &PolyMesh, face: usize) -> bool {
        mesh.which_patch(face)
            .and_then(|patchi| self.coupling(patchi))
            .is_some_and(|c| c.collocated)
    }
}

/// Normal distance from the owner cell centre to the face
fn owner_distance(mesh: &PolyMesh, face: usize) -> f64 {
    let sf = mesh.face_areas()[face];
    let mag = sf.norm();
    if mag < VSMALL {
        return 0.0;
    }
    let d = mesh.face_centres()[face] - mesh.cell_centres()[mesh.owner()[face]];
    (sf / mag).dot(&d).abs()
}

fn owner_weights(own: &[f64], nbr: &[f64]) -> Vec<f64> {
    own.iter()
        .zip(nbr)
        .map(|(&d_own, &d_nbr)| {
            let sum = d_own + d_nbr;
            if sum < VSMALL {
                0.5
            } else {
                d_nbr / sum
            }
        })
        .collect()
}

/// A cell field with a neighbour-side value for every boundary face
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedField<T> {
    pub cells: Vec<T>,
    /// Neighbour-side values, indexed by `face - n_internal_faces`
    pub boundary: Vec<T>,
}

impl<T: FieldValue> AdaptedField<T> {
    /// Neighbour-side value of `face`
    pub fn neighbour_value(&self, mesh: &PolyMesh, face: usize) -> T {
        if mesh.is_internal_face(face) {
            self.cells[mesh.neighbour()[face]]
        } else {
            self.boundary[face - mesh.n_internal_faces()]
        }
    }

    /// Pair with vertex values to evaluate stencils
    pub fn with_points<'a>(&'a self, points: &'a [T]) -> FieldSources<'a, T> {
        FieldSources {
            adapted: self,
            points,
        }
    }
}

/// Source on the neighbour side of `face`
pub fn neighbour_source(mesh: &PolyMesh, face: usize) -> Source {
    if mesh.is_internal_face(face) {
        Source::Cell(mesh.neighbour()[face])
    } else {
        Source::Boundary(face - mesh.n_internal_faces())
    }
}

/// Cell-side and vertex values of one field
#[derive(Debug, Clone, Copy)]
pub struct FieldSources<'a, T> {
    pub adapted: &'a AdaptedField<T>,
    pub points: &'a [T],
}

impl<T: FieldValue> SourceValues<T> for FieldSources<'_, T> {
    fn value(&self, source: Source) -> T {
        match source {
            Source::Cell(c) => self.adapted.cells[c],
            Source::Boundary(b) => self.adapted.boundary[b],
            Source::Point(p) => self.points[p],
        }
    }
}

/// Give every boundary face of `field` a neighbour-side value
pub fn adapt_field<T: FieldValue>(
    mesh: &PolyMesh,
    topology: &CoupledTopology,
    comm: &dyn Communicator,
    field: &CellField<T>,
) -> Result<AdaptedField<T>> {
    let n_internal = mesh.n_internal_faces();
    let owner = mesh.owner();

    let owner_values: Vec<T> = (n_internal..mesh.n_faces())
        .map(|f| field.internal[owner[f]])
        .collect();
    let nbr_values =
        swap_boundary_values(mesh, topology, comm, MessageTag::FieldValues, &owner_values)?;

    let mut boundary = Vec::with_capacity(owner_values.len());
    for (patchi, patch) in mesh.patches().iter().enumerate() {
        for (i, face) in patch.faces().enumerate() {
            let bface = face - n_internal;
            let own = owner_values[bface];
            let value = match (&patch.kind, topology.coupling(patchi)) {
                (PatchKind::Empty, _) if field.geometric => field.boundary_value(mesh, bface),
                (PatchKind::Empty, _) => own,
                (_, Some(coupling)) if coupling.collocated => nbr_values[bface],
                (_, Some(_)) if field.geometric => field.boundary_value(mesh, bface),
                (_, Some(coupling)) => {
                    let w = coupling.owner_weights[i];
                    own * w + nbr_values[bface] * (1.0 - w)
                }
                (_, None) => field.boundary_value(mesh, bface),
            };
            boundary.push(value);
        }
    }

    Ok(AdaptedField {
        cells: field.internal.clone(),
        boundary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use isomesh_core::{BlockMesh, BlockSide, Point3d, SerialCommunicator, Vector3d};

    fn make_channel() -> PolyMesh {
        // 4 cells along x, periodic in x, empty in z
        BlockMesh::new(Point3d::origin(), Vector3d::new(4.0, 1.0, 1.0), [4, 1, 1])
            .periodic(0)
            .with_side(BlockSide::ZMin, "front", PatchKind::Empty)
            .with_side(BlockSide::ZMax, "back", PatchKind::Empty)
            .build()
            .unwrap()
    }

    fn make_topology(mesh: &PolyMesh) -> CoupledTopology {
        CoupledTopology::new(mesh, 1e-6, 1e-6 * 4.0, &SerialCommunicator).unwrap()
    }

    #[test]
    fn test_periodic_pair_is_separated() {
        let mesh = make_channel();
        let topology = make_topology(&mesh);
        let coupled: Vec<_> = topology.coupled_patches().collect();
        assert_eq!(coupled.len(), 2);
        for (_, c) in coupled {
            assert!(!c.collocated);
            for &w in &c.owner_weights {
                assert_relative_eq!(w, 0.5);
            }
        }
    }

    #[test]
    fn test_boundary_values() {
        let mesh = make_channel();
        let topology = make_topology(&mesh);
        let field = CellField::new(vec![1.0, 2.0, 3.0, 5.0])
            .with_boundary(vec![-1.0; mesh.n_boundary_faces()]);
        let adapted = adapt_field(&mesh, &topology, &SerialCommunicator, &field).unwrap();

        let n_internal = mesh.n_internal_faces();
        for (patchi, patch) in mesh.patches().iter().enumerate() {
            for face in patch.faces() {
                let value = adapted.boundary[face - n_internal];
                let own = field[mesh.owner()[face]];
                match patch.kind {
                    PatchKind::Empty => assert_eq!(value, own),
                    PatchKind::Cyclic { .. } => {
                        // interpolated between cell 0 and cell 3
                        assert!(topology.coupling(patchi).is_some());
                        assert_relative_eq!(value, 3.0);
                    }
                    _ => assert_eq!(value, -1.0),
                }
            }
        }
    }

    #[test]
    fn test_geometric_field_keeps_face_centres() {
        let mesh = make_channel();
        let topology = make_topology(&mesh);
        let centres = mesh.cell_centre_field();
        let adapted = adapt_field(&mesh, &topology, &SerialCommunicator, &centres).unwrap();

        let n_internal = mesh.n_internal_faces();
        for face in n_internal..mesh.n_faces() {
            assert_eq!(
                adapted.boundary[face - n_internal],
                mesh.face_centres()[face].coords
            );
        }
        assert_eq!(
            adapted.neighbour_value(&mesh, 0),
            mesh.cell_centres()[mesh.neighbour()[0]].coords
        );
    }

    #[test]
    fn test_collocated_cyclic_uses_neighbour_cell() {
        // a baffle-like pair: both sides of the periodic axis declared with
        // an identity transform
        let mesh = BlockMesh::new(Point3d::origin(), Vector3d::new(2.0, 1.0, 1.0), [2, 1, 1])
            .periodic(0)
            .build()
            .unwrap();
        let patches: Vec<_> = mesh
            .patches()
            .iter()
            .cloned()
            .map(|mut p| {
                if let PatchKind::Cyclic { transform, .. } = &mut p.kind {
                    *transform = isomesh_core::Transform3D::identity();
                }
                p
            })
            .collect();
        let mesh = PolyMesh::new(
            mesh.points().to_vec(),
            mesh.faces().to_vec(),
            mesh.owner().to_vec(),
            mesh.neighbour().to_vec(),
            patches,
        )
        .unwrap();

        let topology = make_topology(&mesh);
        assert!(topology.coupled_patches().all(|(_, c)| c.collocated));

        let field = CellField::new(vec![1.0, 7.0]);
        let adapted = adapt_field(&mesh, &topology, &SerialCommunicator, &field).unwrap();
        let xmin = &mesh.patches()[0];
        for face in xmin.faces() {
            assert_eq!(adapted.neighbour_value(&mesh, face), 7.0);
        }
    }

    #[test]
    fn test_processor_patch_needs_partner() {
        let mesh = BlockMesh::new(Point3d::origin(), Vector3d::new(1.0, 1.0, 1.0), [1, 1, 1])
            .with_side(
                BlockSide::XMax,
                "proc",
                PatchKind::Processor {
                    neighbour_rank: 1,
                    transform: isomesh_core::Transform3D::identity(),
                },
            )
            .build()
            .unwrap();
        let err = CoupledTopology::new(&mesh, 1e-6, 1e-6, &SerialCommunicator).unwrap_err();
        assert!(matches!(err, Error::Communication(_)));
    }
}
