//! Exchanges across coupled patches and partitions
//!
//! Every exchange sends all its messages before receiving any, so ranks
//! never wait on each other in a cycle. Processor patches talking to the
//! same rank are matched in patch order on both sides.

use crate::adapter::{CoupledTopology, CouplingPartner};
use isomesh_core::{
    flatten, lexicographic_cmp, unflatten, BoundBox, Bounded, Communicator, Error, FieldValue,
    Message, MessageTag, PolyMesh, Point3d, ReduceOp, Result,
};
use std::cmp::Ordering;

/// Swap rows of `stride` values across every coupled patch. Coupled
/// boundary faces receive the row of their partner face; all other rows
/// are returned unchanged. Rows are indexed by `face - n_internal_faces`.
pub fn swap_boundary_rows(
    mesh: &PolyMesh,
    topology: &CoupledTopology,
    comm: &dyn Communicator,
    tag: MessageTag,
    rows: &[f64],
    stride: usize,
) -> Result<Vec<f64>> {
    let n_internal = mesh.n_internal_faces();
    if rows.len() != mesh.n_boundary_faces() * stride {
        return Err(Error::size_mismatch(
            "boundary rows",
            mesh.n_boundary_faces() * stride,
            rows.len(),
        ));
    }
    let patch_rows = |patchi: usize| {
        let patch = &mesh.patches()[patchi];
        let start = (patch.start - n_internal) * stride;
        start..start + patch.size * stride
    };

    for (patchi, coupling) in topology.coupled_patches() {
        if let CouplingPartner::Remote { rank } = coupling.partner {
            comm.send(rank, Message::new(tag, rows[patch_rows(patchi)].to_vec()))?;
        }
    }

    let mut swapped = rows.to_vec();
    for (patchi, coupling) in topology.coupled_patches() {
        let range = patch_rows(patchi);
        match coupling.partner {
            CouplingPartner::Local { patch } => {
                swapped[range].copy_from_slice(&rows[patch_rows(patch)]);
            }
            CouplingPartner::Remote { rank } => {
                let data = comm.receive(rank, tag)?;
                if data.len() != range.len() {
                    return Err(Error::ParallelDesync(format!(
                        "patch {} expected {} values from rank {}, received {}",
                        mesh.patches()[patchi].name,
                        range.len(),
                        rank,
                        data.len()
                    )));
                }
                swapped[range].copy_from_slice(&data);
            }
        }
    }
    Ok(swapped)
}

/// [`swap_boundary_rows`] for one value per boundary face
pub fn swap_boundary_values<T: FieldValue>(
    mesh: &PolyMesh,
    topology: &CoupledTopology,
    comm: &dyn Communicator,
    tag: MessageTag,
    values: &[T],
) -> Result<Vec<T>> {
    let swapped = swap_boundary_rows(mesh, topology, comm, tag, &flatten(values), T::N_COMPONENTS)?;
    Ok(unflatten(&swapped))
}

/// Rows of `stride` values per mesh point, reduced to the lexicographic
/// minimum over collocated coupled point pairs and globally shared points.
/// Every partition ends with the same row for the same physical point.
pub fn sync_point_rows(
    mesh: &PolyMesh,
    topology: &CoupledTopology,
    comm: &dyn Communicator,
    tag: MessageTag,
    rows: &mut [f64],
    stride: usize,
) -> Result<()> {
    if rows.len() != mesh.n_points() * stride {
        return Err(Error::size_mismatch(
            "point rows",
            mesh.n_points() * stride,
            rows.len(),
        ));
    }
    let faces = mesh.faces();
    let patches = mesh.patches();

    // Rows of every face corner, faces in patch order
    let corner_rows = |patchi: usize| {
        let mut out = Vec::new();
        for face in patches[patchi].faces() {
            for &p in &faces[face] {
                out.extend_from_slice(&rows[p * stride..(p + 1) * stride]);
            }
        }
        out
    };

    let collocated: Vec<_> = topology
        .coupled_patches()
        .filter(|(_, c)| c.collocated)
        .collect();

    for &(patchi, coupling) in &collocated {
        if let CouplingPartner::Remote { rank } = coupling.partner {
            comm.send(rank, Message::new(tag, corner_rows(patchi)))?;
        }
    }

    let mut reduced = rows.to_vec();
    for &(patchi, coupling) in &collocated {
        let partner_rows = match coupling.partner {
            CouplingPartner::Local { patch } => corner_rows(patch),
            CouplingPartner::Remote { rank } => comm.receive(rank, tag)?,
        };
        let patch = &patches[patchi];
        let n_corners: usize = patch.faces().map(|f| faces[f].len()).sum();
        if partner_rows.len() != n_corners * stride {
            return Err(Error::ParallelDesync(format!(
                "patch {} has {} face corners but its partner sent {} values",
                patch.name,
                n_corners,
                partner_rows.len()
            )));
        }

        let mut offset = 0;
        for face in patch.faces() {
            let f = &faces[face];
            let n = f.len();
            for (k, &p) in f.iter().enumerate() {
                let partner_corner = offset + (n - k) % n;
                let partner = &partner_rows[partner_corner * stride..(partner_corner + 1) * stride];
                let own = &mut reduced[p * stride..(p + 1) * stride];
                if lexicographic_cmp(partner, own) == Ordering::Less {
                    own.copy_from_slice(partner);
                }
            }
            offset += n;
        }
    }

    let shared = mesh.shared_points();
    let mut global = vec![f64::INFINITY; mesh.n_global_shared_points() * stride];
    for sp in shared {
        let slot = &mut global[sp.global_slot * stride..(sp.global_slot + 1) * stride];
        let own = &reduced[sp.point * stride..(sp.point + 1) * stride];
        if lexicographic_cmp(own, slot) == Ordering::Less {
            slot.copy_from_slice(own);
        }
    }
    let global = comm.all_reduce(global, ReduceOp::LexicographicMin { stride: stride.max(1) })?;
    for sp in shared {
        reduced[sp.point * stride..(sp.point + 1) * stride]
            .copy_from_slice(&global[sp.global_slot * stride..(sp.global_slot + 1) * stride]);
    }

    rows.copy_from_slice(&reduced);
    Ok(())
}

/// Bounding box of the mesh over all partitions
pub fn global_bound_box(mesh: &PolyMesh, comm: &dyn Communicator) -> Result<BoundBox> {
    let local = mesh.bounding_box();
    let values = vec![
        local.min.x,
        local.min.y,
        local.min.z,
        -local.max.x,
        -local.max.y,
        -local.max.z,
    ];
    let reduced = comm.all_reduce(values, ReduceOp::Min)?;
    Ok(BoundBox {
        min: Point3d::new(reduced[0], reduced[1], reduced[2]),
        max: Point3d::new(-reduced[3], -reduced[4], -reduced[5]),
    })
}
