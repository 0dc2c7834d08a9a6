//! # isomesh extraction
//!
//! Regularised marching-tetrahedra isosurfaces of scalar fields on
//! polyhedral meshes.
//!
//! Every face is split into virtual tetrahedra, one per face edge, spanned
//! by the edge and the two cell centres on either side of the face. Before
//! triangulating, intersection clusters close to a cell centre or a vertex
//! are collapsed onto a single snap point, which removes most sliver
//! triangles. The resulting triangle soup is stitched into an indexed
//! surface that remembers the owner cell of every triangle.
//!
//! Decomposed meshes are supported through the [`Communicator`] seam: every
//! partition runs the same extraction and exchanges data across processor
//! patches, so triangles on partition interfaces coincide exactly.
//!
//! [`Communicator`]: isomesh_core::Communicator

pub mod config;
pub mod parallel;
pub mod stencil;
pub mod adapter;
pub mod sync;
pub mod cut;
pub mod tet;
pub mod regularise;
pub mod generate;
pub mod iso_surface;

pub use config::*;
pub use stencil::{Source, SourceValues, Stencil};
pub use adapter::{
    adapt_field, AdaptedField, CoupledTopology, CouplingPartner, FieldSources, PatchCoupling,
};
pub use sync::{global_bound_box, swap_boundary_rows, swap_boundary_values, sync_point_rows};
pub use cut::{classify, classify_face, CutClassification, CutType};
pub use tet::{evaluate_tet, generate_point, tet_case, TetCorner};
pub use regularise::{iso_fraction, SnapStencils};
pub use generate::{generate_tri_points, Contour, SnapValues, TriangleSoup};
pub use iso_surface::IsoSurface;

pub use isomesh_core::{Error, Result};
