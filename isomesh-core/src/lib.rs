//! Core data structures and traits for isomesh
//!
//! This crate provides the contracts the isosurface engine consumes and
//! produces: the polyhedral mesh with its boundary patches, cell and point
//! fields, the triangulated output surface, coupling transforms and the
//! communicator used to talk to other mesh partitions.

pub mod point;
pub mod mesh;
pub mod poly_mesh;
pub mod field;
pub mod block;
pub mod comm;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use poly_mesh::*;
pub use field::*;
pub use block::*;
pub use comm::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};
