//! # isomesh
//!
//! Isosurfaces of cell and vertex fields on unstructured polyhedral meshes.
//!
//! This is the umbrella crate that re-exports the member crates. Use the
//! individual crates for more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: polyhedral mesh, fields, surfaces and the partition exchange seam
//! - **Stitching**: triangle-soup stitching and surface cleanup
//! - **Extraction**: regularised marching-tetrahedra extraction
//!
//! ## Quick Start
//!
//! ```rust
//! use isomesh::prelude::*;
//!
//! let mesh = BlockMesh::new(Point3d::origin(), Vector3d::new(1.0, 1.0, 1.0), [4, 4, 4])
//!     .build()
//!     .unwrap();
//! let centre = Point3d::new(0.5, 0.5, 0.5);
//! let cells = CellField::new(
//!     mesh.cell_centres().iter().map(|c| (c - centre).norm()).collect(),
//! );
//!
//! let iso = IsoSurface::serial(&mesh, &cells, None, IsoSurfaceConfig::new(0.3)).unwrap();
//! assert!(iso.surface().face_count() > 0);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: enables stitching and extraction
//! - `stitching`: point merging and stitching
//! - `extraction`: isosurface extraction (implies `stitching`)

// Re-export core functionality
pub use isomesh_core::*;

// Re-export sub-crates
#[cfg(feature = "stitching")]
pub use isomesh_stitching as stitching;

#[cfg(feature = "extraction")]
pub use isomesh_extraction as extraction;

/// Convenient imports for common use cases
pub mod prelude {
    pub use isomesh_core::*;

    #[cfg(feature = "stitching")]
    pub use isomesh_stitching::*;

    #[cfg(feature = "extraction")]
    pub use isomesh_extraction::{
        CleanupConfig, CutType, IsoSurface, IsoSurfaceConfig, ParallelConfig,
    };
}
