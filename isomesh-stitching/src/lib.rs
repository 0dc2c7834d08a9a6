//! Triangle-soup stitching and surface cleanup
//!
//! This crate turns the per-triangle point lists produced by the extractor
//! into indexed surfaces:
//! - Tolerance-based point merging
//! - Degenerate and duplicate triangle removal
//! - Edge addressing and connected regions
//! - Experimental dangling-triangle removal and orientation

pub mod merge;
pub mod stitch;
pub mod addressing;
pub mod cleanup;

pub use merge::*;
pub use stitch::*;
pub use addressing::*;
pub use cleanup::*;
