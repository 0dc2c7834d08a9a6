//! Point and vector types

use nalgebra::{Matrix3, Point3, Vector3};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A 3x3 tensor with double precision components
pub type Tensor3d = Matrix3<f64>;

/// Very small number used to detect degenerate denominators
pub const VSMALL: f64 = 1.0e-300;
