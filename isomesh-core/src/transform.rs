//! Coupling transforms between the two sides of a coupled patch

use crate::point::{Point3d, Tensor3d, Vector3d};
use nalgebra::{Matrix4, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// A rigid transformation mapping neighbour-side coordinates onto this side
/// of a coupled patch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f64>,
}

impl Transform3D {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a translation transformation
    pub fn translation(translation: Vector3d) -> Self {
        Self {
            matrix: Matrix4::new_translation(&translation),
        }
    }

    /// Create a rotation transformation from a quaternion
    pub fn rotation(rotation: UnitQuaternion<f64>) -> Self {
        Self {
            matrix: rotation.to_homogeneous(),
        }
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3d) -> Point3d {
        let homogeneous = self.matrix * point.to_homogeneous();
        Point3d::from_homogeneous(homogeneous).unwrap_or(*point)
    }

    /// Upper-left 3x3 block
    pub fn rotation_tensor(&self) -> Tensor3d {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Translation column
    pub fn separation(&self) -> Vector3d {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// True when every component of the rotation tensor lies within
    /// `tolerance` of the identity tensor
    pub fn is_parallel(&self, tolerance: f64) -> bool {
        let rotation = self.rotation_tensor();
        (0..3).all(|i| {
            (0..3).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (rotation[(i, j)] - expected).abs() <= tolerance
            })
        })
    }

    /// True when the translation is longer than `distance`
    pub fn is_separated(&self, distance: f64) -> bool {
        self.separation().norm() > distance
    }

    /// Both sides of the coupling touch directly: no rotation and no
    /// separation within the given tolerances
    pub fn is_collocated(&self, rotation_tolerance: f64, distance: f64) -> bool {
        self.is_parallel(rotation_tolerance) && !self.is_separated(distance)
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_is_collocated() {
        let t = Transform3D::identity();
        assert!(t.is_collocated(1e-6, 1e-9));
        assert!(!t.is_separated(0.0));
    }

    #[test]
    fn test_translation_is_separated() {
        let t = Transform3D::translation(Vector3d::new(-2.0, 0.0, 0.0));
        assert!(t.is_parallel(1e-6));
        assert!(t.is_separated(1e-6));
        assert!(!t.is_collocated(1e-6, 1e-6));

        let p = t.transform_point(&Point3d::new(2.0, 1.0, 0.5));
        assert_relative_eq!(p, Point3d::new(0.0, 1.0, 0.5));
    }

    #[test]
    fn test_rotation_is_not_parallel() {
        let rot = UnitQuaternion::from_axis_angle(&Vector3d::z_axis(), std::f64::consts::FRAC_PI_2);
        let t = Transform3D::rotation(rot);
        assert!(!t.is_parallel(1e-6));

        assert!(!t.is_separated(1e-12));
        assert!(!t.is_collocated(1e-6, 1e-6));

        let p = t.transform_point(&Point3d::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3d::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }
}
