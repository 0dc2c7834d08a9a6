//! Core traits for isomesh

use crate::point::{Point3d, Vector3d};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundBox {
    /// An inverted box that any point will grow
    pub fn inverted() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box containing all points. Inverted when `points` is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3d>) -> Self {
        let mut bb = Self::inverted();
        for p in points {
            bb.add_point(p);
        }
        bb
    }

    /// Grow to contain `p`
    pub fn add_point(&mut self, p: &Point3d) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// True once at least one point has been added
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }

    /// Diagonal vector
    pub fn span(&self) -> Vector3d {
        if self.is_valid() {
            self.max - self.min
        } else {
            Vector3d::zeros()
        }
    }

    /// Length of the diagonal
    pub fn mag(&self) -> f64 {
        self.span().norm()
    }
}

impl Default for BoundBox {
    fn default() -> Self {
        Self::inverted()
    }
}

/// Objects with a spatial extent
pub trait Bounded {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> BoundBox;
}
