//! Triangulated surface produced by isosurface extraction

use crate::point::*;
use crate::traits::{BoundBox, Bounded};
use serde::{Deserialize, Serialize};

/// A triangle with a region tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelledTri {
    pub vertices: [usize; 3],
    pub region: usize,
}

impl LabelledTri {
    /// Create a triangle in region 0
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self {
            vertices: [a, b, c],
            region: 0,
        }
    }

    /// True when all three vertex indices differ
    pub fn is_valid(&self) -> bool {
        let [a, b, c] = self.vertices;
        a != b && a != c && b != c
    }

    /// Same vertex set, in any order or winding
    pub fn same_vertices(&self, other: &LabelledTri) -> bool {
        self.sorted_vertices() == other.sorted_vertices()
    }

    /// Vertex indices in ascending order
    pub fn sorted_vertices(&self) -> [usize; 3] {
        let mut v = self.vertices;
        v.sort_unstable();
        v
    }

    /// The edge starting at corner `i`
    pub fn edge(&self, i: usize) -> (usize, usize) {
        (self.vertices[i], self.vertices[(i + 1) % 3])
    }

    /// Reverse the winding, keeping the first vertex
    pub fn flip(&mut self) {
        self.vertices.swap(1, 2);
    }

    /// Position of `vertex` in this triangle
    pub fn find(&self, vertex: usize) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }
}

impl std::ops::Index<usize> for LabelledTri {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.vertices[i]
    }
}

/// A triangle surface with shared vertices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriSurface {
    pub points: Vec<Point3d>,
    pub triangles: Vec<LabelledTri>,
}

impl TriSurface {
    /// Create a new empty surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface from points and triangles
    pub fn from_points_and_triangles(points: Vec<Point3d>, triangles: Vec<LabelledTri>) -> Self {
        Self { points, triangles }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    /// Get the number of triangles
    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check if the surface is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() || self.triangles.is_empty()
    }

    /// Area-weighted normal of each triangle
    pub fn face_area_vectors(&self) -> Vec<Vector3d> {
        self.triangles
            .iter()
            .map(|tri| {
                let v0 = self.points[tri[0]];
                let v1 = self.points[tri[1]];
                let v2 = self.points[tri[2]];
                0.5 * (v1 - v0).cross(&(v2 - v0))
            })
            .collect()
    }

    /// Unit normal of each triangle (zero for degenerate triangles)
    pub fn face_normals(&self) -> Vec<Vector3d> {
        self.face_area_vectors()
            .into_iter()
            .map(|a| {
                let mag = a.norm();
                if mag > VSMALL {
                    a / mag
                } else {
                    Vector3d::zeros()
                }
            })
            .collect()
    }

    /// Centroid of each triangle
    pub fn face_centres(&self) -> Vec<Point3d> {
        self.triangles
            .iter()
            .map(|tri| {
                let sum = self.points[tri[0]].coords
                    + self.points[tri[1]].coords
                    + self.points[tri[2]].coords;
                Point3d::from(sum / 3.0)
            })
            .collect()
    }

    /// Total surface area
    pub fn area(&self) -> f64 {
        self.face_area_vectors().iter().map(|a| a.norm()).sum()
    }
}

impl Bounded for TriSurface {
    fn bounding_box(&self) -> BoundBox {
        BoundBox::from_points(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_unit_square() -> TriSurface {
        TriSurface::from_points_and_triangles(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(1.0, 1.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
            ],
            vec![LabelledTri::new(0, 1, 2), LabelledTri::new(0, 2, 3)],
        )
    }

    #[test]
    fn test_area_and_normals() {
        let surf = make_unit_square();
        assert_relative_eq!(surf.area(), 1.0);
        for n in surf.face_normals() {
            assert_relative_eq!(n, Vector3d::z());
        }
        assert_eq!(surf.vertex_count(), 4);
        assert_eq!(surf.face_count(), 2);
    }

    #[test]
    fn test_same_vertices_ignores_winding() {
        let a = LabelledTri::new(3, 1, 2);
        let mut b = a;
        b.flip();
        assert_eq!(b.vertices, [3, 2, 1]);
        assert!(a.same_vertices(&b));
        assert!(!a.same_vertices(&LabelledTri::new(1, 2, 4)));
        assert!(!LabelledTri::new(1, 1, 2).is_valid());
    }
}
