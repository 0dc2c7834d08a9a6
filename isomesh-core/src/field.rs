//! Cell and point fields sampled on a [`PolyMesh`]

use crate::error::{check_size, Result};
use crate::point::{Tensor3d, Vector3d, VSMALL};
use crate::poly_mesh::PolyMesh;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::{Add, Index, Mul, Sub};

/// A value type that can be interpolated linearly and shipped between
/// partitions as a flat run of `f64` components
pub trait FieldValue:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
{
    /// Number of `f64` components
    const N_COMPONENTS: usize;

    fn zero() -> Self;

    /// Append the components to `out`
    fn write_components(&self, out: &mut Vec<f64>);

    /// Rebuild a value from the first [`Self::N_COMPONENTS`] entries
    fn from_components(components: &[f64]) -> Self;
}

impl FieldValue for f64 {
    const N_COMPONENTS: usize = 1;

    fn zero() -> Self {
        0.0
    }

    fn write_components(&self, out: &mut Vec<f64>) {
        out.push(*self);
    }

    fn from_components(components: &[f64]) -> Self {
        components[0]
    }
}

impl FieldValue for Vector3d {
    const N_COMPONENTS: usize = 3;

    fn zero() -> Self {
        Vector3d::zeros()
    }

    fn write_components(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(self.as_slice());
    }

    fn from_components(components: &[f64]) -> Self {
        Vector3d::new(components[0], components[1], components[2])
    }
}

impl FieldValue for Tensor3d {
    const N_COMPONENTS: usize = 9;

    fn zero() -> Self {
        Tensor3d::zeros()
    }

    fn write_components(&self, out: &mut Vec<f64>) {
        for i in 0..3 {
            for j in 0..3 {
                out.push(self[(i, j)]);
            }
        }
    }

    fn from_components(components: &[f64]) -> Self {
        Tensor3d::from_row_slice(&components[..9])
    }
}

/// Flatten a slice of values into their components
pub fn flatten<T: FieldValue>(values: &[T]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len() * T::N_COMPONENTS);
    for v in values {
        v.write_components(&mut out);
    }
    out
}

/// Inverse of [`flatten`]
pub fn unflatten<T: FieldValue>(components: &[f64]) -> Vec<T> {
    components
        .chunks_exact(T::N_COMPONENTS)
        .map(T::from_components)
        .collect()
}

/// A field with one value per cell and optionally one per boundary face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellField<T> {
    pub internal: Vec<T>,
    /// Values on boundary faces, indexed by `face - n_internal_faces`.
    /// `None` means zero-gradient (owner value).
    pub boundary: Option<Vec<T>>,
    /// Boundary values are exact face samples (e.g. coordinates) and are
    /// kept on empty and separated patches
    pub geometric: bool,
}

impl<T: FieldValue> CellField<T> {
    /// Create a zero-gradient field from cell values
    pub fn new(internal: Vec<T>) -> Self {
        Self {
            internal,
            boundary: None,
            geometric: false,
        }
    }

    /// Create a field whose boundary values are exact face samples
    pub fn geometric(internal: Vec<T>, boundary: Vec<T>) -> Self {
        Self {
            internal,
            boundary: Some(boundary),
            geometric: true,
        }
    }

    /// Attach explicit boundary-face values
    pub fn with_boundary(mut self, boundary: Vec<T>) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Number of cell values
    pub fn len(&self) -> usize {
        self.internal.len()
    }

    /// Check if the field has no cell values
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty()
    }

    /// Check the field sizes against `mesh`
    pub fn check(&self, mesh: &PolyMesh, what: &str) -> Result<()> {
        check_size(what, mesh.n_cells(), self.internal.len())?;
        if let Some(boundary) = &self.boundary {
            check_size(
                &format!("{} boundary values", what),
                mesh.n_boundary_faces(),
                boundary.len(),
            )?;
        }
        Ok(())
    }

    /// Value on boundary face `bface`: the stored boundary value, or the
    /// owner cell value when none were given
    pub fn boundary_value(&self, mesh: &PolyMesh, bface: usize) -> T {
        match &self.boundary {
            Some(values) => values[bface],
            None => self.internal[mesh.owner()[mesh.n_internal_faces() + bface]],
        }
    }

    /// Cell values replaced by the mean of each cell's vertex values.
    /// Boundary values are kept.
    pub fn point_averaged(&self, mesh: &PolyMesh, point_values: &PointField<T>) -> Self {
        let internal = mesh
            .cell_points()
            .iter()
            .map(|pts| {
                if pts.is_empty() {
                    return T::zero();
                }
                let sum = pts
                    .iter()
                    .fold(T::zero(), |acc, &p| acc + point_values[p]);
                sum * (1.0 / pts.len() as f64)
            })
            .collect();
        Self {
            internal,
            boundary: self.boundary.clone(),
            geometric: self.geometric,
        }
    }
}

impl<T> Index<usize> for CellField<T> {
    type Output = T;

    fn index(&self, cell: usize) -> &T {
        &self.internal[cell]
    }
}

impl CellField<f64> {
    /// Smallest and largest cell value
    pub fn min_max(&self) -> (f64, f64) {
        min_max(&self.internal)
    }
}

/// A field with one value per mesh vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointField<T> {
    pub values: Vec<T>,
}

impl<T: FieldValue> PointField<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check the field size against `mesh`
    pub fn check(&self, mesh: &PolyMesh, what: &str) -> Result<()> {
        check_size(what, mesh.n_points(), self.values.len())
    }

    /// Interpolate a cell field to the vertices with inverse-distance
    /// weights from the surrounding cell centres
    pub fn from_cells(mesh: &PolyMesh, cells: &CellField<T>) -> Self {
        let centres = mesh.cell_centres();
        let values = mesh
            .point_cells()
            .iter()
            .zip(mesh.points())
            .map(|(pcells, p)| {
                let mut sum = T::zero();
                let mut weight_sum = 0.0;
                for &c in pcells {
                    let d = (centres[c] - p).norm();
                    if d < VSMALL {
                        return cells[c];
                    }
                    let w = 1.0 / d;
                    sum = sum + cells[c] * w;
                    weight_sum += w;
                }
                if weight_sum > 0.0 {
                    sum * (1.0 / weight_sum)
                } else {
                    T::zero()
                }
            })
            .collect();
        Self { values }
    }
}

impl<T> Index<usize> for PointField<T> {
    type Output = T;

    fn index(&self, point: usize) -> &T {
        &self.values[point]
    }
}

impl PointField<f64> {
    /// Smallest and largest vertex value
    pub fn min_max(&self) -> (f64, f64) {
        min_max(&self.values)
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockMesh;
    use crate::point::Point3d;
    use approx::assert_relative_eq;

    fn make_cube() -> PolyMesh {
        BlockMesh::new(Point3d::origin(), Vector3d::new(1.0, 1.0, 1.0), [1, 1, 1])
            .build()
            .unwrap()
    }

    #[test]
    fn test_tensor_components_round_trip_layout() {
        let t = Tensor3d::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let flat = flatten(&[t]);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(unflatten::<Tensor3d>(&flat), vec![t]);
    }

    #[test]
    fn test_zero_gradient_boundary_value() {
        let mesh = make_cube();
        let field = CellField::new(vec![3.5]);
        for bface in 0..mesh.n_boundary_faces() {
            assert_eq!(field.boundary_value(&mesh, bface), 3.5);
        }
        assert!(field.check(&mesh, "cells").is_ok());
        assert!(CellField::new(vec![1.0, 2.0]).check(&mesh, "cells").is_err());
    }

    #[test]
    fn test_point_average() {
        let mesh = make_cube();
        let values: Vec<f64> = mesh.points().iter().map(|p| p.z).collect();
        let cells = CellField::new(vec![2.0]).point_averaged(&mesh, &PointField::new(values));
        assert_relative_eq!(cells[0], 0.5);
        assert!(cells.boundary.is_none());
    }

    #[test]
    fn test_point_average_keeps_boundary_values() {
        let mesh = make_cube();
        let values: Vec<f64> = mesh.points().iter().map(|p| p.x).collect();
        let boundary: Vec<f64> = (0..mesh.n_boundary_faces()).map(|b| b as f64).collect();
        let cells = CellField::new(vec![7.0])
            .with_boundary(boundary.clone())
            .point_averaged(&mesh, &PointField::new(values));

        assert_relative_eq!(cells[0], 0.5);
        assert_eq!(cells.boundary.as_deref(), Some(boundary.as_slice()));
        assert_eq!(cells.boundary_value(&mesh, 3), 3.0);
        cells.check(&mesh, "averaged").unwrap();
    }

    #[test]
    fn test_point_field_from_single_cell() {
        let mesh = make_cube();
        let cells = CellField::new(vec![Vector3d::new(1.0, 2.0, 3.0)]);
        let points = PointField::from_cells(&mesh, &cells);
        assert_eq!(points.len(), 8);
        for v in &points.values {
            assert_relative_eq!(*v, Vector3d::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        }
    }
}
