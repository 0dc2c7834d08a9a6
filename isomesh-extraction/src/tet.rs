//! Marching tetrahedra on a single virtual tetrahedron
//!
//! Corners 0 and 1 are consecutive face vertices, corner 2 the owner cell
//! centre and corner 3 the neighbour cell centre. Corner `i` sets bit `i`
//! of the case index when its value lies below the contour value.

use isomesh_core::{FieldValue, VSMALL};

/// Fraction used along edges whose end values are indistinguishable
pub const DEGENERATE_FRACTION: f64 = 0.4999;

/// One corner of a virtual tetrahedron
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TetCorner<T> {
    /// Value of the contoured field
    pub value: f64,
    /// Value of the carried field (coordinates or any interpolated field)
    pub point: T,
    /// Replacement for intersections on this corner's half of an edge
    pub snap: Option<T>,
}

impl<T> TetCorner<T> {
    pub fn new(value: f64, point: T, snap: Option<T>) -> Self {
        Self { value, point, snap }
    }
}

/// Contour crossing on the edge between `a` and `b`.
///
/// The edge is always walked from its lower-valued end, so the result
/// does not depend on the order the corners are given in.
pub fn generate_point<T: FieldValue>(iso: f64, a: &TetCorner<T>, b: &TetCorner<T>) -> T {
    let (a, b) = if b.value < a.value { (b, a) } else { (a, b) };
    let d = b.value - a.value;

    if d.abs() <= VSMALL {
        return a.point * (1.0 - DEGENERATE_FRACTION) + b.point * DEGENERATE_FRACTION;
    }

    let t = (iso - a.value) / d;
    match (a.snap, b.snap) {
        (_, Some(snap)) if (0.5..=1.0).contains(&t) => snap,
        (Some(snap), _) if (0.0..=0.5).contains(&t) => snap,
        _ => a.point * (1.0 - t) + b.point * t,
    }
}

/// Case index of a tetrahedron
pub fn tet_case<T>(iso: f64, corners: &[TetCorner<T>; 4]) -> u8 {
    corners
        .iter()
        .enumerate()
        .fold(0, |acc, (i, c)| if c.value < iso { acc | (1 << i) } else { acc })
}

/// Append the triangles cutting the tetrahedron to `out`, three points
/// per triangle. Returns the number of triangles added.
pub fn evaluate_tet<T: FieldValue>(
    iso: f64,
    corners: &[TetCorner<T>; 4],
    out: &mut Vec<T>,
) -> usize {
    let gp = |i: usize, j: usize| generate_point(iso, &corners[i], &corners[j]);

    match tet_case(iso, corners) {
        0x00 | 0x0F => 0,
        0x01 | 0x0E => {
            out.extend([gp(0, 1), gp(0, 2), gp(0, 3)]);
            1
        }
        0x02 | 0x0D => {
            out.extend([gp(1, 0), gp(1, 3), gp(1, 2)]);
            1
        }
        0x03 | 0x0C => {
            let tp1 = gp(0, 2);
            let tp2 = gp(1, 3);
            out.extend([gp(0, 3), tp1, tp2, tp2, gp(1, 2), tp1]);
            2
        }
        0x04 | 0x0B => {
            out.extend([gp(2, 0), gp(2, 1), gp(2, 3)]);
            1
        }
        0x05 | 0x0A => {
            let tp0 = gp(0, 1);
            let tp1 = gp(2, 3);
            out.extend([tp0, tp1, gp(0, 3), tp0, gp(1, 2), tp1]);
            2
        }
        0x06 | 0x09 => {
            let tp0 = gp(0, 1);
            let tp1 = gp(2, 3);
            out.extend([tp0, gp(1, 3), tp1, tp0, gp(0, 2), tp1]);
            2
        }
        // 0x07 | 0x08
        _ => {
            out.extend([gp(3, 0), gp(3, 2), gp(3, 1)]);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use isomesh_core::Vector3d;

    fn make_corners(values: [f64; 4]) -> [TetCorner<Vector3d>; 4] {
        let positions = [
            Vector3d::new(0.0, 0.0, 0.0),
            Vector3d::new(1.0, 0.0, 0.0),
            Vector3d::new(0.0, 1.0, 0.0),
            Vector3d::new(0.0, 0.0, 1.0),
        ];
        std::array::from_fn(|i| TetCorner::new(values[i], positions[i], None))
    }

    #[test]
    fn test_case_table_triangle_counts() {
        for case in 0u8..16 {
            let values: [f64; 4] = std::array::from_fn(|i| {
                if case & (1 << i) != 0 {
                    0.1 + 0.1 * i as f64
                } else {
                    0.7 + 0.05 * i as f64
                }
            });
            let corners = make_corners(values);
            assert_eq!(tet_case(0.5, &corners), case);

            let mut out = Vec::new();
            let n = evaluate_tet(0.5, &corners, &mut out);
            let expected = match case.count_ones() {
                0 | 4 => 0,
                1 | 3 => 1,
                _ => 2,
            };
            assert_eq!(n, expected, "case {:#04x}", case);
            assert_eq!(out.len(), 3 * n);

            for tri in out.chunks_exact(3) {
                assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
            }
        }
    }

    #[test]
    fn test_points_lie_on_linear_contour() {
        // f(x) = 0.3 + 0.4 x - 0.2 y + 0.9 z sampled at the corners
        let f = |p: &Vector3d| 0.3 + 0.4 * p.x - 0.2 * p.y + 0.9 * p.z;
        let mut corners = make_corners([0.0; 4]);
        for c in corners.iter_mut() {
            c.value = f(&c.point);
        }

        for iso in [0.25, 0.45, 0.6, 1.0] {
            let mut out = Vec::new();
            evaluate_tet(iso, &corners, &mut out);
            for p in &out {
                assert_abs_diff_eq!(f(p), iso, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_generate_point_is_symmetric() {
        let a = TetCorner::new(0.1, Vector3d::new(0.1, 0.2, 0.3), None);
        let b = TetCorner::new(0.9, Vector3d::new(1.7, -0.4, 2.2), None);
        let ab = generate_point(0.37, &a, &b);
        let ba = generate_point(0.37, &b, &a);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_snap_substitution() {
        let snap = Vector3d::new(9.0, 9.0, 9.0);
        let a = TetCorner::new(0.0, Vector3d::zeros(), None);
        let b = TetCorner::new(1.0, Vector3d::new(1.0, 0.0, 0.0), Some(snap));

        // crossing on b's half
        assert_eq!(generate_point(0.75, &a, &b), snap);
        // crossing on a's half, a has no snap
        assert_abs_diff_eq!(generate_point(0.25, &a, &b).x, 0.25);

        let a = TetCorner::new(0.0, Vector3d::zeros(), Some(-snap));
        assert_eq!(generate_point(0.25, &a, &b), -snap);
        // exactly half way prefers the upper corner's snap
        assert_eq!(generate_point(0.5, &a, &b), snap);
    }

    #[test]
    fn test_degenerate_edge() {
        let a = TetCorner::new(0.5, Vector3d::zeros(), Some(Vector3d::new(5.0, 5.0, 5.0)));
        let b = TetCorner::new(0.5, Vector3d::new(1.0, 0.0, 0.0), None);
        let p = generate_point(0.5, &a, &b);
        assert_abs_diff_eq!(p.x, DEGENERATE_FRACTION);
    }
}
