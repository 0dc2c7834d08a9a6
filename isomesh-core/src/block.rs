//! Structured hexahedral block meshes
//!
//! Builds a [`PolyMesh`] of `nx * ny * nz` hexahedra filling an axis-aligned
//! box. Each of the six sides becomes one patch, in the order
//! xmin, xmax, ymin, ymax, zmin, zmax. Faces on opposite sides are listed in
//! the same order and start from the same corner, so the sides can be
//! coupled to each other (cyclic) or to a matching block on another
//! partition (processor).

use crate::error::{Error, Result};
use crate::point::{Point3d, Vector3d};
use crate::poly_mesh::{Patch, PatchKind, PolyMesh};
use crate::transform::Transform3D;

/// One side of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSide {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMin,
    ZMax,
}

impl BlockSide {
    pub const ALL: [BlockSide; 6] = [
        BlockSide::XMin,
        BlockSide::XMax,
        BlockSide::YMin,
        BlockSide::YMax,
        BlockSide::ZMin,
        BlockSide::ZMax,
    ];

    /// Patch index of this side in the built mesh
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn axis(self) -> usize {
        self.index() / 2
    }

    pub fn is_max(self) -> bool {
        self.index() % 2 == 1
    }

    pub fn opposite(self) -> BlockSide {
        BlockSide::ALL[self.index() ^ 1]
    }

    fn default_name(self) -> &'static str {
        ["xmin", "xmax", "ymin", "ymax", "zmin", "zmax"][self.index()]
    }
}

/// Builder for a structured hexahedral mesh
#[derive(Debug, Clone)]
pub struct BlockMesh {
    origin: Point3d,
    extent: Vector3d,
    divisions: [usize; 3],
    sides: Vec<(String, PatchKind)>,
}

impl BlockMesh {
    /// A block at `origin` spanning `extent`, with all sides plain walls
    pub fn new(origin: Point3d, extent: Vector3d, divisions: [usize; 3]) -> Self {
        Self {
            origin,
            extent,
            divisions,
            sides: BlockSide::ALL
                .iter()
                .map(|s| (s.default_name().to_string(), PatchKind::Wall))
                .collect(),
        }
    }

    /// Set the name and kind of one side
    pub fn with_side(mut self, side: BlockSide, name: impl Into<String>, kind: PatchKind) -> Self {
        self.sides[side.index()] = (name.into(), kind);
        self
    }

    /// Couple the two sides normal to `axis` (0, 1 or 2) as a cyclic pair
    pub fn periodic(self, axis: usize) -> Self {
        let min = BlockSide::ALL[2 * axis];
        let max = min.opposite();
        let mut shift = Vector3d::zeros();
        shift[axis] = self.extent[axis];

        self.with_side(
            min,
            min.default_name(),
            PatchKind::Cyclic {
                neighbour_patch: max.index(),
                transform: Transform3D::translation(-shift),
            },
        )
        .with_side(
            max,
            max.default_name(),
            PatchKind::Cyclic {
                neighbour_patch: min.index(),
                transform: Transform3D::translation(shift),
            },
        )
    }

    /// Assemble the mesh
    pub fn build(&self) -> Result<PolyMesh> {
        let n = self.divisions;
        if n.iter().any(|&d| d == 0) {
            return Err(Error::InvalidData(format!(
                "block divisions {:?} must all be positive",
                n
            )));
        }

        let point_index = |ijk: [usize; 3]| ijk[0] + (n[0] + 1) * (ijk[1] + (n[1] + 1) * ijk[2]);
        let cell_index = |ijk: [usize; 3]| ijk[0] + n[0] * (ijk[1] + n[1] * ijk[2]);

        let mut points = Vec::with_capacity((n[0] + 1) * (n[1] + 1) * (n[2] + 1));
        for k in 0..=n[2] {
            for j in 0..=n[1] {
                for i in 0..=n[0] {
                    points.push(Point3d::new(
                        self.origin.x + self.extent.x * i as f64 / n[0] as f64,
                        self.origin.y + self.extent.y * j as f64 / n[1] as f64,
                        self.origin.z + self.extent.z * k as f64 / n[2] as f64,
                    ));
                }
            }
        }

        // Vertex loop on the plane `m` normal to `a`, at in-plane index
        // (b, c). The `positive` loop has its normal along +a.
        let face_loop = |a: usize, m: usize, b: usize, c: usize, positive: bool| {
            let (ab, ac) = ((a + 1) % 3, (a + 2) % 3);
            let corner = |db: usize, dc: usize| {
                let mut ijk = [0; 3];
                ijk[a] = m;
                ijk[ab] = b + db;
                ijk[ac] = c + dc;
                point_index(ijk)
            };
            if positive {
                vec![corner(0, 0), corner(1, 0), corner(1, 1), corner(0, 1)]
            } else {
                vec![corner(0, 0), corner(0, 1), corner(1, 1), corner(1, 0)]
            }
        };
        let cell_at = |a: usize, m: usize, b: usize, c: usize| {
            let mut ijk = [0; 3];
            ijk[a] = m;
            ijk[(a + 1) % 3] = b;
            ijk[(a + 2) % 3] = c;
            cell_index(ijk)
        };

        let mut faces = Vec::new();
        let mut owner = Vec::new();
        let mut neighbour = Vec::new();

        for a in 0..3 {
            let (nb, nc) = (n[(a + 1) % 3], n[(a + 2) % 3]);
            for m in 1..n[a] {
                for c in 0..nc {
                    for b in 0..nb {
                        faces.push(face_loop(a, m, b, c, true));
                        owner.push(cell_at(a, m - 1, b, c));
                        neighbour.push(cell_at(a, m, b, c));
                    }
                }
            }
        }

        let mut patches = Vec::with_capacity(6);
        for side in BlockSide::ALL {
            let a = side.axis();
            let (nb, nc) = (n[(a + 1) % 3], n[(a + 2) % 3]);
            let (plane, layer) = if side.is_max() { (n[a], n[a] - 1) } else { (0, 0) };

            let start = faces.len();
            for c in 0..nc {
                for b in 0..nb {
                    faces.push(face_loop(a, plane, b, c, side.is_max()));
                    owner.push(cell_at(a, layer, b, c));
                }
            }
            let (name, kind) = self.sides[side.index()].clone();
            patches.push(Patch::new(name, start, faces.len() - start, kind));
        }

        PolyMesh::new(points, faces, owner, neighbour, patches)
    }
}
