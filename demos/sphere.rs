//! Sphere isosurface on a block mesh
//!
//! Extracts the same sphere with and without regularisation and compares
//! triangle counts, then carries a second field onto the surface.

use isomesh_core::{BlockMesh, Bounded, CellField, Point3d, PointField, Vector3d};
use isomesh_extraction::{IsoSurface, IsoSurfaceConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("isomesh sphere example");
    println!("======================");

    let mesh =
        BlockMesh::new(Point3d::origin(), Vector3d::new(1.0, 1.0, 1.0), [24, 24, 24]).build()?;
    println!(
        "Block mesh: {} cells, {} faces, {} points",
        mesh.n_cells(),
        mesh.n_faces(),
        mesh.n_points()
    );

    let centre = Point3d::new(0.503, 0.497, 0.51);
    let radius = 0.35;
    let distance = |p: &Point3d| (p - centre).norm();
    let cells = CellField::new(mesh.cell_centres().iter().map(distance).collect());
    let points = PointField::new(mesh.points().iter().map(distance).collect());

    for regularise in [false, true] {
        let config = IsoSurfaceConfig::new(radius).with_regularise(regularise);
        let iso = IsoSurface::serial(&mesh, &cells, Some(&points), config)?;
        let surface = iso.surface();
        let bb = surface.bounding_box();

        println!("\nregularise = {}", regularise);
        println!("- cut cells:      {}", iso.n_cut_cells());
        println!("- cell snaps:     {}", iso.n_cell_snaps());
        println!("- point snaps:    {}", iso.n_point_snaps());
        println!("- triangles:      {}", surface.face_count());
        println!("- points:         {}", surface.vertex_count());
        println!(
            "- area:           {:.5} (sphere {:.5})",
            surface.area(),
            4.0 * std::f64::consts::PI * radius * radius
        );
        println!(
            "- bounding box:   {:?} .. {:?}",
            bb.min.coords.as_slice(),
            bb.max.coords.as_slice()
        );

        // height above the centre, carried onto the surface points
        let height =
            CellField::new(mesh.cell_centres().iter().map(|c| c.z - centre.z).collect());
        let values = iso.interpolate_cell_field(&height)?;
        let max_err = values
            .iter()
            .zip(&surface.points)
            .map(|(v, p)| (v - (p.z - centre.z)).abs())
            .fold(0.0_f64, f64::max);
        println!("- height field max deviation: {:.3e}", max_err);
    }

    Ok(())
}
