//! Isosurface on a mesh split over two in-process partitions
//!
//! Each partition runs on its own thread with a channel communicator. The
//! surface points on the partition interface come out identical on both
//! sides.

use isomesh_core::{
    BlockMesh, BlockSide, CellField, ChannelCommunicator, Communicator, PatchKind, Point3d,
    PointField, Transform3D, Vector3d,
};
use isomesh_extraction::{IsoSurface, IsoSurfaceConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("isomesh partitioned example");
    println!("===========================");

    let centre = Point3d::new(1.02, 0.49, 0.53);
    let distance = move |p: &Point3d| (p - centre).norm();

    let results = std::thread::scope(|s| {
        let handles: Vec<_> = ChannelCommunicator::cluster(2)
            .into_iter()
            .map(|comm| {
                s.spawn(move || -> anyhow::Result<(usize, usize, Vec<[u64; 3]>)> {
                    let rank = comm.rank();
                    let (origin, side, neighbour_rank) = if rank == 0 {
                        (Point3d::origin(), BlockSide::XMax, 1)
                    } else {
                        (Point3d::new(1.0, 0.0, 0.0), BlockSide::XMin, 0)
                    };
                    let mesh = BlockMesh::new(origin, Vector3d::new(1.0, 1.0, 1.0), [10, 10, 10])
                        .with_side(
                            side,
                            "procBoundary",
                            PatchKind::Processor {
                                neighbour_rank,
                                transform: Transform3D::identity(),
                            },
                        )
                        .build()?;

                    let cells = CellField::new(mesh.cell_centres().iter().map(distance).collect());
                    let points = PointField::new(mesh.points().iter().map(distance).collect());
                    let config = IsoSurfaceConfig::new(0.4);
                    let iso = IsoSurface::new(&mesh, &cells, Some(&points), config, &comm)?;

                    let mut interface: Vec<[u64; 3]> = iso
                        .surface()
                        .points
                        .iter()
                        .filter(|p| (p.x - 1.0).abs() < 1e-9)
                        .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
                        .collect();
                    interface.sort_unstable();
                    Ok((rank, iso.surface().face_count(), interface))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow::anyhow!("partition thread panicked"))?)
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    for (rank, n_triangles, interface) in &results {
        println!("rank {}: {} triangles, {} interface points", rank, n_triangles, interface.len());
    }
    let identical = results[0].2 == results[1].2;
    println!("interface points identical on both partitions: {}", identical);
    anyhow::ensure!(identical, "partition interfaces differ");

    Ok(())
}
