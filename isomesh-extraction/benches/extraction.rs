//! Benchmarks of sphere extraction with and without regularisation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use isomesh_core::{BlockMesh, CellField, Point3d, PointField, PolyMesh, Vector3d};
use isomesh_extraction::{IsoSurface, IsoSurfaceConfig, ParallelConfig};

fn generate_sphere_fields(divisions: usize) -> (PolyMesh, CellField<f64>, PointField<f64>) {
    let mesh = BlockMesh::new(
        Point3d::origin(),
        Vector3d::new(1.0, 1.0, 1.0),
        [divisions, divisions, divisions],
    )
    .build()
    .unwrap();
    let centre = Point3d::new(0.503, 0.497, 0.51);
    let distance = |p: &Point3d| (p - centre).norm();
    let cells = CellField::new(mesh.cell_centres().iter().map(distance).collect());
    let points = PointField::new(mesh.points().iter().map(distance).collect());
    (mesh, cells, points)
}

fn bench_extraction(c: &mut Criterion) {
    let sizes = [8, 16, 32];

    let mut group = c.benchmark_group("extraction");

    for &size in &sizes {
        let (mesh, cells, points) = generate_sphere_fields(size);
        let label = format!("{}c", mesh.n_cells());

        for regularise in [false, true] {
            let name = if regularise { "regularised" } else { "plain" };
            group.bench_with_input(
                BenchmarkId::new(name, &label),
                &(&mesh, &cells, &points),
                |b, &(mesh, cells, points)| {
                    let config = IsoSurfaceConfig::new(0.35).with_regularise(regularise);
                    b.iter(|| {
                        let iso =
                            IsoSurface::serial(black_box(mesh), cells, Some(points), config.clone())
                                .unwrap();
                        black_box(iso.surface().face_count());
                    });
                },
            );
        }

        group.bench_with_input(
            BenchmarkId::new("serial_maps", &label),
            &(&mesh, &cells, &points),
            |b, &(mesh, cells, points)| {
                let config = IsoSurfaceConfig::new(0.35).with_parallel(ParallelConfig {
                    enabled: false,
                    ..ParallelConfig::default()
                });
                b.iter(|| {
                    let iso =
                        IsoSurface::serial(black_box(mesh), cells, Some(points), config.clone())
                            .unwrap();
                    black_box(iso.surface().face_count());
                });
            },
        );
    }

    group.finish();
}

fn bench_interpolate(c: &mut Criterion) {
    let (mesh, cells, points) = generate_sphere_fields(24);
    let iso =
        IsoSurface::serial(&mesh, &cells, Some(&points), IsoSurfaceConfig::new(0.35)).unwrap();
    let coords = mesh.cell_centre_field();
    let point_coords = mesh.point_field();

    c.bench_function("interpolate_coordinates", |b| {
        b.iter(|| {
            let values = iso.interpolate(black_box(&coords), &point_coords).unwrap();
            black_box(values);
        });
    });
}

criterion_group!(benches, bench_extraction, bench_interpolate);
criterion_main!(benches);
