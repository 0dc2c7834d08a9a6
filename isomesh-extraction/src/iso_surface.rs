//! Isosurface of a cell and point scalar field on a polyhedral mesh

use crate::adapter::{adapt_field, AdaptedField, CoupledTopology, FieldSources};
use crate::config::IsoSurfaceConfig;
use crate::cut::{classify, CutClassification, CutType};
use crate::generate::{generate_tri_points, Contour, SnapValues, TriangleSoup};
use crate::regularise::{RegulariseInput, SnapStencils};
use crate::sync::global_bound_box;
use isomesh_core::{
    CellField, Communicator, PointField, Point3d, PolyMesh, Result, SerialCommunicator,
    TriSurface, Vector3d,
};
use isomesh_stitching::{
    orient_surface, remove_dangling_triangles, stitch_tri_points, validate_triangles,
};

static SERIAL: SerialCommunicator = SerialCommunicator;

/// A triangulated isosurface together with the addressing needed to carry
/// further fields onto it
pub struct IsoSurface<'a> {
    mesh: &'a PolyMesh,
    comm: &'a dyn Communicator,
    config: IsoSurfaceConfig,

    topology: CoupledTopology,
    cell_values: AdaptedField<f64>,
    point_values: Vec<f64>,
    coords: AdaptedField<Vector3d>,
    point_coords: Vec<Vector3d>,
    merge_distance: f64,

    cuts: CutClassification,
    snaps: Option<SnapStencils>,
    snap_positions: SnapValues<Vector3d>,

    surface: TriSurface,
    mesh_cells: Vec<usize>,
    tri_point_merge_map: Vec<Option<usize>>,
    tri_map: Vec<usize>,
    n_invalid_triangles: usize,
}

impl std::fmt::Debug for IsoSurface<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsoSurface")
            .field("iso_value", &self.config.iso_value)
            .field("n_cut_cells", &self.cuts.n_cut_cells)
            .field("n_points", &self.surface.points.len())
            .field("n_triangles", &self.surface.triangles.len())
            .finish()
    }
}

impl<'a> IsoSurface<'a> {
    /// Extract the isosurface on a single partition. Point values are
    /// interpolated from the cells when not given.
    pub fn serial(
        mesh: &'a PolyMesh,
        cell_values: &CellField<f64>,
        point_values: Option<&PointField<f64>>,
        config: IsoSurfaceConfig,
    ) -> Result<Self> {
        Self::new(mesh, cell_values, point_values, config, &SERIAL)
    }

    /// Extract the isosurface on one partition of a decomposed mesh. Every
    /// partition must call this with the same configuration.
    pub fn new(
        mesh: &'a PolyMesh,
        cell_values: &CellField<f64>,
        point_values: Option<&PointField<f64>>,
        config: IsoSurfaceConfig,
        comm: &'a dyn Communicator,
    ) -> Result<Self> {
        let _span = tracing::info_span!("isosurface", iso = config.iso_value).entered();

        config.validate()?;
        cell_values.check(mesh, "cell values")?;
        let point_values = match point_values {
            Some(p) => {
                p.check(mesh, "point values")?;
                p.clone()
            }
            None => PointField::from_cells(mesh, cell_values),
        };
        let cell_values = if config.average_cell_values {
            cell_values.point_averaged(mesh, &point_values)
        } else {
            cell_values.clone()
        };

        let (cell_min, cell_max) = cell_values.min_max();
        let (point_min, point_max) = point_values.min_max();
        tracing::debug!(
            cell_min,
            cell_max,
            point_min,
            point_max,
            iso = config.iso_value,
            regularise = config.regularise,
            merge_tolerance = config.merge_tolerance,
            "extracting isosurface"
        );

        let merge_distance = config.merge_tolerance * global_bound_box(mesh, comm)?.mag();
        let topology = CoupledTopology::new(mesh, config.merge_tolerance, merge_distance, comm)?;

        let cell_values = adapt_field(mesh, &topology, comm, &cell_values)?;
        let coords = adapt_field(mesh, &topology, comm, &mesh.cell_centre_field())?;
        let point_coords = mesh.point_field().values;
        let point_values = point_values.values;

        let cuts = classify(
            mesh,
            &topology,
            comm,
            &cell_values,
            &point_values,
            config.iso_value,
            &config.parallel,
        )?;
        tracing::debug!(n_cut_cells = cuts.n_cut_cells, "classified cut cells");

        let coord_sources = coords.with_points(&point_coords);
        let snaps = if config.regularise {
            let _span = tracing::info_span!("regularise").entered();
            let input = RegulariseInput {
                mesh,
                topology: &topology,
                cell_values: &cell_values,
                point_values: &point_values,
                coords: coord_sources,
                cuts: &cuts,
                iso: config.iso_value,
                merge_distance,
            };
            Some(SnapStencils::compute(&input, &config.parallel)?)
        } else {
            None
        };
        let snap_positions = match &snaps {
            Some(s) => s.evaluate(mesh, &topology, comm, &coord_sources, &coord_sources)?,
            None => SnapValues::none(mesh),
        };
        tracing::debug!(
            n_cell_snaps = count_snaps(&snap_positions.cell),
            n_point_snaps = count_snaps(&snap_positions.point),
            "regularised"
        );

        let contour = Contour {
            cell_values: &cell_values,
            point_values: &point_values,
            face_cut_type: &cuts.face_cut_type,
            iso: config.iso_value,
        };
        let soup = generate_tri_points(
            mesh,
            &topology,
            &contour,
            coord_sources,
            &snap_positions,
            &config.parallel,
        )?;
        tracing::debug!(n_triangles = soup.n_triangles(), "generated triangle soup");

        let mut iso = Self {
            mesh,
            comm,
            config,
            topology,
            cell_values,
            point_values,
            coords,
            point_coords,
            merge_distance,
            cuts,
            snaps,
            snap_positions,
            surface: TriSurface::new(),
            mesh_cells: Vec::new(),
            tri_point_merge_map: Vec::new(),
            tri_map: Vec::new(),
            n_invalid_triangles: 0,
        };
        iso.stitch(&soup)?;
        Ok(iso)
    }

    fn stitch(&mut self, soup: &TriangleSoup<Vector3d>) -> Result<()> {
        let _span = tracing::info_span!("stitch").entered();

        let tri_points: Vec<Point3d> = soup.points.iter().map(|&p| Point3d::from(p)).collect();
        let stitched =
            stitch_tri_points(&tri_points, self.merge_distance, self.config.check_duplicates)?;
        tracing::debug!(
            n_triangles = stitched.surface.face_count(),
            n_points = stitched.surface.vertex_count(),
            n_degenerate = stitched.n_degenerate,
            n_duplicates = stitched.n_duplicates,
            "stitched surface"
        );

        let mut surface = stitched.surface;
        let mut tri_map = stitched.tri_map;
        let mut tri_point_merge_map = stitched.tri_point_merge_map;

        let cleanup = &self.config.cleanup;
        if cleanup.remove_dangling {
            let subset = remove_dangling_triangles(&surface);
            tracing::debug!(
                n_removed = surface.face_count() - subset.surface.face_count(),
                "removed dangling triangles"
            );

            let mut old_to_new_points = vec![None; surface.vertex_count()];
            for (new, &old) in subset.new_to_old_points.iter().enumerate() {
                old_to_new_points[old] = Some(new);
            }
            for p in tri_point_merge_map.iter_mut() {
                *p = p.and_then(|old| old_to_new_points[old]);
            }
            tri_map = subset.new_to_old_faces.iter().map(|&f| tri_map[f]).collect();
            surface = subset.surface;
        }
        if cleanup.orient {
            let n_flipped = orient_surface(&mut surface);
            tracing::debug!(n_flipped, "oriented surface");
        }

        if cfg!(debug_assertions) {
            self.n_invalid_triangles = validate_triangles(&surface);
            if self.n_invalid_triangles > 0 {
                tracing::warn!(
                    n_invalid = self.n_invalid_triangles,
                    "stitched surface has invalid triangles"
                );
            }
        }

        self.mesh_cells = tri_map.iter().map(|&t| soup.owner_cells[t]).collect();
        self.surface = surface;
        self.tri_map = tri_map;
        self.tri_point_merge_map = tri_point_merge_map;
        Ok(())
    }

    /// Carry a field given on cells and vertices onto the surface points.
    ///
    /// The triangle soup is regenerated with the field riding along the
    /// same interpolation as the coordinates, snap points included, and
    /// averaged onto the merged points.
    pub fn interpolate<T: isomesh_core::FieldValue>(
        &self,
        cell_field: &CellField<T>,
        point_field: &PointField<T>,
    ) -> Result<Vec<T>> {
        let _span = tracing::info_span!("interpolate").entered();
        let mesh = self.mesh;
        cell_field.check(mesh, "interpolated cell field")?;
        point_field.check(mesh, "interpolated point field")?;

        let adapted = adapt_field(mesh, &self.topology, self.comm, cell_field)?;
        let sources = adapted.with_points(&point_field.values);
        let snaps = match &self.snaps {
            Some(s) => {
                s.evaluate(mesh, &self.topology, self.comm, &self.coord_sources(), &sources)?
            }
            None => SnapValues::none(mesh),
        };

        let contour = Contour {
            cell_values: &self.cell_values,
            point_values: &self.point_values,
            face_cut_type: &self.cuts.face_cut_type,
            iso: self.config.iso_value,
        };
        let soup = generate_tri_points(
            mesh,
            &self.topology,
            &contour,
            sources,
            &snaps,
            &self.config.parallel,
        )?;

        let n = self.surface.vertex_count();
        let mut sums = vec![T::zero(); n];
        let mut counts = vec![0usize; n];
        for (value, merged) in soup.points.iter().zip(&self.tri_point_merge_map) {
            if let Some(m) = *merged {
                sums[m] = sums[m] + *value;
                counts[m] += 1;
            }
        }
        Ok(sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| {
                if count > 0 {
                    sum * (1.0 / count as f64)
                } else {
                    sum
                }
            })
            .collect())
    }

    /// [`interpolate`](Self::interpolate) with the vertex values derived
    /// from the cell field
    pub fn interpolate_cell_field<T: isomesh_core::FieldValue>(
        &self,
        cell_field: &CellField<T>,
    ) -> Result<Vec<T>> {
        cell_field.check(self.mesh, "interpolated cell field")?;
        let point_field = PointField::from_cells(self.mesh, cell_field);
        self.interpolate(cell_field, &point_field)
    }

    /// Value of the owning cell for every triangle
    pub fn sample<T: Copy>(&self, cell_field: &CellField<T>) -> Result<Vec<T>> {
        isomesh_core::check_size(
            "sampled cell field",
            self.mesh.n_cells(),
            cell_field.internal.len(),
        )?;
        Ok(self
            .mesh_cells
            .iter()
            .map(|&c| cell_field.internal[c])
            .collect())
    }

    fn coord_sources(&self) -> FieldSources<'_, Vector3d> {
        self.coords.with_points(&self.point_coords)
    }

    pub fn surface(&self) -> &TriSurface {
        &self.surface
    }

    /// Owner cell of every surface triangle
    pub fn mesh_cells(&self) -> &[usize] {
        &self.mesh_cells
    }

    /// Surface point of every triangle soup point, `None` for points of
    /// dropped triangles
    pub fn tri_point_merge_map(&self) -> &[Option<usize>] {
        &self.tri_point_merge_map
    }

    /// Soup triangle of every surface triangle
    pub fn tri_map(&self) -> &[usize] {
        &self.tri_map
    }

    pub fn config(&self) -> &IsoSurfaceConfig {
        &self.config
    }

    pub fn merge_distance(&self) -> f64 {
        self.merge_distance
    }

    /// Invalid triangles found by the debug-build validity pass over the
    /// stitched surface. Always zero in release builds.
    pub fn n_invalid_triangles(&self) -> usize {
        self.n_invalid_triangles
    }

    pub fn n_cut_cells(&self) -> usize {
        self.cuts.n_cut_cells
    }

    pub fn face_cut_types(&self) -> &[CutType] {
        &self.cuts.face_cut_type
    }

    pub fn cell_cut_types(&self) -> &[CutType] {
        &self.cuts.cell_cut_type
    }

    pub fn n_cell_snaps(&self) -> usize {
        count_snaps(&self.snap_positions.cell)
    }

    /// Vertex snaps agreed between partitions
    pub fn n_point_snaps(&self) -> usize {
        count_snaps(&self.snap_positions.point)
    }

    pub fn snapped_cell(&self, cell: usize) -> Option<Point3d> {
        self.snap_positions
            .cell
            .get(cell)
            .copied()
            .flatten()
            .map(Point3d::from)
    }

    pub fn snapped_point(&self, point: usize) -> Option<Point3d> {
        self.snap_positions
            .point
            .get(point)
            .copied()
            .flatten()
            .map(Point3d::from)
    }
}

fn count_snaps<T>(snaps: &[Option<T>]) -> usize {
    snaps.iter().filter(|s| s.is_some()).count()
}
