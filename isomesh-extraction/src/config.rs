//! Configuration for isosurface extraction

use isomesh_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Experimental surface cleanup, off by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Repeatedly remove triangles dangling off non-manifold edges
    pub remove_dangling: bool,
    /// Walk edge-neighbours to give every component a consistent winding
    pub orient: bool,
}

impl CleanupConfig {
    pub fn is_enabled(&self) -> bool {
        self.remove_dangling || self.orient
    }
}

/// Parallel evaluation of independent faces and cells within one
/// partition. Results do not depend on these settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    pub enabled: bool,
    /// Inputs shorter than this are processed sequentially
    pub min_chunk_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_chunk_size: 256,
        }
    }
}

/// Configuration for [`IsoSurface`](crate::IsoSurface)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsoSurfaceConfig {
    /// Contour value
    pub iso_value: f64,
    /// Collapse intersection clusters around cell centres and vertices
    pub regularise: bool,
    /// Point merge distance as a fraction of the global bounding-box
    /// diagonal. Also the rotation tolerance for classifying coupled
    /// patches as collocated.
    pub merge_tolerance: f64,
    /// Replace cell values by the mean of their vertex values
    pub average_cell_values: bool,
    /// Remove triangles using the same vertices as a lower-indexed one
    pub check_duplicates: bool,
    pub cleanup: CleanupConfig,
    pub parallel: ParallelConfig,
}

impl Default for IsoSurfaceConfig {
    fn default() -> Self {
        Self {
            iso_value: 0.0,
            regularise: true,
            merge_tolerance: 1e-6,
            average_cell_values: false,
            check_duplicates: true,
            cleanup: CleanupConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl IsoSurfaceConfig {
    /// Create a configuration for contour value `iso_value`
    pub fn new(iso_value: f64) -> Self {
        Self {
            iso_value,
            ..Default::default()
        }
    }

    pub fn with_iso_value(mut self, iso_value: f64) -> Self {
        self.iso_value = iso_value;
        self
    }

    pub fn with_regularise(mut self, regularise: bool) -> Self {
        self.regularise = regularise;
        self
    }

    pub fn with_merge_tolerance(mut self, merge_tolerance: f64) -> Self {
        self.merge_tolerance = merge_tolerance;
        self
    }

    pub fn with_average_cell_values(mut self, average: bool) -> Self {
        self.average_cell_values = average;
        self
    }

    pub fn with_check_duplicates(mut self, check: bool) -> Self {
        self.check_duplicates = check;
        self
    }

    pub fn with_cleanup(mut self, cleanup: CleanupConfig) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Reject values the extraction cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.iso_value.is_finite() {
            return Err(Error::InvalidData(format!(
                "iso value {} is not finite",
                self.iso_value
            )));
        }
        if !(self.merge_tolerance.is_finite() && self.merge_tolerance > 0.0) {
            return Err(Error::InvalidData(format!(
                "merge tolerance {} must be positive and finite",
                self.merge_tolerance
            )));
        }
        Ok(())
    }
}
