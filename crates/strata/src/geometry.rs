//! Image geometry metadata attachable to a group.

use serde::{Deserialize, Serialize};

/// A regular-grid geometry: dimensions, spacing, and origin per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub dims: [usize; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
}

impl ImageGeometry {
    pub fn new(dims: [usize; 3]) -> Self {
        Self {
            dims,
            spacing: [1.0; 3],
            origin: [0.0; 3],
        }
    }

    /// Set the per-axis spacing.
    pub fn spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    /// Set the origin.
    pub fn origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    /// Number of cells on the grid.
    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }
}
