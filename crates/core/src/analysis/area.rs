//! Affected-area estimate and concentration point export

use crate::grid::{ConcentrationGrid, GeoPoint};
use serde::{Deserialize, Serialize};

/// Square meters per square kilometer
const M2_PER_KM2: f64 = 1_000_000.0;

/// A significant cell in geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationPoint {
    /// Cell center
    pub position: GeoPoint,
    /// Cell concentration
    pub concentration: f64,
}

/// Number of cells strictly above `threshold`
pub fn affected_cell_count(grid: &ConcentrationGrid, threshold: f64) -> usize {
    grid.as_slice().iter().filter(|&&c| c > threshold).count()
}

/// Area of cells strictly above `threshold` (km²)
pub fn affected_area_km2(grid: &ConcentrationGrid, threshold: f64) -> f64 {
    affected_cell_count(grid, threshold) as f64 * grid.cell_area() / M2_PER_KM2
}

/// Every cell strictly above `threshold` with its geographic position
pub fn concentration_points(grid: &ConcentrationGrid, threshold: f64) -> Vec<ConcentrationPoint> {
    grid.cells()
        .filter(|&(_, _, c)| c > threshold)
        .map(|(i, j, concentration)| ConcentrationPoint {
            position: grid.cell_to_geo(i, j),
            concentration,
        })
        .collect()
}
