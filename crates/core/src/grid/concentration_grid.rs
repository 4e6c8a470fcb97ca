//! Concentration field anchored at a geographic center
//!
//! Stores the N×N concentration field as a flat `Vec<f64>` in row-major order
//! (`j * size + i`). Axis `i` runs east, axis `j` runs north, and the source
//! cell `(N/2, N/2)` sits on the geographic center.
//!
//! Every write goes through [`sanitize`], so the field stays finite and
//! non-negative whatever the physics produces.

use crate::config::GridConfig;
use crate::core_types::Vec2;
use serde::{Deserialize, Serialize};

/// Meters per degree of latitude in the local equirectangular approximation
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude (degrees)
    pub latitude: f64,
    /// Longitude (degrees)
    pub longitude: f64,
}

/// Coerce a computed concentration into the grid's valid range
///
/// NaN, infinities and negative values all become 0.
#[inline]
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Square concentration grid owned by one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationGrid {
    center_lat: f64,
    center_lon: f64,
    cell_size: f64,
    size: usize,
    cells: Vec<f64>,
}

impl ConcentrationGrid {
    /// Create an all-zero grid of `size` × `size` cells of `cell_size` meters
    ///
    /// A cell size that is not finite and positive is kept as given; the
    /// transport stepper treats such a grid as degenerate and moves nothing.
    pub fn new(center_lat: f64, center_lon: f64, size: usize, cell_size: f64) -> Self {
        Self {
            center_lat,
            center_lon,
            cell_size,
            size,
            cells: vec![0.0; size * size],
        }
    }

    /// Create an all-zero grid shaped by `config`
    pub fn from_config(center_lat: f64, center_lon: f64, config: &GridConfig) -> Self {
        Self::new(center_lat, center_lon, config.size, config.cell_size)
    }

    /// Cells per side
    pub fn size(&self) -> usize {
        self.size
    }

    /// Cell edge length (m)
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Area of one cell (m²)
    pub fn cell_area(&self) -> f64 {
        self.cell_size * self.cell_size
    }

    /// Geographic anchor of the source cell
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.center_lat,
            longitude: self.center_lon,
        }
    }

    /// Index of the source cell, `(N/2, N/2)`
    pub fn source_cell(&self) -> (usize, usize) {
        (self.size / 2, self.size / 2)
    }

    /// Cell values in row-major order (`j * size + i`)
    pub fn as_slice(&self) -> &[f64] {
        &self.cells
    }

    /// Whether `(i, j)` is inside the grid
    pub fn contains(&self, i: usize, j: usize) -> bool {
        i < self.size && j < self.size
    }

    /// Concentration at `(i, j)`
    ///
    /// # Panics
    ///
    /// Panics if the indices are out of bounds
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(self.contains(i, j), "Cell ({i}, {j}) out of bounds");
        self.cells[j * self.size + i]
    }

    /// Store a concentration at `(i, j)`, coercing invalid values to 0
    ///
    /// # Panics
    ///
    /// Panics if the indices are out of bounds
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        assert!(self.contains(i, j), "Cell ({i}, {j}) out of bounds");
        self.cells[j * self.size + i] = sanitize(value);
    }

    /// Reset every cell to zero
    pub fn clear(&mut self) {
        self.cells.fill(0.0);
    }

    /// Multiply every cell by `factor`
    pub fn scale(&mut self, factor: f64) {
        let factor = sanitize(factor);
        for cell in &mut self.cells {
            *cell = sanitize(*cell * factor);
        }
    }

    /// Swap in a freshly computed field, sanitizing it
    pub(crate) fn replace_cells(&mut self, mut cells: Vec<f64>) -> Vec<f64> {
        debug_assert_eq!(cells.len(), self.cells.len());
        for cell in &mut cells {
            *cell = sanitize(*cell);
        }
        std::mem::replace(&mut self.cells, cells)
    }

    /// Physical offset of the cell from the source cell (m), x east and y north
    pub fn cell_offset_meters(&self, i: usize, j: usize) -> Vec2 {
        let half = (self.size / 2) as f64;
        Vec2::new(
            (i as f64 - half) * self.cell_size,
            (j as f64 - half) * self.cell_size,
        )
    }

    /// Meters per degree of longitude at the grid's latitude
    pub fn meters_per_degree_lon(&self) -> f64 {
        METERS_PER_DEGREE_LAT * self.center_lat.to_radians().cos()
    }

    /// Geographic position of an offset (m) from the center
    ///
    /// At the poles the longitude degree length vanishes; the longitude then
    /// stays at the center value.
    pub fn offset_to_geo(&self, offset: Vec2) -> GeoPoint {
        let lon_scale = self.meters_per_degree_lon();
        let d_lon = if lon_scale.abs() > f64::EPSILON {
            offset.x / lon_scale
        } else {
            0.0
        };
        GeoPoint {
            latitude: self.center_lat + offset.y / METERS_PER_DEGREE_LAT,
            longitude: self.center_lon + d_lon,
        }
    }

    /// Geographic position of the center of cell `(i, j)`
    pub fn cell_to_geo(&self, i: usize, j: usize) -> GeoPoint {
        self.offset_to_geo(self.cell_offset_meters(i, j))
    }

    /// Highest cell concentration
    pub fn max_concentration(&self) -> f64 {
        self.cells.iter().copied().fold(0.0, f64::max)
    }

    /// Grid integral `Σ cell · cellArea`
    pub fn total_mass(&self) -> f64 {
        self.cells.iter().sum::<f64>() * self.cell_area()
    }

    /// Highest concentration averaged over a water column of `depth_meters`
    ///
    /// Zero when the depth is non-positive or non-finite.
    pub fn max_depth_averaged(&self, depth_meters: f64) -> f64 {
        if !depth_meters.is_finite() || depth_meters <= 0.0 {
            return 0.0;
        }
        sanitize(self.max_concentration() / depth_meters)
    }

    /// Iterate over `(i, j, concentration)` for every cell
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, &c)| (idx % size, idx / size, c))
    }
}
