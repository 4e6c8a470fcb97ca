//! Grid storage and coordinate transforms

pub mod concentration_grid;

// Re-export main types
pub use concentration_grid::{sanitize, ConcentrationGrid, GeoPoint, METERS_PER_DEGREE_LAT};
