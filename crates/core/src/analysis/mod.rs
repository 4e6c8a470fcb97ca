//! Post-processing of a final concentration grid

pub mod area;
pub mod contour;

pub use area::{affected_area_km2, affected_cell_count, concentration_points, ConcentrationPoint};
pub use contour::{case_code, contour_at, extract_contours, level_label, Contour};
