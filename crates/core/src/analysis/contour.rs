//! Marching-squares style contour extraction
//!
//! Each interior 2×2 block of cells gets a 4-bit case code from which corners
//! are at or above the level. Cases 0 (all below) and 15 (all above) do not
//! cross the level; every other block contributes its center as one contour
//! point. Topology of the resulting polyline is not reconstructed.

use crate::core_types::Vec2;
use crate::grid::{ConcentrationGrid, GeoPoint};
use serde::{Deserialize, Serialize};

/// Contour points of one concentration level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    /// Concentration level
    pub level: f64,
    /// Display label, e.g. `"10 mg/L"`
    pub label: String,
    /// Geographic position of each crossing block's center
    pub points: Vec<GeoPoint>,
    /// Upper-right cell `(i, j)` of each crossing block, parallel to `points`
    pub blocks: Vec<(usize, usize)>,
}

impl Contour {
    /// Whether no block crosses the level
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of contour points
    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// Label used for a contour level
pub fn level_label(level: f64) -> String {
    format!("{level} mg/L")
}

/// Marching-squares case code of a block for `level`
///
/// Bit order: lower-left, lower-right, upper-right, upper-left.
#[inline]
pub fn case_code(corners: [f64; 4], level: f64) -> u8 {
    let [ll, lr, ur, ul] = corners;
    u8::from(ll >= level)
        | (u8::from(lr >= level) << 1)
        | (u8::from(ur >= level) << 2)
        | (u8::from(ul >= level) << 3)
}

/// Extract the contour of a single level
pub fn contour_at(grid: &ConcentrationGrid, level: f64) -> Contour {
    let size = grid.size();
    let mut points = Vec::new();
    let mut blocks = Vec::new();

    // Block (i, j) spans cells i-1..=i and j-1..=j
    for j in 1..size.saturating_sub(1) {
        for i in 1..size - 1 {
            let corners = [
                grid.get(i - 1, j - 1),
                grid.get(i, j - 1),
                grid.get(i, j),
                grid.get(i - 1, j),
            ];
            let case = case_code(corners, level);
            if case == 0 || case == 15 {
                continue;
            }

            let lower_left = grid.cell_offset_meters(i - 1, j - 1);
            let half = grid.cell_size() / 2.0;
            let center = lower_left + Vec2::new(half, half);
            points.push(grid.offset_to_geo(center));
            blocks.push((i, j));
        }
    }

    Contour {
        level,
        label: level_label(level),
        points,
        blocks,
    }
}

/// Extract contours for every level, omitting levels with no crossing
pub fn extract_contours(grid: &ConcentrationGrid, levels: &[f64]) -> Vec<Contour> {
    levels
        .iter()
        .map(|&level| contour_at(grid, level))
        .filter(|contour| !contour.is_empty())
        .collect()
}
