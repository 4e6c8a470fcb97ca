//! Vector type alias for horizontal velocities and offsets.

use nalgebra::Vector2;

/// 2D vector in the local tangent plane: `x` east, `y` north.
///
/// This is a simple alias for `nalgebra::Vector2<f64>`, used for wind drift,
/// ambient current and the combined transport velocity.
pub type Vec2 = Vector2<f64>;
