//! Semantic unit types for the environmental forcing quantities
//!
//! Newtype wrappers keep wind/current speeds, compass directions and
//! temperatures from being mixed up when they travel through the
//! environmental series and into the transport physics.
//!
//! # Design Philosophy
//! - All types wrap `f64`; the dispersion grid is integrated in double precision
//! - `Deref` to the inner value so physics code can write `*sample.wind_speed`
//! - Total ordering via `Ord` (NaN handled as greater than all values)
//! - Serde support for configuration files and result payloads
//!
//! # Usage
//! ```
//! use dispersion_core::core_types::units::{Celsius, Degrees};
//!
//! let water = Celsius::new(15.0);
//! assert!((*water.to_kelvin() - 288.15).abs() < 1e-9);
//!
//! let heading = Degrees::new(-90.0).normalized();
//! assert_eq!(*heading, 270.0);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref, Mul, Sub};

/// Implements ordering, `Deref` and raw conversions shared by every unit type
macro_rules! impl_unit_basics {
    ($name:ident) => {
        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl Deref for $name {
            type Target = f64;
            #[inline]
            fn deref(&self) -> &f64 {
                &self.0
            }
        }

        impl From<f64> for $name {
            fn from(v: f64) -> Self {
                $name(v)
            }
        }

        impl From<$name> for f64 {
            fn from(v: $name) -> f64 {
                v.0
            }
        }
    };
}

// ============================================================================
// TEMPERATURE
// ============================================================================

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Celsius(f64);

impl_unit_basics!(Celsius);

impl Celsius {
    /// Celsius to Kelvin conversion offset (0°C = 273.15 K)
    pub const KELVIN_OFFSET: f64 = 273.15;

    /// Create a new Celsius temperature
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Celsius(value)
    }

    /// Convert to absolute temperature
    #[inline]
    #[must_use]
    pub fn to_kelvin(self) -> Kelvin {
        Kelvin(self.0 + Self::KELVIN_OFFSET)
    }
}

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C", self.0)
    }
}

/// Absolute temperature in Kelvin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kelvin(f64);

impl_unit_basics!(Kelvin);

impl Kelvin {
    /// Create a new Kelvin temperature
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Kelvin(value)
    }
}

impl fmt::Display for Kelvin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}K", self.0)
    }
}

// ============================================================================
// SPEED
// ============================================================================

/// Speed in meters per second (wind at 10 m, surface current)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MetersPerSecond(f64);

impl_unit_basics!(MetersPerSecond);

impl MetersPerSecond {
    /// Create a new speed. Negative inputs are clamped to zero.
    #[inline]
    #[must_use]
    pub fn new(value: f64) -> Self {
        MetersPerSecond(value.max(0.0))
    }

    /// Convert from km/h
    #[inline]
    #[must_use]
    pub fn from_kmh(kmh: f64) -> Self {
        Self::new(kmh / 3.6)
    }
}

impl Add for MetersPerSecond {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        MetersPerSecond(self.0 + rhs.0)
    }
}

impl Sub for MetersPerSecond {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        MetersPerSecond(self.0 - rhs.0)
    }
}

impl Mul<f64> for MetersPerSecond {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        MetersPerSecond(self.0 * rhs)
    }
}

impl fmt::Display for MetersPerSecond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m/s", self.0)
    }
}

// ============================================================================
// ANGLES
// ============================================================================

/// Compass direction in degrees (0 = north, 90 = east)
///
/// Whether a direction means "from" (wind, meteorological) or "toward"
/// (currents, oceanographic) is decided by the field that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Degrees(f64);

impl_unit_basics!(Degrees);

impl Degrees {
    /// Create a new angle in degrees
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Degrees(value)
    }

    /// Wrap into `[0, 360)`
    #[inline]
    #[must_use]
    pub fn normalized(self) -> Self {
        let wrapped = self.0.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360.0 for tiny negative inputs
        if wrapped >= 360.0 {
            Degrees(0.0)
        } else {
            Degrees(wrapped)
        }
    }

    /// Convert to radians
    #[inline]
    #[must_use]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    /// Interpolate between two headings along the shortest arc
    ///
    /// `t = 0` returns `self`, `t = 1` returns `other`. The result is normalized.
    #[must_use]
    pub fn lerp_shortest(self, other: Degrees, t: f64) -> Degrees {
        let from = self.normalized().0;
        let mut delta = other.normalized().0 - from;
        if delta > 180.0 {
            delta -= 360.0;
        } else if delta < -180.0 {
            delta += 360.0;
        }
        Degrees(from + delta * t).normalized()
    }
}

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_celsius_to_kelvin() {
        assert_relative_eq!(*Celsius::new(25.0).to_kelvin(), 298.15);
        assert_relative_eq!(*Celsius::new(-273.15).to_kelvin(), 0.0);
    }

    #[test]
    fn test_speed_clamps_negative() {
        assert_eq!(*MetersPerSecond::new(-3.0), 0.0);
        assert_relative_eq!(*MetersPerSecond::from_kmh(36.0), 10.0);
    }

    #[test]
    fn test_degrees_normalization() {
        assert_eq!(*Degrees::new(360.0).normalized(), 0.0);
        assert_eq!(*Degrees::new(450.0).normalized(), 90.0);
        assert_eq!(*Degrees::new(-90.0).normalized(), 270.0);
    }

    #[test]
    fn test_degrees_shortest_arc() {
        // 350° → 10° must pass through north, not through 180°
        let mid = Degrees::new(350.0).lerp_shortest(Degrees::new(10.0), 0.5);
        assert_relative_eq!(*mid, 0.0, epsilon = 1e-9);

        let quarter = Degrees::new(90.0).lerp_shortest(Degrees::new(180.0), 0.25);
        assert_relative_eq!(*quarter, 112.5);
    }

    #[test]
    fn test_total_ordering() {
        let a = MetersPerSecond::new(1.0);
        let b = MetersPerSecond::new(2.0);
        assert_eq!(a.max(b), b);
        assert!(Celsius::new(10.0) < Celsius::new(11.0));
    }
}
