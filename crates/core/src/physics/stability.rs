//! Pasquill-Gifford stability classification
//!
//! Maps surface wind speed to a stability class and its lateral/vertical
//! spread coefficients. The branch order fixes the behavior at the exact
//! boundaries 2.0, 4.0 and 6.0 m/s.
//!
//! # Scientific References
//!
//! - Pasquill, F. (1961). "The estimation of the dispersion of windborne material"
//! - Gifford, F.A. (1961). "Use of routine meteorological observations for estimating
//!   atmospheric dispersion"

use crate::core_types::units::{Celsius, MetersPerSecond};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pasquill-Gifford stability class, from very unstable (A) to stable (F)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StabilityClass {
    /// Very unstable
    A,
    /// Unstable
    B,
    /// Slightly unstable
    C,
    /// Neutral
    D,
    /// Slightly stable
    E,
    /// Stable
    F,
}

impl StabilityClass {
    /// Spread coefficients `(sigma_y0, sigma_z0)` for this class
    #[must_use]
    pub const fn coefficients(self) -> SpreadCoefficients {
        let (sigma_y0, sigma_z0) = match self {
            Self::A => (0.32, 0.24),
            Self::B => (0.24, 0.20),
            Self::C => (0.20, 0.16),
            Self::D => (0.16, 0.12),
            Self::E => (0.12, 0.08),
            Self::F => (0.08, 0.06),
        };
        SpreadCoefficients { sigma_y0, sigma_z0 }
    }

    /// Parse a class letter, falling back to neutral (D) for anything unknown
    #[must_use]
    pub fn from_letter(letter: &str) -> Self {
        match letter.trim().to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "B" => Self::B,
            "C" => Self::C,
            "E" => Self::E,
            "F" => Self::F,
            _ => Self::D,
        }
    }
}

impl fmt::Display for StabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
        };
        f.write_str(letter)
    }
}

/// Base spread coefficients of a stability class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadCoefficients {
    /// Lateral spread coefficient
    pub sigma_y0: f64,
    /// Vertical spread coefficient
    pub sigma_z0: f64,
}

/// Classify the surface layer from wind speed
///
/// - wind < 2.0 → E
/// - 2.0 ≤ wind < 4.0 → D
/// - wind > 6.0 → C
/// - otherwise (4.0 to 6.0 inclusive) → D
///
/// Temperature is accepted for future insolation-based refinement and does
/// not change the class.
#[must_use]
pub fn classify(
    wind_speed: MetersPerSecond,
    _temperature: Celsius,
) -> (StabilityClass, SpreadCoefficients) {
    let wind = *wind_speed;
    let class = if wind < 2.0 {
        StabilityClass::E
    } else if wind < 4.0 {
        StabilityClass::D
    } else if wind > 6.0 {
        StabilityClass::C
    } else {
        StabilityClass::D
    };
    (class, class.coefficients())
}
