//! Error types for the dispersion engine
//!
//! Only structural problems surface as errors: unknown references, re-run
//! requests inside the cooldown window, invalid configuration, and caller
//! cancellation. Numeric degeneracy (zero wind, zero volume, NaN from odd
//! geometry) is absorbed by the physics and never reported here.

use crate::core_types::SpillId;
use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Which upstream reference could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotFoundKind {
    /// No spill snapshot for the identifier
    Spill,
    /// No chemical profile and no fallback profile configured
    Chemical,
    /// No environmental series for the spill
    Environment,
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spill => write!(f, "spill"),
            Self::Chemical => write!(f, "chemical profile"),
            Self::Environment => write!(f, "environmental series"),
        }
    }
}

/// Invalid engine configuration, detected when the engine is built
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Grid must be at least 3×3 so that an interior exists
    GridTooSmall {
        /// Requested cells per side
        size: usize,
    },
    /// Cell size must be finite and positive
    InvalidCellSize {
        /// Requested cell size (m)
        cell_size: f64,
    },
    /// At least one transport step per simulated hour is required
    ZeroStepsPerHour,
    /// The horizon limit must be finite and positive
    InvalidMaxHorizon {
        /// Requested limit (h)
        hours: f64,
    },
    /// A threshold or contour level is negative or non-finite
    InvalidThreshold {
        /// Name of the offending setting
        name: &'static str,
        /// Offending value
        value: f64,
    },
    /// A transport coefficient is outside its valid range
    InvalidCoefficient {
        /// Name of the offending coefficient
        name: &'static str,
        /// Offending value
        value: f64,
    },
    /// The configured fallback chemical profile has non-physical properties
    NonPhysicalFallback {
        /// Name of the rejected profile
        name: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GridTooSmall { size } => {
                write!(f, "grid size must be at least 3 cells per side, got {size}")
            }
            Self::InvalidCellSize { cell_size } => {
                write!(f, "cell size must be finite and positive, got {cell_size}")
            }
            Self::ZeroStepsPerHour => write!(f, "steps per hour must be at least 1"),
            Self::InvalidMaxHorizon { hours } => {
                write!(f, "maximum simulation horizon must be finite and positive, got {hours}")
            }
            Self::InvalidThreshold { name, value } => {
                write!(f, "{name} must be finite and non-negative, got {value}")
            }
            Self::InvalidCoefficient { name, value } => {
                write!(f, "transport coefficient {name} is out of range: {value}")
            }
            Self::NonPhysicalFallback { name } => {
                write!(f, "fallback chemical profile '{name}' has non-physical properties")
            }
        }
    }
}

impl Error for ConfigError {}

/// Failures surfaced by the dispersion engine
#[derive(Debug, Clone, PartialEq)]
pub enum DispersionError {
    /// A referenced spill, chemical or environmental series is absent.
    /// Raised before any grid is allocated.
    NotFound {
        /// What kind of reference failed
        kind: NotFoundKind,
        /// The identifier that was looked up
        id: String,
    },
    /// A run for this spill completed (or is still running) inside the cooldown window.
    /// Transient: callers should back off and retry.
    RateLimited {
        /// Spill that was rejected
        spill_id: SpillId,
        /// Time until the cooldown expires (zero while a run is in flight)
        retry_after: Duration,
    },
    /// The requested horizon exceeds the configured maximum.
    /// Raised before any grid is allocated.
    HorizonTooLong {
        /// Requested horizon (h)
        simulation_hours: f64,
        /// Configured maximum (h)
        max_hours: f64,
    },
    /// The engine configuration is invalid
    InvalidConfig(ConfigError),
    /// The caller cancelled the run between steps; no partial grid is returned
    Cancelled {
        /// Steps finished before cancellation was observed
        completed_steps: usize,
        /// Steps the run would have taken
        total_steps: usize,
    },
}

impl DispersionError {
    /// Whether retrying the same request later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl fmt::Display for DispersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: '{id}'"),
            Self::RateLimited {
                spill_id,
                retry_after,
            } => write!(
                f,
                "dispersion for spill '{spill_id}' was recalculated too recently; retry in {:.1}s",
                retry_after.as_secs_f64()
            ),
            Self::HorizonTooLong {
                simulation_hours,
                max_hours,
            } => write!(
                f,
                "simulation horizon of {simulation_hours} h exceeds the maximum of {max_hours} h"
            ),
            Self::InvalidConfig(err) => write!(f, "invalid engine configuration: {err}"),
            Self::Cancelled {
                completed_steps,
                total_steps,
            } => write!(
                f,
                "simulation cancelled after {completed_steps} of {total_steps} steps"
            ),
        }
    }
}

impl Error for DispersionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for DispersionError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = DispersionError::NotFound {
            kind: NotFoundKind::Chemical,
            id: "unobtainium".to_string(),
        };
        assert_eq!(err.to_string(), "chemical profile not found: 'unobtainium'");

        let err = DispersionError::RateLimited {
            spill_id: SpillId::from("s1"),
            retry_after: Duration::from_millis(2500),
        };
        assert!(err.to_string().contains("retry in 2.5s"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_config_error_is_source() {
        let err: DispersionError = ConfigError::GridTooSmall { size: 2 }.into();
        assert!(!err.is_transient());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("at least 3"));
    }

    #[test]
    fn test_horizon_too_long_message() {
        let err = DispersionError::HorizonTooLong {
            simulation_hours: 1000.0,
            max_hours: 720.0,
        };
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "simulation horizon of 1000 h exceeds the maximum of 720 h"
        );
    }
}
