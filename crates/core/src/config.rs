//! Engine configuration
//!
//! Every heuristic constant of the dispersion model lives here rather than in
//! the physics code: grid shape, time resolution, the transport closure
//! coefficients, and the defaults substituted for missing upstream data. All
//! structs deserialize with `#[serde(default)]`, so a configuration file only
//! needs the fields it changes.

use crate::core_types::{ChemicalProfile, EnvironmentalSample};
use crate::error::{ConfigError, DispersionError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Named grid shapes covering roughly the same 10 km square
///
/// Finer grids resolve the plume better at quadratic cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridPreset {
    /// 50×50 cells of 200 m
    Coarse,
    /// 100×100 cells of 100 m
    Standard,
    /// 200×200 cells of 50 m
    Fine,
}

impl GridPreset {
    /// Cells per side
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Coarse => 50,
            Self::Standard => 100,
            Self::Fine => 200,
        }
    }

    /// Cell edge length (m)
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        match self {
            Self::Coarse => 200.0,
            Self::Standard => 100.0,
            Self::Fine => 50.0,
        }
    }
}

/// Grid shape: `size` × `size` square cells of `cell_size` meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cells per side
    pub size: usize,
    /// Cell edge length (m)
    pub cell_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::from_preset(GridPreset::Standard)
    }
}

impl GridConfig {
    /// Grid shape of a named preset
    pub fn from_preset(preset: GridPreset) -> Self {
        GridConfig {
            size: preset.size(),
            cell_size: preset.cell_size(),
        }
    }

    /// Half-width of the covered square (m)
    pub fn radius_meters(&self) -> f64 {
        self.size as f64 * self.cell_size / 2.0
    }
}

/// How the initial concentration field is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlumeMode {
    /// Single-shot Gaussian-plume field evaluated at the simulation horizon, no stepping
    ClosedForm,
    /// Gaussian mass seed at the source, evolved by the transport stepper
    #[default]
    TimeStepped,
}

/// When the stability class is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StabilityMode {
    /// Classify once from the conditions at t = 0
    #[default]
    Initial,
    /// Re-classify from each step's conditions; the last class is reported
    PerStep,
}

/// Closure coefficients of the transport stepper
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportCoefficients {
    /// Surface drift as a fraction of wind speed
    pub wind_drift_factor: f64,
    /// Scale of the turbulent diffusivity closure (m²/s)
    pub diffusivity_scale: f64,
    /// Wind-stress drag coefficient
    pub wind_stress_coefficient: f64,
    /// Current speed divisor giving the shear term
    pub shear_divisor: f64,
    /// Lower bound on the turbulent diffusivity (m²/s)
    pub min_diffusivity: f64,
    /// Explicit-diffusion stability bound on `D·dt/dx²`
    pub diffusion_cfl_limit: f64,
    /// Upwind-advection bound on `|u|·dt/dx + |v|·dt/dy`
    pub advection_courant_limit: f64,
    /// Most advection sub-steps taken in one step
    pub max_advection_substeps: usize,
    /// Vapor pressure below which evaporation is skipped (Pa)
    pub volatility_threshold: f64,
    /// Divisor applied to `rate·dt` in the evaporation factor
    pub evaporation_scaling: f64,
    /// Wind speed floor in the evaporation mass-transfer coefficient (m/s)
    pub evaporation_wind_floor: f64,
}

impl Default for TransportCoefficients {
    fn default() -> Self {
        Self {
            wind_drift_factor: 0.03,
            diffusivity_scale: 100.0,
            wind_stress_coefficient: 0.0013,
            shear_divisor: 10.0,
            min_diffusivity: 1.0,
            diffusion_cfl_limit: 0.25,
            advection_courant_limit: 1.0,
            max_advection_substeps: 100,
            volatility_threshold: 1000.0,
            evaporation_scaling: 1000.0,
            evaporation_wind_floor: 1.0,
        }
    }
}

/// Coefficients of the two initial-condition models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlumeCoefficients {
    /// Assumed release height above the surface (m)
    pub release_height: f64,
    /// Initial seed spread, in cells
    pub seed_sigma_cells: f64,
    /// Divisor turning released mass (kg) into the plume source strength
    pub concentration_divisor: f64,
    /// Floor on lateral spread (m)
    pub min_sigma_y: f64,
    /// Floor on vertical spread (m)
    pub min_sigma_z: f64,
    /// Floor on downwind distance (m)
    pub min_distance: f64,
    /// Apply decay, diffusion, temperature, tide and wind-dilution factors to the closed-form field
    pub closed_form_factors: bool,
}

impl Default for PlumeCoefficients {
    fn default() -> Self {
        Self {
            release_height: 1.5,
            seed_sigma_cells: 2.0,
            concentration_divisor: 1000.0,
            min_sigma_y: 1.0,
            min_sigma_z: 0.5,
            min_distance: 1.0,
            closed_form_factors: false,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Grid shape
    pub grid: GridConfig,
    /// Transport steps per simulated hour (12 → 5-minute steps)
    pub steps_per_hour: u32,
    /// Longest horizon a run accepts (h)
    pub max_simulation_hours: f64,
    /// Minimum time between completed runs of the same spill
    pub cooldown: Duration,
    /// Initial-condition model
    pub plume_mode: PlumeMode,
    /// Stability classification policy
    pub stability_mode: StabilityMode,
    /// Concentration above which a cell counts as affected
    pub significance_threshold: f64,
    /// Concentration levels for contour extraction
    pub contour_levels: Vec<f64>,
    /// Profile used when the chemical lookup fails; `None` makes that a `NotFound`
    pub fallback_profile: Option<ChemicalProfile>,
    /// Conditions substituted for missing weather/current data
    pub default_conditions: EnvironmentalSample,
    /// Transport closure coefficients
    pub transport: TransportCoefficients,
    /// Initial-condition coefficients
    pub plume: PlumeCoefficients,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            steps_per_hour: 12,
            max_simulation_hours: 720.0,
            cooldown: Duration::from_secs(5),
            plume_mode: PlumeMode::default(),
            stability_mode: StabilityMode::default(),
            significance_threshold: 0.001,
            contour_levels: vec![1.0, 10.0, 100.0, 1000.0],
            fallback_profile: Some(ChemicalProfile::crude_oil()),
            default_conditions: EnvironmentalSample::default_conditions(),
            transport: TransportCoefficients::default(),
            plume: PlumeCoefficients::default(),
        }
    }
}

impl EngineConfig {
    /// Default configuration on a preset grid
    pub fn with_preset(preset: GridPreset) -> Self {
        Self {
            grid: GridConfig::from_preset(preset),
            ..Self::default()
        }
    }

    /// Length of one transport step (s)
    pub fn step_seconds(&self) -> f64 {
        3600.0 / f64::from(self.steps_per_hour.max(1))
    }

    /// Number of steps covering `simulation_hours`
    ///
    /// Non-positive or non-finite horizons take zero steps.
    pub fn total_steps(&self, simulation_hours: f64) -> usize {
        if !simulation_hours.is_finite() || simulation_hours <= 0.0 {
            return 0;
        }
        (simulation_hours * f64::from(self.steps_per_hour)).round() as usize
    }

    /// Reject horizons longer than [`EngineConfig::max_simulation_hours`]
    ///
    /// Non-positive and NaN horizons pass; they take zero steps.
    ///
    /// # Errors
    ///
    /// [`DispersionError::HorizonTooLong`] above the limit, infinity included.
    pub fn check_horizon(&self, simulation_hours: f64) -> Result<(), DispersionError> {
        if simulation_hours > self.max_simulation_hours {
            return Err(DispersionError::HorizonTooLong {
                simulation_hours,
                max_hours: self.max_simulation_hours,
            });
        }
        Ok(())
    }

    /// Check every setting
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.size < 3 {
            return Err(ConfigError::GridTooSmall {
                size: self.grid.size,
            });
        }
        if !self.grid.cell_size.is_finite() || self.grid.cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize {
                cell_size: self.grid.cell_size,
            });
        }
        if self.steps_per_hour == 0 {
            return Err(ConfigError::ZeroStepsPerHour);
        }
        if !self.max_simulation_hours.is_finite() || self.max_simulation_hours <= 0.0 {
            return Err(ConfigError::InvalidMaxHorizon {
                hours: self.max_simulation_hours,
            });
        }

        check_threshold("significance_threshold", self.significance_threshold)?;
        for &level in &self.contour_levels {
            check_threshold("contour_levels", level)?;
        }

        if let Some(profile) = &self.fallback_profile {
            if !profile.is_physical() {
                return Err(ConfigError::NonPhysicalFallback {
                    name: profile.name.clone(),
                });
            }
        }

        let t = &self.transport;
        check_non_negative("wind_drift_factor", t.wind_drift_factor)?;
        check_non_negative("diffusivity_scale", t.diffusivity_scale)?;
        check_non_negative("wind_stress_coefficient", t.wind_stress_coefficient)?;
        check_positive("shear_divisor", t.shear_divisor)?;
        check_non_negative("min_diffusivity", t.min_diffusivity)?;
        check_range("diffusion_cfl_limit", t.diffusion_cfl_limit, 0.25)?;
        check_range("advection_courant_limit", t.advection_courant_limit, 1.0)?;
        if t.max_advection_substeps == 0 {
            return Err(ConfigError::InvalidCoefficient {
                name: "max_advection_substeps",
                value: 0.0,
            });
        }
        check_non_negative("volatility_threshold", t.volatility_threshold)?;
        check_positive("evaporation_scaling", t.evaporation_scaling)?;
        check_positive("evaporation_wind_floor", t.evaporation_wind_floor)?;

        let p = &self.plume;
        check_non_negative("release_height", p.release_height)?;
        check_positive("seed_sigma_cells", p.seed_sigma_cells)?;
        check_positive("concentration_divisor", p.concentration_divisor)?;
        check_positive("min_sigma_y", p.min_sigma_y)?;
        check_positive("min_sigma_z", p.min_sigma_z)?;
        check_positive("min_distance", p.min_distance)?;

        Ok(())
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidCoefficient { name, value })
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidCoefficient { name, value })
    }
}

/// Value must lie in `(0, max]`
fn check_range(name: &'static str, value: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidCoefficient { name, value })
    }
}
