//! One simulation run: lifecycle state machine and its result

use crate::analysis::{self, ConcentrationPoint, Contour};
use crate::config::{EngineConfig, PlumeMode, StabilityMode};
use crate::core_types::{ChemicalProfile, EnvironmentalSeries, SpillId, SpillSnapshot};
use crate::error::DispersionError;
use crate::grid::ConcentrationGrid;
use crate::physics::{
    classify, closed_form_plume, seed_gaussian_mass, tide_influence, ClosedFormParams,
    StabilityClass, StepReport, TransportStepper,
};
use crate::simulation::cancellation::CancellationToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// Inputs resolved, nothing allocated yet
    Initialized,
    /// Grid allocated and being evolved
    Running,
    /// Result produced
    Complete,
    /// Aborted; no grid is exposed
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialized => "INITIALIZED",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Which inputs were substituted with configured defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefaultsUsed {
    /// The fallback chemical profile replaced a missing or non-physical one
    pub chemical: bool,
    /// Default weather replaced an empty weather series
    pub weather: bool,
    /// Default current replaced an empty current series
    pub currents: bool,
}

impl DefaultsUsed {
    /// Whether any default was substituted
    pub fn any(&self) -> bool {
        self.chemical || self.weather || self.currents
    }
}

/// Final state of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Spill this result belongs to
    pub spill_id: SpillId,
    /// Final concentration field
    pub grid: ConcentrationGrid,
    /// Highest cell concentration
    pub max_concentration: f64,
    /// `Σ cell · cellArea` of the final field
    pub total_mass: f64,
    /// Mass released at t = 0 (kg)
    pub initial_mass: f64,
    /// Highest depth-averaged concentration (kg/m³)
    pub max_depth_averaged: f64,
    /// Stability class (the last one under per-step classification)
    pub stability_class: StabilityClass,
    /// Requested horizon (h)
    pub simulation_hours: f64,
    /// Initial-condition model used
    pub plume_mode: PlumeMode,
    /// Chemical profile actually used
    pub chemical: ChemicalProfile,
    /// Inputs substituted with defaults
    pub defaults_used: DefaultsUsed,
    /// Area above the configured significance threshold (km²)
    pub affected_area_km2: f64,
    /// Contours at the configured levels, empty levels omitted
    pub contours: Vec<Contour>,
    /// One report per transport step; empty in closed-form mode
    pub steps: Vec<StepReport>,
}

impl SimulationResult {
    /// Area above an arbitrary threshold (km²)
    pub fn affected_area_at(&self, threshold: f64) -> f64 {
        analysis::affected_area_km2(&self.grid, threshold)
    }

    /// Cells above `threshold` in geographic coordinates
    pub fn concentration_points(&self, threshold: f64) -> Vec<ConcentrationPoint> {
        analysis::concentration_points(&self.grid, threshold)
    }

    /// Smallest diffusion step used by any transport step (s)
    pub fn min_diffusion_dt(&self) -> Option<f64> {
        self.steps.iter().map(|s| s.diffusion_dt).reduce(f64::min)
    }
}

/// A single run of the engine over resolved inputs
///
/// Owns its grid exclusively between [`RunState::Running`] and
/// [`RunState::Complete`].
#[derive(Debug)]
pub struct SimulationRun<'a> {
    config: &'a EngineConfig,
    spill: &'a SpillSnapshot,
    profile: &'a ChemicalProfile,
    environment: &'a EnvironmentalSeries,
    simulation_hours: f64,
    defaults_used: DefaultsUsed,
    state: RunState,
}

impl<'a> SimulationRun<'a> {
    /// Prepare a run; nothing is allocated until [`SimulationRun::execute`]
    pub fn new(
        config: &'a EngineConfig,
        spill: &'a SpillSnapshot,
        profile: &'a ChemicalProfile,
        environment: &'a EnvironmentalSeries,
        simulation_hours: f64,
        defaults_used: DefaultsUsed,
    ) -> Self {
        Self {
            config,
            spill,
            profile,
            environment,
            simulation_hours,
            defaults_used,
            state: RunState::Initialized,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        info!("Spill {}: {} -> {}", self.spill.id, self.state, next);
        self.state = next;
    }

    /// Evolve the grid to the requested horizon
    ///
    /// # Errors
    ///
    /// - [`DispersionError::HorizonTooLong`] above the configured maximum horizon
    /// - [`DispersionError::Cancelled`] when `cancel` is raised before the last step
    pub fn execute(
        mut self,
        cancel: &CancellationToken,
    ) -> Result<SimulationResult, DispersionError> {
        if let Err(err) = self.config.check_horizon(self.simulation_hours) {
            self.transition(RunState::Failed);
            return Err(err);
        }
        self.transition(RunState::Running);

        let config = self.config;
        let spill = self.spill;
        let profile = self.profile;
        let environment = self.environment;
        let defaults = &config.default_conditions;

        let mut grid = ConcentrationGrid::from_config(spill.latitude, spill.longitude, &config.grid);
        let initial_mass = profile.released_mass_kg(spill.volume_liters);
        if spill.is_degenerate() {
            warn!(
                "Spill {} has degenerate geometry (volume {} L); result will be empty",
                spill.id, spill.volume_liters
            );
        }

        let initial = environment.sample_at(0.0, defaults);
        let (mut stability_class, spread) = classify(initial.wind_speed, initial.temperature);
        info!(
            "Spill {}: stability class {} (wind {}, {})",
            spill.id, stability_class, initial.wind_speed, initial.temperature
        );

        let mut steps = Vec::new();
        match config.plume_mode {
            PlumeMode::ClosedForm => {
                if cancel.is_cancelled() {
                    return Err(self.cancelled(0, 0));
                }
                let params = ClosedFormParams {
                    mass_kg: initial_mass,
                    profile,
                    conditions: &initial,
                    spread,
                    horizon_seconds: self.simulation_hours.max(0.0) * 3600.0,
                    tide_influence: tide_influence(environment),
                };
                closed_form_plume(&mut grid, &params, &config.plume);
            }
            PlumeMode::TimeStepped => {
                seed_gaussian_mass(&mut grid, initial_mass, &config.plume);

                let dt = config.step_seconds();
                let total_steps = config.total_steps(self.simulation_hours);
                let mut stepper = TransportStepper::new(config.transport);

                for step in 0..total_steps {
                    if cancel.is_cancelled() {
                        return Err(self.cancelled(step, total_steps));
                    }

                    let t = step as f64 * dt;
                    let conditions = environment.sample_at(t, defaults);
                    if config.stability_mode == StabilityMode::PerStep {
                        stability_class = classify(conditions.wind_speed, conditions.temperature).0;
                    }

                    let report = stepper.step(&mut grid, profile, &conditions, dt);
                    debug!(
                        "Spill {} step {}/{}: t={:.0}s, u=({:.3}, {:.3}) m/s, substeps={}, D={:.2}, diffusion dt={:.1}s",
                        spill.id,
                        step + 1,
                        total_steps,
                        t,
                        report.velocity.x,
                        report.velocity.y,
                        report.advection_substeps,
                        report.diffusivity,
                        report.diffusion_dt
                    );
                    steps.push(report);
                }
            }
        }

        let max_concentration = grid.max_concentration();
        let total_mass = grid.total_mass();
        let result = SimulationResult {
            spill_id: spill.id.clone(),
            max_concentration,
            total_mass,
            initial_mass,
            max_depth_averaged: grid.max_depth_averaged(spill.water_depth_meters),
            stability_class,
            simulation_hours: self.simulation_hours,
            plume_mode: config.plume_mode,
            chemical: profile.clone(),
            defaults_used: self.defaults_used,
            affected_area_km2: analysis::affected_area_km2(&grid, config.significance_threshold),
            contours: analysis::extract_contours(&grid, &config.contour_levels),
            steps,
            grid,
        };

        self.transition(RunState::Complete);
        info!(
            "Spill {}: max concentration {:.6}, total mass {:.3} kg of {:.3} kg, affected area {:.3} km²",
            spill.id, max_concentration, total_mass, initial_mass, result.affected_area_km2
        );
        Ok(result)
    }

    fn cancelled(&mut self, completed_steps: usize, total_steps: usize) -> DispersionError {
        self.transition(RunState::Failed);
        info!(
            "Spill {}: cancelled after {} of {} steps",
            self.spill.id, completed_steps, total_steps
        );
        DispersionError::Cancelled {
            completed_steps,
            total_steps,
        }
    }
}
