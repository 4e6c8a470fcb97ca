//! Dispersion engine: input resolution, rate limiting and run orchestration
//!
//! The engine is shared by every caller. Its only mutable state is the
//! per-spill cooldown map; each run owns its own grid, so independent spills
//! can be simulated concurrently through [`DispersionEngine::run_many`].

use crate::config::EngineConfig;
use crate::core_types::{ChemicalProfile, EnvironmentalSeries, SpillId, SpillSnapshot};
use crate::error::{DispersionError, NotFoundKind};
use crate::providers::{ChemicalProfileProvider, EnvironmentalSeriesProvider, SpillSource};
use crate::simulation::cancellation::CancellationToken;
use crate::simulation::cooldown::{Clock, CooldownTracker, SystemClock};
use crate::simulation::run::{DefaultsUsed, SimulationResult, SimulationRun};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};

/// Inputs of one run in a batch
#[derive(Debug, Clone)]
pub struct SimulationJob {
    /// Spill to simulate
    pub spill: SpillSnapshot,
    /// Resolved chemical profile, `None` if the lookup failed
    pub profile: Option<ChemicalProfile>,
    /// Environmental forcing
    pub environment: EnvironmentalSeries,
    /// Horizon (h)
    pub simulation_hours: f64,
}

/// Chemical-spill dispersion engine
#[derive(Debug)]
pub struct DispersionEngine {
    config: EngineConfig,
    cooldown: CooldownTracker,
}

// Compile-time assertion: one engine serves concurrent callers
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<DispersionEngine>();
};

impl DispersionEngine {
    /// Build an engine on the system clock
    ///
    /// # Errors
    ///
    /// [`DispersionError::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: EngineConfig) -> Result<Self, DispersionError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build an engine whose cooldown reads time from `clock`
    ///
    /// # Errors
    ///
    /// [`DispersionError::InvalidConfig`] if the configuration does not validate.
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, DispersionError> {
        config.validate()?;
        info!(
            "Dispersion engine initialized: {}x{} grid, cell_size={:.1}m, {} steps/h, {:?} plume, cooldown {:.1}s",
            config.grid.size,
            config.grid.size,
            config.grid.cell_size,
            config.steps_per_hour,
            config.plume_mode,
            config.cooldown.as_secs_f64()
        );
        let cooldown = CooldownTracker::with_clock(config.cooldown, clock);
        Ok(Self { config, cooldown })
    }

    /// Configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Per-spill cooldown state
    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    /// Simulate a spill for `simulation_hours`
    ///
    /// # Errors
    ///
    /// - [`DispersionError::HorizonTooLong`] when `simulation_hours` exceeds
    ///   the configured maximum
    /// - [`DispersionError::NotFound`] when the profile is missing or
    ///   non-physical and no fallback is configured
    /// - [`DispersionError::RateLimited`] inside the spill's cooldown window
    pub fn run(
        &self,
        spill: &SpillSnapshot,
        profile: Option<&ChemicalProfile>,
        environment: &EnvironmentalSeries,
        simulation_hours: f64,
    ) -> Result<SimulationResult, DispersionError> {
        self.run_cancellable(
            spill,
            profile,
            environment,
            simulation_hours,
            &CancellationToken::new(),
        )
    }

    /// [`DispersionEngine::run`] with cooperative cancellation between steps
    ///
    /// # Errors
    ///
    /// As [`DispersionEngine::run`], plus [`DispersionError::Cancelled`].
    pub fn run_cancellable(
        &self,
        spill: &SpillSnapshot,
        profile: Option<&ChemicalProfile>,
        environment: &EnvironmentalSeries,
        simulation_hours: f64,
        cancel: &CancellationToken,
    ) -> Result<SimulationResult, DispersionError> {
        if let Err(err) = self.config.check_horizon(simulation_hours) {
            warn!("Spill {}: INITIALIZED -> FAILED ({})", spill.id, err);
            return Err(err);
        }

        let mut defaults_used = DefaultsUsed::default();

        let profile = match self.resolve_profile(spill, profile) {
            Ok((profile, fallback)) => {
                defaults_used.chemical = fallback;
                profile
            }
            Err(err) => {
                warn!("Spill {}: INITIALIZED -> FAILED ({})", spill.id, err);
                return Err(err);
            }
        };

        if !environment.has_weather() {
            warn!("Spill {}: no weather data, using default conditions", spill.id);
            defaults_used.weather = true;
        }
        if !environment.has_currents() {
            warn!("Spill {}: no current data, using default current", spill.id);
            defaults_used.currents = true;
        }

        let permit = self.cooldown.try_acquire(&spill.id)?;

        let run = SimulationRun::new(
            &self.config,
            spill,
            profile,
            environment,
            simulation_hours,
            defaults_used,
        );
        let result = run.execute(cancel)?;

        permit.complete();
        Ok(result)
    }

    /// Pick the profile to simulate with; the flag is set when the fallback was used
    fn resolve_profile<'a>(
        &'a self,
        spill: &SpillSnapshot,
        profile: Option<&'a ChemicalProfile>,
    ) -> Result<(&'a ChemicalProfile, bool), DispersionError> {
        match profile {
            Some(profile) if profile.is_physical() => return Ok((profile, false)),
            Some(profile) => warn!(
                "Spill {}: chemical profile '{}' has non-physical properties",
                spill.id, profile.name
            ),
            None => warn!(
                "Spill {}: no chemical profile for '{}'",
                spill.id, spill.chemical_type_id
            ),
        }

        match &self.config.fallback_profile {
            Some(fallback) => {
                warn!("Spill {}: using fallback profile '{}'", spill.id, fallback.name);
                Ok((fallback, true))
            }
            None => Err(DispersionError::NotFound {
                kind: NotFoundKind::Chemical,
                id: spill.chemical_type_id.clone(),
            }),
        }
    }

    /// Run independent spills in parallel, one grid each
    ///
    /// Results come back in job order. Jobs for the same spill id compete for
    /// the same cooldown entry, so at most one of them runs.
    pub fn run_many(
        &self,
        jobs: &[SimulationJob],
        cancel: &CancellationToken,
    ) -> Vec<Result<SimulationResult, DispersionError>> {
        info!("Running batch of {} spills", jobs.len());
        jobs.par_iter()
            .map(|job| {
                self.run_cancellable(
                    &job.spill,
                    job.profile.as_ref(),
                    &job.environment,
                    job.simulation_hours,
                    cancel,
                )
            })
            .collect()
    }

    /// Resolve a spill through the providers and simulate it
    ///
    /// All lookups complete before any grid is allocated.
    ///
    /// # Errors
    ///
    /// - [`DispersionError::NotFound`] for an unknown spill, a location without
    ///   an environmental series, or an unresolvable chemical without fallback
    /// - [`DispersionError::HorizonTooLong`], [`DispersionError::RateLimited`]
    ///   and [`DispersionError::Cancelled`] as for
    ///   [`DispersionEngine::run_cancellable`]
    pub fn simulate_spill(
        &self,
        spill_id: &SpillId,
        simulation_hours: f64,
        spills: &dyn SpillSource,
        chemicals: &dyn ChemicalProfileProvider,
        environment: &dyn EnvironmentalSeriesProvider,
        cancel: &CancellationToken,
    ) -> Result<SimulationResult, DispersionError> {
        let spill = spills
            .snapshot(spill_id)
            .ok_or_else(|| DispersionError::NotFound {
                kind: NotFoundKind::Spill,
                id: spill_id.to_string(),
            })?;

        let series = environment
            .forecast(spill.latitude, spill.longitude, simulation_hours)
            .ok_or_else(|| DispersionError::NotFound {
                kind: NotFoundKind::Environment,
                id: spill_id.to_string(),
            })?;

        let profile = chemicals.lookup(&spill.chemical_type_id);
        self.run_cancellable(&spill, profile.as_ref(), &series, simulation_hours, cancel)
    }
}
