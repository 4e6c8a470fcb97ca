//! Chemical Spill Dispersion Core Library
//!
//! Estimates how a chemical released into surface water spreads over the
//! following hours. A spill snapshot, a chemical profile and a weather/current
//! series go in; a concentration grid centered on the release point comes out,
//! together with summary statistics, iso-concentration contours and the
//! affected area.
//!
//! ## Model
//!
//! - Pasquill–Gifford stability classification from wind speed
//! - Initial condition: a compact Gaussian mass seed, or a closed-form
//!   Gaussian plume evaluated at the horizon
//! - Time-stepped transport: upwind advection by wind drift plus current,
//!   explicit diffusion with a turbulent diffusivity, first-order decay and
//!   vapor-pressure driven evaporation
//! - Marching-squares contour extraction and threshold area
//!
//! Runs for the same spill are rate limited by a per-spill cooldown; runs for
//! different spills are independent and may execute in parallel.

pub mod analysis;
pub mod config;
pub mod core_types;
pub mod error;
pub mod grid;
pub mod physics;
pub mod providers;
pub mod simulation;

// Re-export core types
pub use core_types::{
    Celsius, ChemicalProfile, CurrentSample, Degrees, EnvironmentalSample, EnvironmentalSeries,
    MetersPerSecond, SpillId, SpillSnapshot, Vec2, WeatherSample,
};

// Re-export configuration and errors
pub use config::{EngineConfig, GridConfig, GridPreset, PlumeMode, StabilityMode};
pub use error::{ConfigError, DispersionError, NotFoundKind};

// Re-export grid and analysis types
pub use analysis::{ConcentrationPoint, Contour};
pub use grid::{ConcentrationGrid, GeoPoint};
pub use physics::{StabilityClass, StepReport};

// Re-export the engine surface
pub use providers::{
    ChemicalCatalog, ChemicalProfileProvider, EnvironmentalSeriesProvider, SpillRegistry,
    SpillSource, StaticEnvironment,
};
pub use simulation::{
    CancellationToken, DefaultsUsed, DispersionEngine, RunState, SimulationJob, SimulationResult,
};
