//! Run orchestration: the engine, single runs, cooldown and cancellation
//!
//! [`DispersionEngine`] resolves inputs and admits runs through the
//! [`CooldownTracker`]; each admitted run is a [`SimulationRun`] that owns its
//! grid until it produces a [`SimulationResult`].

pub mod cancellation;
pub mod cooldown;
pub mod engine;
pub mod run;

pub use cancellation::CancellationToken;
pub use cooldown::{Clock, CooldownPermit, CooldownTracker, ManualClock, SystemClock};
pub use engine::{DispersionEngine, SimulationJob};
pub use run::{DefaultsUsed, RunState, SimulationResult, SimulationRun};
