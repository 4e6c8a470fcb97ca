//! Core types and utilities

pub mod chemical;
pub mod environment;
pub mod spill;
pub mod units;
pub mod vec2;

pub use chemical::ChemicalProfile;
pub use environment::{
    CurrentSample, EnvironmentalSample, EnvironmentalSeries, WeatherSample, STANDARD_PRESSURE_PA,
};
pub use spill::{SpillId, SpillSnapshot};
pub use units::*;
pub use vec2::Vec2;
