//! Upstream data collaborators
//!
//! The engine never fetches anything itself. Spill snapshots, chemical
//! profiles and environmental forecasts come through these traits, already
//! resolved to plain values. The in-memory implementations here back the
//! demo and the tests.

use crate::core_types::{
    ChemicalProfile, CurrentSample, Degrees, EnvironmentalSeries, MetersPerSecond, SpillId,
    SpillSnapshot, WeatherSample,
};
use rustc_hash::FxHashMap;
use std::f64::consts::PI;

/// Semi-diurnal (M2) tidal period (h)
pub const SEMI_DIURNAL_PERIOD_HOURS: f64 = 12.42;

/// Source of spill snapshots
pub trait SpillSource: Send + Sync {
    /// Snapshot of the spill, `None` if it does not exist
    fn snapshot(&self, id: &SpillId) -> Option<SpillSnapshot>;
}

/// Source of chemical profiles
pub trait ChemicalProfileProvider: Send + Sync {
    /// Profile for a chemical type, `None` if the exact lookup fails
    fn lookup(&self, chemical_type_id: &str) -> Option<ChemicalProfile>;
}

/// Source of weather and current forecasts
pub trait EnvironmentalSeriesProvider: Send + Sync {
    /// Forecast for a location
    ///
    /// Either half of the series may be empty when its upstream source failed.
    /// `None` means no series exists for the location at all.
    fn forecast(&self, latitude: f64, longitude: f64, hours_ahead: f64)
        -> Option<EnvironmentalSeries>;
}

/// In-memory spill store
#[derive(Debug, Clone, Default)]
pub struct SpillRegistry {
    spills: FxHashMap<SpillId, SpillSnapshot>,
}

impl SpillRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a snapshot, returning the previous one
    pub fn insert(&mut self, spill: SpillSnapshot) -> Option<SpillSnapshot> {
        self.spills.insert(spill.id.clone(), spill)
    }

    /// Remove a snapshot
    pub fn remove(&mut self, id: &SpillId) -> Option<SpillSnapshot> {
        self.spills.remove(id)
    }

    /// Number of stored spills
    pub fn len(&self) -> usize {
        self.spills.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.spills.is_empty()
    }

    /// Identifiers of all stored spills, sorted
    pub fn ids(&self) -> Vec<SpillId> {
        let mut ids: Vec<_> = self.spills.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl SpillSource for SpillRegistry {
    fn snapshot(&self, id: &SpillId) -> Option<SpillSnapshot> {
        self.spills.get(id).cloned()
    }
}

/// Named chemical profiles with case-insensitive lookup
#[derive(Debug, Clone, Default)]
pub struct ChemicalCatalog {
    profiles: FxHashMap<String, ChemicalProfile>,
}

impl ChemicalCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in profiles
    pub fn with_presets() -> Self {
        let mut catalog = Self::new();
        for profile in [
            ChemicalProfile::crude_oil(),
            ChemicalProfile::diesel(),
            ChemicalProfile::benzene(),
            ChemicalProfile::toluene(),
            ChemicalProfile::methanol(),
        ] {
            catalog.insert(profile);
        }
        catalog
    }

    /// Add or replace a profile under its own name
    pub fn insert(&mut self, profile: ChemicalProfile) -> Option<ChemicalProfile> {
        self.profiles.insert(normalize_key(&profile.name), profile)
    }

    /// Number of profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profile names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.profiles.values().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl ChemicalProfileProvider for ChemicalCatalog {
    fn lookup(&self, chemical_type_id: &str) -> Option<ChemicalProfile> {
        self.profiles.get(&normalize_key(chemical_type_id)).cloned()
    }
}

fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The same series for every location
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    series: Option<EnvironmentalSeries>,
}

impl StaticEnvironment {
    /// Provider answering every forecast with `series`
    pub fn new(series: EnvironmentalSeries) -> Self {
        Self {
            series: Some(series),
        }
    }

    /// Provider that has no series for any location
    pub fn unavailable() -> Self {
        Self { series: None }
    }

    /// Combine a weather forecast with a synthetic tide
    pub fn with_synthetic_tide(weather: Vec<WeatherSample>, hours: usize) -> Self {
        Self::new(EnvironmentalSeries::new(weather, synthetic_tidal_currents(hours)))
    }
}

impl EnvironmentalSeriesProvider for StaticEnvironment {
    fn forecast(
        &self,
        _latitude: f64,
        _longitude: f64,
        _hours_ahead: f64,
    ) -> Option<EnvironmentalSeries> {
        self.series.clone()
    }
}

/// Hourly semi-diurnal tidal currents for `hours` hours (inclusive of hour 0)
///
/// Phase `φ = 2π·h/12.42`; water level `2·sin φ` m, speed `0.5 + 0.3·|cos φ|`
/// m/s, direction `180 + 45·sin φ` degrees.
pub fn synthetic_tidal_currents(hours: usize) -> Vec<CurrentSample> {
    (0..=hours)
        .map(|h| {
            let phase = h as f64 * 2.0 * PI / SEMI_DIURNAL_PERIOD_HOURS;
            CurrentSample {
                offset_seconds: h as f64 * 3600.0,
                current_speed: MetersPerSecond::new(0.5 + 0.3 * phase.cos().abs()),
                current_direction: Degrees::new(180.0 + 45.0 * phase.sin()).normalized(),
                water_level: Some(2.0 * phase.sin()),
            }
        })
        .collect()
}
