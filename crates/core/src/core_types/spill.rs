use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Identifier of a spill incident
///
/// Opaque to the engine; used as the key of the re-run cooldown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpillId(String);

impl SpillId {
    /// Create an identifier from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        SpillId(id.into())
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SpillId {
    fn from(id: &str) -> Self {
        SpillId::new(id)
    }
}

impl From<String> for SpillId {
    fn from(id: String) -> Self {
        SpillId(id)
    }
}

impl fmt::Display for SpillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only snapshot of a spill incident handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpillSnapshot {
    /// Incident identifier
    pub id: SpillId,
    /// Release latitude (degrees, WGS84)
    pub latitude: f64,
    /// Release longitude (degrees, WGS84)
    pub longitude: f64,
    /// Released volume (liters)
    pub volume_liters: f64,
    /// Water depth at the release point (m)
    pub water_depth_meters: f64,
    /// Key for the chemical profile lookup
    pub chemical_type_id: String,
    /// Time of release
    pub spill_time: SystemTime,
}

impl SpillSnapshot {
    /// Snapshot released at the current wall-clock time
    pub fn new(
        id: impl Into<SpillId>,
        latitude: f64,
        longitude: f64,
        volume_liters: f64,
        water_depth_meters: f64,
        chemical_type_id: impl Into<String>,
    ) -> Self {
        SpillSnapshot {
            id: id.into(),
            latitude,
            longitude,
            volume_liters,
            water_depth_meters,
            chemical_type_id: chemical_type_id.into(),
            spill_time: SystemTime::now(),
        }
    }

    /// Whether the release geometry can produce a non-empty plume
    ///
    /// A degenerate snapshot is still simulated; it just yields an empty grid.
    pub fn is_degenerate(&self) -> bool {
        !(self.volume_liters.is_finite()
            && self.volume_liters > 0.0
            && self.latitude.is_finite()
            && self.longitude.is_finite())
    }
}
