use serde::{Deserialize, Serialize};

/// Physicochemical properties of a released chemical
///
/// Read-only during a run. Profiles are always fully populated: a lookup that
/// cannot produce one falls back to a named profile instead of zero-filling
/// fields, because a zero density or decay rate silently changes the physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemicalProfile {
    /// Display name (also the catalog key, case-insensitive)
    pub name: String,
    /// Liquid density (kg/m³)
    pub density: f64,
    /// Dynamic viscosity (Pa·s)
    pub viscosity: f64,
    /// Water solubility (kg/m³)
    pub solubility: f64,
    /// Vapor pressure at ambient temperature (Pa)
    pub vapor_pressure: f64,
    /// Molecular diffusion coefficient (m²/s), drives the evaporation mass-transfer coefficient
    pub diffusion_coefficient: f64,
    /// First-order decay/degradation rate (1/s); 0 means no decay
    pub decay_rate: f64,
}

impl ChemicalProfile {
    /// Crude-oil-like profile used when a chemical cannot be resolved
    ///
    /// Dense, effectively non-volatile and slowly degrading.
    pub fn crude_oil() -> Self {
        ChemicalProfile {
            name: "Crude Oil".to_string(),
            density: 870.0,
            viscosity: 0.01,
            solubility: 0.005,
            vapor_pressure: 1.0, // Below the volatility cut-off
            diffusion_coefficient: 1.0e-7,
            decay_rate: 1.0e-7,
        }
    }

    /// Diesel fuel: light distillate, low volatility
    pub fn diesel() -> Self {
        ChemicalProfile {
            name: "Diesel".to_string(),
            density: 840.0,
            viscosity: 0.0025,
            solubility: 0.005,
            vapor_pressure: 40.0,
            diffusion_coefficient: 5.0e-6,
            decay_rate: 5.0e-7,
        }
    }

    /// Benzene: volatile aromatic, sparingly soluble
    pub fn benzene() -> Self {
        ChemicalProfile {
            name: "Benzene".to_string(),
            density: 876.0,
            viscosity: 0.000604,
            solubility: 1.79,
            vapor_pressure: 12_700.0,
            diffusion_coefficient: 8.8e-6,
            decay_rate: 1.0e-6,
        }
    }

    /// Toluene: volatile aromatic
    pub fn toluene() -> Self {
        ChemicalProfile {
            name: "Toluene".to_string(),
            density: 867.0,
            viscosity: 0.00059,
            solubility: 0.526,
            vapor_pressure: 3_800.0,
            diffusion_coefficient: 8.5e-6,
            decay_rate: 1.0e-6,
        }
    }

    /// Methanol: fully miscible, volatile
    pub fn methanol() -> Self {
        ChemicalProfile {
            name: "Methanol".to_string(),
            density: 792.0,
            viscosity: 0.000544,
            solubility: 792.0, // Miscible: bounded by its own density
            vapor_pressure: 13_000.0,
            diffusion_coefficient: 1.5e-5,
            decay_rate: 2.0e-6,
        }
    }

    /// Mass released by a spill of `volume_liters` (kg)
    ///
    /// Non-positive or non-finite volumes release nothing.
    pub fn released_mass_kg(&self, volume_liters: f64) -> f64 {
        if !volume_liters.is_finite() || volume_liters <= 0.0 {
            return 0.0;
        }
        volume_liters / 1000.0 * self.density
    }

    /// Whether evaporation applies at the given volatility cut-off (Pa)
    pub fn is_volatile(&self, threshold_pa: f64) -> bool {
        self.vapor_pressure >= threshold_pa
    }

    /// Check that every property is finite and in its physical range
    ///
    /// Profiles failing this check are treated as unresolved by the engine.
    pub fn is_physical(&self) -> bool {
        let finite = [
            self.density,
            self.viscosity,
            self.solubility,
            self.vapor_pressure,
            self.diffusion_coefficient,
            self.decay_rate,
        ]
        .iter()
        .all(|v| v.is_finite());

        finite
            && self.density > 0.0
            && self.viscosity >= 0.0
            && self.solubility >= 0.0
            && self.vapor_pressure >= 0.0
            && self.diffusion_coefficient >= 0.0
            && self.decay_rate >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_crude_oil_is_non_volatile() {
        let crude = ChemicalProfile::crude_oil();
        assert!(!crude.is_volatile(1000.0));
        assert!(crude.is_physical());
        assert_relative_eq!(crude.density, 870.0);
    }

    #[test]
    fn test_volatile_presets() {
        for profile in [
            ChemicalProfile::benzene(),
            ChemicalProfile::toluene(),
            ChemicalProfile::methanol(),
        ] {
            assert!(profile.is_volatile(1000.0), "{} should be volatile", profile.name);
            assert!(profile.is_physical());
        }
    }

    #[test]
    fn test_released_mass() {
        let crude = ChemicalProfile::crude_oil();
        // 10 000 L = 10 m³ → 8700 kg
        assert_relative_eq!(crude.released_mass_kg(10_000.0), 8700.0);
        assert_eq!(crude.released_mass_kg(0.0), 0.0);
        assert_eq!(crude.released_mass_kg(-5.0), 0.0);
        assert_eq!(crude.released_mass_kg(f64::NAN), 0.0);
    }

    #[test]
    fn test_non_physical_profiles() {
        let mut bad = ChemicalProfile::diesel();
        bad.density = 0.0;
        assert!(!bad.is_physical());

        let mut bad = ChemicalProfile::diesel();
        bad.decay_rate = f64::NAN;
        assert!(!bad.is_physical());

        // Zero decay is a valid "no decay" profile
        let mut ok = ChemicalProfile::diesel();
        ok.decay_rate = 0.0;
        assert!(ok.is_physical());
    }
}
