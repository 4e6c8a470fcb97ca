//! Initial concentration fields
//!
//! Two models produce the starting field of a run:
//!
//! - [`closed_form_plume`]: a single-shot Gaussian-plume evaluation at a fixed
//!   horizon, used on its own without any stepping.
//! - [`seed_gaussian_mass`]: the whole released mass deposited as a 2-D
//!   Gaussian blob on the source cell, to be evolved by the transport stepper.
//!
//! # Closed-form model
//!
//! ```text
//! C = C0 / (2π·u·σy·σz) · exp(-½(y'/σy)²) · exp(-½(h/σz)²)
//! σy = σy0·(d/1000)^0.9    σz = σz0·(d/1000)^0.8
//! ```
//!
//! where `d` is the distance from the source after removing the wind drift
//! `(u·cos θ·t, u·sin θ·t)` and `y'` is the drift-corrected north offset.

use crate::config::PlumeCoefficients;
use crate::core_types::{ChemicalProfile, EnvironmentalSample, EnvironmentalSeries};
use crate::grid::{sanitize, ConcentrationGrid};
use crate::physics::stability::SpreadCoefficients;
use rayon::prelude::*;
use std::f64::consts::PI;

/// Vapor pressure above which warmer water lowers the closed-form concentration (Pa)
const VOLATILE_VAPOR_PRESSURE: f64 = 1000.0;

/// Inputs of the closed-form plume evaluation
#[derive(Debug, Clone, Copy)]
pub struct ClosedFormParams<'a> {
    /// Released mass (kg)
    pub mass_kg: f64,
    /// Released chemical
    pub profile: &'a ChemicalProfile,
    /// Conditions at the release time
    pub conditions: &'a EnvironmentalSample,
    /// Spread coefficients of the stability class
    pub spread: SpreadCoefficients,
    /// Evaluation horizon (s)
    pub horizon_seconds: f64,
    /// Tide mixing multiplier, see [`tide_influence`]
    pub tide_influence: f64,
}

/// Tidal mixing multiplier from the water level of the earliest current sample
///
/// A series without currents has no tide data and gives 1.0; a current sample
/// without a level counts as level 0.
pub fn tide_influence(environment: &EnvironmentalSeries) -> f64 {
    if !environment.has_currents() {
        return 1.0;
    }
    let level = environment
        .first_water_level()
        .filter(|h| h.is_finite())
        .unwrap_or(0.0);
    (0.8 + (level / 10.0) * 0.4).clamp(0.5, 1.5)
}

/// Fill `grid` with the closed-form Gaussian-plume field
///
/// Every cell is written. With zero wind the plume equation is singular and the
/// whole field is zero.
pub fn closed_form_plume(
    grid: &mut ConcentrationGrid,
    params: &ClosedFormParams<'_>,
    coefficients: &PlumeCoefficients,
) {
    let size = grid.size();
    let wind = *params.conditions.wind_speed;
    if sanitize(wind) == 0.0 || sanitize(params.mass_kg) == 0.0 {
        grid.clear();
        return;
    }

    let c0 = params.mass_kg / coefficients.concentration_divisor;
    let t = params.horizon_seconds.max(0.0);
    let theta = params.conditions.wind_direction.to_radians();
    let drift_x = wind * theta.cos() * t;
    let drift_y = wind * theta.sin() * t;
    let factor = if coefficients.closed_form_factors {
        environmental_factor(params)
    } else {
        1.0
    };

    let mut next = vec![0.0; size * size];
    next.par_chunks_mut(size).enumerate().for_each(|(j, row)| {
        for (i, cell) in row.iter_mut().enumerate() {
            let offset = grid.cell_offset_meters(i, j);
            let effective_x = offset.x - drift_x;
            let effective_y = offset.y - drift_y;
            let distance = effective_x.hypot(effective_y).max(coefficients.min_distance);

            let sigma_y =
                (params.spread.sigma_y0 * (distance / 1000.0).powf(0.9)).max(coefficients.min_sigma_y);
            let sigma_z =
                (params.spread.sigma_z0 * (distance / 1000.0).powf(0.8)).max(coefficients.min_sigma_z);

            let lateral = (-0.5 * (effective_y / sigma_y).powi(2)).exp();
            let vertical = (-0.5 * (coefficients.release_height / sigma_z).powi(2)).exp();

            *cell = sanitize(c0 / (2.0 * PI * wind * sigma_y * sigma_z) * lateral * vertical * factor);
        }
    });

    grid.replace_cells(next);
}

/// Combined decay, diffusion, temperature, tide and wind-dilution multiplier
fn environmental_factor(params: &ClosedFormParams<'_>) -> f64 {
    let t = params.horizon_seconds.max(0.0);
    let profile = params.profile;

    let decay = (-profile.decay_rate * t).exp();
    let diffusion = 1.0 + profile.diffusion_coefficient * t / 10_000.0;

    let temperature = 1.0 + (*params.conditions.temperature - 20.0) * 0.02;
    let temperature = if profile.vapor_pressure > VOLATILE_VAPOR_PRESSURE {
        1.0 / temperature
    } else {
        temperature
    };

    let dilution = (*params.conditions.wind_speed / 10.0).max(0.1);

    sanitize(decay * diffusion * temperature * params.tide_influence * dilution)
}

/// Deposit `mass_kg` as a Gaussian blob centered on the source cell
///
/// The blob has spread `seed_sigma_cells × cell_size` and is normalized so that
/// `Σ cell · cellArea` equals the mass exactly.
pub fn seed_gaussian_mass(
    grid: &mut ConcentrationGrid,
    mass_kg: f64,
    coefficients: &PlumeCoefficients,
) {
    grid.clear();
    let mass_kg = sanitize(mass_kg);
    if mass_kg == 0.0 {
        return;
    }

    let size = grid.size();
    let sigma = coefficients.seed_sigma_cells * grid.cell_size();
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut weights = vec![0.0; size * size];
    weights.par_chunks_mut(size).enumerate().for_each(|(j, row)| {
        for (i, w) in row.iter_mut().enumerate() {
            let r = grid.cell_offset_meters(i, j);
            *w = (-r.norm_squared() / two_sigma_sq).exp();
        }
    });

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return;
    }

    let scale = mass_kg / (total * grid.cell_area());
    for w in &mut weights {
        *w *= scale;
    }
    grid.replace_cells(weights);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Celsius, CurrentSample, Degrees, MetersPerSecond};
    use crate::physics::stability::StabilityClass;
    use approx::assert_relative_eq;

    fn conditions(wind: f64, direction: f64) -> EnvironmentalSample {
        EnvironmentalSample {
            wind_speed: MetersPerSecond::new(wind),
            wind_direction: Degrees::new(direction),
            ..EnvironmentalSample::calm(Celsius::new(20.0))
        }
    }

    #[test]
    fn test_seed_conserves_mass() {
        let mut grid = ConcentrationGrid::new(0.0, 0.0, 51, 100.0);
        seed_gaussian_mass(&mut grid, 8700.0, &PlumeCoefficients::default());
        assert_relative_eq!(grid.total_mass(), 8700.0, max_relative = 1e-12);

        let (ci, cj) = grid.source_cell();
        let peak = grid.get(ci, cj);
        assert_eq!(peak, grid.max_concentration());
        assert_relative_eq!(grid.get(ci + 1, cj), grid.get(ci - 1, cj));
        assert_relative_eq!(grid.get(ci, cj + 1), grid.get(ci, cj - 1));
    }

    #[test]
    fn test_seed_zero_or_invalid_mass() {
        let mut grid = ConcentrationGrid::new(0.0, 0.0, 11, 10.0);
        seed_gaussian_mass(&mut grid, 0.0, &PlumeCoefficients::default());
        assert_eq!(grid.total_mass(), 0.0);
        seed_gaussian_mass(&mut grid, f64::NAN, &PlumeCoefficients::default());
        assert_eq!(grid.total_mass(), 0.0);
        seed_gaussian_mass(&mut grid, -5.0, &PlumeCoefficients::default());
        assert_eq!(grid.total_mass(), 0.0);
    }

    #[test]
    fn test_closed_form_zero_wind_is_empty() {
        let profile = ChemicalProfile::crude_oil();
        let calm = conditions(0.0, 270.0);
        let mut grid = ConcentrationGrid::new(0.0, 0.0, 21, 100.0);
        grid.set(3, 3, 1.0);
        let params = ClosedFormParams {
            mass_kg: 8700.0,
            profile: &profile,
            conditions: &calm,
            spread: StabilityClass::E.coefficients(),
            horizon_seconds: 3600.0,
            tide_influence: 1.0,
        };
        closed_form_plume(&mut grid, &params, &PlumeCoefficients::default());
        assert_eq!(grid.max_concentration(), 0.0);
    }

    #[test]
    fn test_closed_form_peak_follows_drift() {
        let profile = ChemicalProfile::crude_oil();
        // θ = 90° drifts along +y under the literal cos/sin convention
        let wind = conditions(0.1, 90.0);
        let mut grid = ConcentrationGrid::new(0.0, 0.0, 41, 10.0);
        let params = ClosedFormParams {
            mass_kg: 1000.0,
            profile: &profile,
            conditions: &wind,
            spread: StabilityClass::E.coefficients(),
            horizon_seconds: 1000.0,
            tide_influence: 1.0,
        };
        closed_form_plume(&mut grid, &params, &PlumeCoefficients::default());

        // Drift = 0.1 m/s × 1000 s = 100 m = 10 cells north
        let (ci, cj) = grid.source_cell();
        let peak = grid.get(ci, cj + 10);
        assert!(peak > 0.0);
        assert_eq!(peak, grid.max_concentration());
        assert!(peak > grid.get(ci, cj) * 1e6);
    }

    #[test]
    fn test_closed_form_factors_scale_field() {
        let profile = ChemicalProfile::crude_oil();
        let wind = conditions(5.0, 0.0);
        let params = ClosedFormParams {
            mass_kg: 8700.0,
            profile: &profile,
            conditions: &wind,
            spread: StabilityClass::D.coefficients(),
            horizon_seconds: 3600.0,
            tide_influence: 0.8,
        };

        let mut plain = ConcentrationGrid::new(0.0, 0.0, 31, 100.0);
        closed_form_plume(&mut plain, &params, &PlumeCoefficients::default());

        let with_factors = PlumeCoefficients {
            closed_form_factors: true,
            ..PlumeCoefficients::default()
        };
        let mut scaled = ConcentrationGrid::new(0.0, 0.0, 31, 100.0);
        closed_form_plume(&mut scaled, &params, &with_factors);

        // 20 °C → temperature factor 1; dilution 0.5; tide 0.8
        let expected = (-1e-7_f64 * 3600.0).exp() * (1.0 + 1e-7 * 3600.0 / 10_000.0) * 0.8 * 0.5;
        assert!(plain.max_concentration() > 0.0);
        assert_relative_eq!(
            scaled.max_concentration(),
            plain.max_concentration() * expected,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_tide_influence() {
        let with_level = |level: Option<f64>| {
            EnvironmentalSeries::new(
                Vec::new(),
                vec![CurrentSample {
                    offset_seconds: 0.0,
                    current_speed: MetersPerSecond::new(0.2),
                    current_direction: Degrees::new(90.0),
                    water_level: level,
                }],
            )
        };
        assert_eq!(tide_influence(&EnvironmentalSeries::empty()), 1.0);
        assert_relative_eq!(tide_influence(&with_level(None)), 0.8);
        assert_relative_eq!(tide_influence(&with_level(Some(2.0))), 0.88);
        assert_eq!(tide_influence(&with_level(Some(100.0))), 1.5);
        assert_eq!(tide_influence(&with_level(Some(-100.0))), 0.5);
    }
}
