//! Transport stepper: advection, diffusion, decay and evaporation
//!
//! Advances a [`ConcentrationGrid`] by one time step using operator splitting.
//! Each stage reads the field left by the previous one, in this fixed order:
//!
//! ```text
//! ∂C/∂t = -u·∇C          (upwind advection, sub-cycled at the Courant bound)
//!       + D∇²C           (explicit 5-point Laplacian, dt capped at the CFL bound)
//!       - λC             (first-order decay)
//!       - k_evap·C       (evaporation, volatile chemicals only)
//! ```
//!
//! Advection and diffusion only update interior cells; the one-cell border is
//! frozen. Every written value goes through [`sanitize`].
//!
//! With a Courant number at or below the limit, advection is the single
//! explicit update `new = old − dt·(u·∂C/∂x + v·∂C/∂y)`. Above it the step is
//! split into equal sub-steps, at most `max_advection_substeps` of them; past
//! that cap each sub-step runs at the limit and the remaining drift is
//! dropped. A grid whose cell size is not finite and positive is left to decay
//! and evaporation only.

use crate::config::TransportCoefficients;
use crate::core_types::{ChemicalProfile, EnvironmentalSample, Vec2};
use crate::grid::{sanitize, ConcentrationGrid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Universal gas constant (J/(mol·K))
pub const GAS_CONSTANT: f64 = 8.314;

/// Reference molecular diffusivity of the evaporation correlation (m²/s)
const REFERENCE_DIFFUSIVITY: f64 = 1e-5;

/// What one call to [`TransportStepper::step`] actually did
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Requested step length (s)
    pub dt: f64,
    /// Combined transport velocity (m/s), x east and y north
    pub velocity: Vec2,
    /// Courant number `|u|·dt/dx + |v|·dt/dy` of the requested step
    pub courant_number: f64,
    /// Number of equal advection sub-steps taken (0 when the flow is still)
    pub advection_substeps: usize,
    /// Time actually advected (s); below `dt` only when the sub-step cap is hit
    pub advected_seconds: f64,
    /// Turbulent diffusivity (m²/s)
    pub diffusivity: f64,
    /// Step length used by the diffusion stage (s), never above the CFL bound
    pub diffusion_dt: f64,
    /// Multiplier applied by the decay stage
    pub decay_factor: f64,
    /// Multiplier applied by the evaporation stage, `None` when skipped
    pub evaporation_factor: Option<f64>,
}

/// Turbulent horizontal diffusivity from wind stress and current shear (m²/s)
///
/// `D = max(D_min, scale·sqrt(c_d·w² + (current/divisor)²))`
pub fn turbulent_diffusivity(
    conditions: &EnvironmentalSample,
    coefficients: &TransportCoefficients,
) -> f64 {
    let wind = *conditions.wind_speed;
    let wind_stress = coefficients.wind_stress_coefficient * wind * wind;
    let shear = *conditions.current_speed / coefficients.shear_divisor;
    let d = coefficients.diffusivity_scale * (wind_stress + shear * shear).sqrt();
    if d.is_finite() {
        d.max(coefficients.min_diffusivity)
    } else {
        coefficients.min_diffusivity
    }
}

/// Largest diffusion step satisfying `D·dt/dx² ≤ limit`, capped at `dt`
pub fn stable_diffusion_dt(diffusivity: f64, dt: f64, cell_size: f64, limit: f64) -> f64 {
    if diffusivity <= 0.0 || !diffusivity.is_finite() {
        return dt;
    }
    dt.min(limit * cell_size * cell_size / diffusivity)
}

/// Surface evaporation rate (1/s before scaling), `None` for non-volatile chemicals
///
/// `k = 0.2·w^0.78·(Dm/1e-5)^0.67` with the wind floored, then
/// `r = k·Pv / (R·T)`.
pub fn evaporation_rate(
    profile: &ChemicalProfile,
    conditions: &EnvironmentalSample,
    coefficients: &TransportCoefficients,
) -> Option<f64> {
    if !profile.is_volatile(coefficients.volatility_threshold) {
        return None;
    }

    let wind = (*conditions.wind_speed).max(coefficients.evaporation_wind_floor);
    let k = 0.2 * wind.powf(0.78) * (profile.diffusion_coefficient / REFERENCE_DIFFUSIVITY).powf(0.67);
    let kelvin = *conditions.temperature.to_kelvin();
    let rate = k * profile.vapor_pressure / (GAS_CONSTANT * kelvin);

    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Advances concentration grids one step at a time
///
/// Holds the transport coefficients and a scratch buffer reused across steps.
#[derive(Debug, Clone)]
pub struct TransportStepper {
    coefficients: TransportCoefficients,
    scratch: Vec<f64>,
}

impl TransportStepper {
    /// Create a stepper with the given coefficients
    pub fn new(coefficients: TransportCoefficients) -> Self {
        Self {
            coefficients,
            scratch: Vec::new(),
        }
    }

    /// Coefficients in use
    pub fn coefficients(&self) -> &TransportCoefficients {
        &self.coefficients
    }

    /// Apply one step of length `dt` seconds under `conditions`
    pub fn step(
        &mut self,
        grid: &mut ConcentrationGrid,
        profile: &ChemicalProfile,
        conditions: &EnvironmentalSample,
        dt: f64,
    ) -> StepReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let c = self.coefficients;

        let dx = grid.cell_size();
        let transportable = dx.is_finite() && dx > 0.0;
        if !transportable {
            debug!("Cell size {} is degenerate, skipping advection and diffusion", dx);
        }

        // 1. Advection
        let velocity = conditions.transport_velocity(c.wind_drift_factor);
        let velocity = if velocity.x.is_finite() && velocity.y.is_finite() {
            velocity
        } else {
            Vec2::zeros()
        };
        let speed_sum = velocity.x.abs() + velocity.y.abs();
        let courant_number = if transportable { speed_sum * dt / dx } else { 0.0 };
        let (advection_substeps, sub_dt) = if courant_number > 0.0 {
            let needed = (courant_number / c.advection_courant_limit).ceil().max(1.0);
            let cap = c.max_advection_substeps.max(1);
            if needed > cap as f64 {
                debug!(
                    "Courant number {:.3} needs {} advection sub-steps, capped at {}",
                    courant_number, needed, cap
                );
                (cap, c.advection_courant_limit * dx / speed_sum)
            } else {
                let n = needed as usize;
                (n, dt / n as f64)
            }
        } else {
            (0, 0.0)
        };
        if advection_substeps > 1 {
            debug!(
                "Courant number {:.3} exceeds {:.2}, sub-cycling advection into {} steps",
                courant_number, c.advection_courant_limit, advection_substeps
            );
        }
        for _ in 0..advection_substeps {
            self.advect(grid, velocity, sub_dt);
        }
        let advected_seconds = sub_dt * advection_substeps as f64;

        // 2. Diffusion
        let diffusivity = turbulent_diffusivity(conditions, &c);
        let diffusion_dt = if transportable {
            stable_diffusion_dt(diffusivity, dt, dx, c.diffusion_cfl_limit)
        } else {
            0.0
        };
        if transportable && diffusion_dt < dt {
            debug!(
                "Diffusion step reduced from {:.1}s to {:.1}s (D = {:.3} m²/s)",
                dt, diffusion_dt, diffusivity
            );
        }
        self.diffuse(grid, diffusivity, diffusion_dt);

        // 3. Decay
        let decay_factor = (-profile.decay_rate.max(0.0) * dt).exp();
        grid.scale(decay_factor);

        // 4. Evaporation
        let evaporation_factor = evaporation_rate(profile, conditions, &c)
            .map(|rate| (-rate * dt / c.evaporation_scaling).exp());
        if let Some(factor) = evaporation_factor {
            grid.scale(factor);
        }

        StepReport {
            dt,
            velocity,
            courant_number,
            advection_substeps,
            advected_seconds,
            diffusivity,
            diffusion_dt,
            decay_factor,
            evaporation_factor,
        }
    }

    /// One first-order upwind advection pass over interior cells
    fn advect(&mut self, grid: &mut ConcentrationGrid, velocity: Vec2, dt: f64) {
        let size = grid.size();
        let dx = grid.cell_size();
        let (u, v) = (velocity.x, velocity.y);

        let mut next = std::mem::take(&mut self.scratch);
        next.resize(size * size, 0.0);
        let src = grid.as_slice();

        next.par_chunks_mut(size).enumerate().for_each(|(j, row)| {
            for (i, out) in row.iter_mut().enumerate() {
                let idx = j * size + i;
                let c = src[idx];
                if i == 0 || j == 0 || i == size - 1 || j == size - 1 {
                    *out = c;
                    continue;
                }

                // Backward difference when the flow is positive, forward otherwise
                let dc_dx = if u > 0.0 {
                    (c - src[idx - 1]) / dx
                } else {
                    (src[idx + 1] - c) / dx
                };
                let dc_dy = if v > 0.0 {
                    (c - src[idx - size]) / dx
                } else {
                    (src[idx + size] - c) / dx
                };

                *out = sanitize(c - dt * (dc_dx * u + dc_dy * v));
            }
        });

        self.scratch = grid.replace_cells(next);
    }

    /// One explicit diffusion pass over interior cells
    fn diffuse(&mut self, grid: &mut ConcentrationGrid, diffusivity: f64, dt: f64) {
        if dt <= 0.0 || diffusivity <= 0.0 {
            return;
        }
        let size = grid.size();
        let dx = grid.cell_size();
        let alpha = dt * diffusivity / (dx * dx);

        let mut next = std::mem::take(&mut self.scratch);
        next.resize(size * size, 0.0);
        let src = grid.as_slice();

        next.par_chunks_mut(size).enumerate().for_each(|(j, row)| {
            for (i, out) in row.iter_mut().enumerate() {
                let idx = j * size + i;
                let c = src[idx];
                if i == 0 || j == 0 || i == size - 1 || j == size - 1 {
                    *out = c;
                    continue;
                }

                let neighbors = src[idx - 1] + src[idx + 1] + src[idx - size] + src[idx + size];
                *out = sanitize(c + alpha * (neighbors - 4.0 * c));
            }
        });

        self.scratch = grid.replace_cells(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Celsius, Degrees, MetersPerSecond};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn still_water() -> EnvironmentalSample {
        EnvironmentalSample::calm(Celsius::new(15.0))
    }

    fn spot_grid(size: usize, cell: f64) -> ConcentrationGrid {
        let mut grid = ConcentrationGrid::new(0.0, 0.0, size, cell);
        let (ci, cj) = grid.source_cell();
        grid.set(ci, cj, 100.0);
        grid
    }

    fn inert() -> ChemicalProfile {
        ChemicalProfile {
            decay_rate: 0.0,
            ..ChemicalProfile::crude_oil()
        }
    }

    #[test]
    fn test_diffusivity_closure() {
        let conditions = EnvironmentalSample {
            wind_speed: MetersPerSecond::new(5.0),
            current_speed: MetersPerSecond::new(0.3),
            ..still_water()
        };
        let d = turbulent_diffusivity(&conditions, &TransportCoefficients::default());
        let expected = 100.0 * (0.0013 * 25.0 + 0.03 * 0.03_f64).sqrt();
        assert_relative_eq!(d, expected, epsilon = 1e-12);

        let floor = turbulent_diffusivity(&still_water(), &TransportCoefficients::default());
        assert_eq!(floor, 1.0);
    }

    #[test]
    fn test_stable_diffusion_dt() {
        // D·dt/dx² = 20·300/10000 = 0.6 > 0.25
        let dt = stable_diffusion_dt(20.0, 300.0, 100.0, 0.25);
        assert_relative_eq!(dt, 125.0);
        assert!(20.0 * dt / 10_000.0 <= 0.25 + 1e-12);

        // Already stable: unchanged
        assert_eq!(stable_diffusion_dt(1.0, 300.0, 100.0, 0.25), 300.0);
    }

    #[test]
    fn test_step_reports_reduced_diffusion_dt() {
        let conditions = EnvironmentalSample {
            wind_speed: MetersPerSecond::new(20.0),
            ..still_water()
        };
        let mut stepper = TransportStepper::new(TransportCoefficients::default());
        let mut grid = spot_grid(21, 50.0);
        let report = stepper.step(&mut grid, &inert(), &conditions, 300.0);
        assert!(report.diffusion_dt < report.dt);
        assert!(report.diffusivity * report.diffusion_dt / 2500.0 <= 0.25 + 1e-12);
    }

    #[test]
    fn test_still_water_diffuses_symmetrically() {
        let mut stepper = TransportStepper::new(TransportCoefficients::default());
        let mut grid = spot_grid(11, 10.0);
        let report = stepper.step(&mut grid, &inert(), &still_water(), 10.0);
        assert_eq!(report.advection_substeps, 0);

        let (ci, cj) = grid.source_cell();
        let center = grid.get(ci, cj);
        assert!(center < 100.0);
        let east = grid.get(ci + 1, cj);
        assert!(east > 0.0);
        assert_eq!(east, grid.get(ci - 1, cj));
        assert_eq!(east, grid.get(ci, cj + 1));
        assert_eq!(east, grid.get(ci, cj - 1));
        // Interior diffusion conserves mass
        assert_relative_eq!(grid.total_mass(), 100.0 * 100.0, max_relative = 1e-12);
    }

    #[test]
    fn test_advection_moves_mass_downstream() {
        // Current toward the east
        let conditions = EnvironmentalSample {
            current_speed: MetersPerSecond::new(1.0),
            current_direction: Degrees::new(90.0),
            ..still_water()
        };
        let mut stepper = TransportStepper::new(TransportCoefficients::default());
        let mut grid = spot_grid(21, 100.0);
        stepper.step(&mut grid, &inert(), &conditions, 50.0);

        let (ci, cj) = grid.source_cell();
        assert!(grid.get(ci + 1, cj) > grid.get(ci - 1, cj));
    }

    #[test]
    fn test_advection_sub_cycles_above_courant_limit() {
        let conditions = EnvironmentalSample {
            current_speed: MetersPerSecond::new(1.0),
            current_direction: Degrees::new(45.0),
            ..still_water()
        };
        let mut stepper = TransportStepper::new(TransportCoefficients::default());
        let mut grid = spot_grid(41, 100.0);
        let report = stepper.step(&mut grid, &inert(), &conditions, 300.0);

        // (|u| + |v|)·dt/dx = 2·0.7071·3 ≈ 4.24
        assert_relative_eq!(report.courant_number, 2.0_f64.sqrt() * 3.0, epsilon = 1e-9);
        assert_eq!(report.advection_substeps, 5);
        assert!(grid.as_slice().iter().all(|&c| c >= 0.0));
        // Upwind with a bounded Courant number stays monotone
        assert!(grid.max_concentration() <= 100.0);
    }

    #[test]
    fn test_decay_factor() {
        let profile = ChemicalProfile {
            decay_rate: 1e-3,
            ..ChemicalProfile::crude_oil()
        };
        let mut stepper = TransportStepper::new(TransportCoefficients::default());
        let mut grid = spot_grid(11, 100.0);
        let before = grid.total_mass();
        let report = stepper.step(&mut grid, &profile, &still_water(), 100.0);
        assert_relative_eq!(report.decay_factor, (-0.1_f64).exp());
        assert_relative_eq!(grid.total_mass(), before * (-0.1_f64).exp(), max_relative = 1e-12);
    }

    #[test]
    fn test_evaporation_only_for_volatile() {
        let coefficients = TransportCoefficients::default();
        let conditions = still_water();
        assert!(evaporation_rate(&ChemicalProfile::crude_oil(), &conditions, &coefficients).is_none());

        let benzene = ChemicalProfile::benzene();
        let rate = evaporation_rate(&benzene, &conditions, &coefficients);
        let k = 0.2 * (benzene.diffusion_coefficient / 1e-5).powf(0.67);
        let expected = k * benzene.vapor_pressure / (GAS_CONSTANT * 288.15);
        assert_relative_eq!(rate.unwrap_or_default(), expected, max_relative = 1e-12);

        let mut stepper = TransportStepper::new(coefficients);
        let mut grid = spot_grid(11, 100.0);
        let report = stepper.step(&mut grid, &benzene, &conditions, 300.0);
        let factor = report.evaporation_factor.unwrap_or(1.0);
        assert!(factor < 1.0 && factor > 0.0);
    }

    #[test]
    fn test_border_is_frozen() {
        let mut grid = ConcentrationGrid::new(0.0, 0.0, 5, 10.0);
        for i in 0..5 {
            grid.set(i, 0, 3.0);
        }
        let conditions = EnvironmentalSample {
            current_speed: MetersPerSecond::new(0.5),
            current_direction: Degrees::new(0.0),
            ..still_water()
        };
        let mut stepper = TransportStepper::new(TransportCoefficients::default());
        stepper.step(&mut grid, &inert(), &conditions, 5.0);
        for i in 0..5 {
            assert_eq!(grid.get(i, 0), 3.0);
        }
        // Northward flow pulls mass from the southern border into row 1
        assert!(grid.get(2, 1) > 0.0);
    }

    #[test]
    fn test_non_finite_dt_is_a_no_op_step() {
        let mut stepper = TransportStepper::new(TransportCoefficients::default());
        let mut grid = spot_grid(7, 10.0);
        let report = stepper.step(&mut grid, &inert(), &still_water(), f64::NAN);
        assert_eq!(report.dt, 0.0);
        assert_abs_diff_eq!(grid.total_mass(), 100.0 * 100.0);
    }

    #[test]
    fn test_single_pass_below_courant_limit() {
        // Current toward the east at Courant 0.5: one explicit upwind update
        let conditions = EnvironmentalSample {
            current_speed: MetersPerSecond::new(1.0),
            current_direction: Degrees::new(90.0),
            ..still_water()
        };
        let coefficients = TransportCoefficients {
            min_diffusivity: 0.0,
            diffusivity_scale: 0.0,
            ..TransportCoefficients::default()
        };
        let mut stepper = TransportStepper::new(coefficients);
        let mut grid = spot_grid(11, 100.0);
        let report = stepper.step(&mut grid, &inert(), &conditions, 50.0);

        assert_eq!(report.advection_substeps, 1);
        assert_relative_eq!(report.advected_seconds, 50.0);
        let u = report.velocity.x;
        let (ci, cj) = grid.source_cell();
        // new = old − dt·u·(C[i] − C[i−1])/dx
        assert_relative_eq!(grid.get(ci, cj), 100.0 - 50.0 * u * 100.0 / 100.0, epsilon = 1e-9);
        assert_relative_eq!(grid.get(ci + 1, cj), 50.0 * u * 100.0 / 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sub_step_count_is_capped() {
        let conditions = EnvironmentalSample {
            current_speed: MetersPerSecond::new(1.0),
            current_direction: Degrees::new(90.0),
            ..still_water()
        };
        let coefficients = TransportCoefficients {
            max_advection_substeps: 8,
            ..TransportCoefficients::default()
        };
        let mut stepper = TransportStepper::new(coefficients);
        let mut grid = spot_grid(5, 10.0);
        let report = stepper.step(&mut grid, &inert(), &conditions, 1e9);

        assert!(report.courant_number > 1e7);
        assert_eq!(report.advection_substeps, 8);
        // Each capped sub-step runs at the Courant limit
        let u = report.velocity.x.abs() + report.velocity.y.abs();
        assert_relative_eq!(report.advected_seconds, 8.0 * 10.0 / u, max_relative = 1e-9);
        assert!(grid.as_slice().iter().all(|c| c.is_finite() && *c >= 0.0));
    }

    #[test]
    fn test_degenerate_cell_size_skips_transport() {
        let conditions = EnvironmentalSample {
            current_speed: MetersPerSecond::new(1.0),
            ..still_water()
        };
        let mut stepper = TransportStepper::new(TransportCoefficients::default());
        for cell in [0.0, -5.0, f64::NAN] {
            let mut grid = ConcentrationGrid::new(0.0, 0.0, 7, cell);
            grid.set(3, 3, 4.0);
            let report = stepper.step(&mut grid, &inert(), &conditions, 300.0);
            assert_eq!(report.advection_substeps, 0);
            assert_eq!(report.courant_number, 0.0);
            assert_eq!(report.diffusion_dt, 0.0);
            assert_eq!(grid.get(3, 3), 4.0);
        }
    }
}
