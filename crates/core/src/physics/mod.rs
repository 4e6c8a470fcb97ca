//! Dispersion physics: stability classification, initial plume, transport

pub mod plume;
pub mod stability;
pub mod transport;

pub use plume::{closed_form_plume, seed_gaussian_mass, tide_influence, ClosedFormParams};
pub use stability::{classify, SpreadCoefficients, StabilityClass};
pub use transport::{
    evaporation_rate, stable_diffusion_dt, turbulent_diffusivity, StepReport, TransportStepper,
    GAS_CONSTANT,
};
