//! Stability guard for the explicit integrators.
//!
//! Both FTCS and RK2 integrate the centred second-difference operator, whose
//! eigenvalues lie in `[-4 alpha / dx^2, 0]`. With `z = dt * lambda`:
//!
//! ```text
//! FTCS  G(z) = 1 + z                |G| <= 1  <=>  z in [-2, 0]
//! RK2   G(z) = 1 + z + z^2 / 2      |G| <= 1  <=>  z in [-2, 0]
//! ```
//!
//! so both schemes share the bound `r = alpha dt / dx^2 <= 0.5`, and for RK2 it is
//! tight on the negative real axis. Backward Euler has `G(z) = 1 / (1 - z)` and is
//! stable for every `r >= 0`.

use serde::{Deserialize, Serialize};

use crate::error::{HeatError, HeatResult};
use crate::grid::GridSpec;
use crate::stepper::Scheme;

/// Diffusion-number limit shared by the explicit schemes.
pub const EXPLICIT_LIMIT: f64 = 0.5;

/// Relative slack on the limit so that a stabilized grid with `r == 0.5` passes.
const LIMIT_RTOL: f64 = 1e-12;

/// Outcome of a stability check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub r: f64,
    /// `None` for unconditionally stable schemes.
    pub limit: Option<f64>,
    pub stable: bool,
}

/// Largest stable diffusion number of `scheme`, if it has one.
pub fn limit(scheme: Scheme) -> Option<f64> {
    match scheme {
        Scheme::Explicit | Scheme::Rk2 => Some(EXPLICIT_LIMIT),
        Scheme::Implicit => None,
    }
}

/// Compute `r` for `grid` and compare it against the limit of `scheme`.
pub fn validate(grid: &GridSpec, scheme: Scheme) -> StabilityReport {
    let r = grid.diffusion_number();
    let limit = limit(scheme);
    StabilityReport {
        r,
        limit,
        stable: limit.map_or(true, |l| r <= l * (1.0 + LIMIT_RTOL)),
    }
}

/// Like [`validate`], but an unstable grid is an error.
pub fn require_stable(grid: &GridSpec, scheme: Scheme) -> HeatResult<StabilityReport> {
    let report = validate(grid, scheme);
    match report.limit {
        Some(limit) if !report.stable => Err(HeatError::Stability {
            scheme,
            r: report.r,
            limit,
        }),
        _ => Ok(report),
    }
}

/// Per-step amplification of the Fourier mode with phase `theta` (radians per cell).
///
/// The centred operator maps the mode to `z = -4 r sin^2(theta / 2)`.
pub fn amplification_factor(scheme: Scheme, r: f64, theta: f64) -> f64 {
    let s = (0.5 * theta).sin();
    let z = -4.0 * r * s * s;
    match scheme {
        Scheme::Explicit => 1.0 + z,
        Scheme::Rk2 => 1.0 + z + 0.5 * z * z,
        Scheme::Implicit => 1.0 / (1.0 - z),
    }
}
