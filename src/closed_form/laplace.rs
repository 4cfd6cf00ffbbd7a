//! Laplace transform in time with a single spatial mode.
//!
//! Transforming `v_t = alpha v_xx` for the transient `v = u - w` gives
//! `s V(x, s) - v0(x) = alpha V_xx`. Assuming `v0` is the mode `sin(k pi x / L)`,
//! `V_xx = -(k pi / L)^2 V`, so `V = v0 / (s + lambda)` with
//! `lambda = alpha (k pi / L)^2`, which inverts to `v = v0 exp(-lambda t)`.
//!
//! The result is exact only when `u0 - w` is a multiple of that one mode. Any
//! other profile is forced to decay at a single rate and drifts away from the
//! [`super::FourierSeries`] solution as its higher modes should die out faster.

use std::f64::consts::PI;

use crate::error::{HeatError, HeatResult};
use crate::field::SolutionField;
use crate::grid::GridSpec;
use crate::symbolic::Expr;

/// Single-mode Laplace solution, `mode = 1` being the fundamental.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaplaceTransform {
    pub mode: usize,
}

impl LaplaceTransform {
    pub fn new(mode: usize) -> Self {
        Self { mode }
    }

    /// `lambda = alpha (k pi / L)^2`.
    pub fn decay_rate(&self, grid: &GridSpec) -> HeatResult<f64> {
        let wave = self.wave_number(grid.length())?;
        Ok(grid.alpha() * wave * wave)
    }

    /// Transformed solution `U(x, s) = w(x) / s + (u0(x) - w(x)) / (s + lambda)`.
    pub fn transformed(&self, grid: &GridSpec, x: f64, s: f64) -> HeatResult<f64> {
        if !(s > 0.0 && s.is_finite()) {
            return Err(HeatError::InvalidParameter {
                name: "s",
                reason: format!("must be finite and positive, got {s}"),
            });
        }
        let lambda = self.decay_rate(grid)?;
        let w = grid.steady_state(x);
        Ok(w / s + (grid.initial_value(x) - w) / (s + lambda))
    }

    /// Inverse transform `u(x, t) = w(x) + (u0(x) - w(x)) exp(-lambda t)`.
    pub fn value_at(&self, grid: &GridSpec, x: f64, t: f64) -> HeatResult<f64> {
        let lambda = self.decay_rate(grid)?;
        Ok(inverse(grid, lambda, x, t))
    }

    /// Evaluate on the grid's sample points.
    pub fn evaluate(&self, grid: &GridSpec) -> HeatResult<SolutionField> {
        let lambda = self.decay_rate(grid)?;
        let mut field = SolutionField::new(grid);
        let x = grid.x();
        let mut level = vec![0.0; grid.nx()];
        for (n, &tn) in grid.t().iter().enumerate().skip(1) {
            for (v, &xi) in level.iter_mut().zip(&x) {
                *v = inverse(grid, lambda, xi, tn);
            }
            field.write_level(n, &level, grid.u_left(), grid.u_right());
        }
        tracing::debug!(mode = self.mode, lambda, "laplace solution evaluated");
        Ok(field)
    }

    /// `u0 * exp(-alpha (k pi / L)^2 t)` as an expression, for zero boundaries.
    pub fn symbolic(&self, u0: &Expr, t: &str, alpha: &Expr, length: f64) -> HeatResult<Expr> {
        let wave = self.wave_number(length)?;
        let exponent = -(alpha.clone() * Expr::constant(wave * wave) * Expr::symbol(t));
        Ok(u0.clone() * exponent.exp())
    }

    fn wave_number(&self, length: f64) -> HeatResult<f64> {
        if self.mode == 0 {
            return Err(HeatError::InvalidParameter {
                name: "mode",
                reason: "modes are numbered from 1".into(),
            });
        }
        Ok(self.mode as f64 * PI / length)
    }
}

impl Default for LaplaceTransform {
    fn default() -> Self {
        Self::new(1)
    }
}

fn inverse(grid: &GridSpec, lambda: f64, x: f64, t: f64) -> f64 {
    let w = grid.steady_state(x);
    w + (grid.initial_value(x) - w) * (-lambda * t).exp()
}
