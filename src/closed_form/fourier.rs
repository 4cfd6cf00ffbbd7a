//! Truncated sine-series solution.

use std::f64::consts::PI;

use super::quadrature::composite_adaptive;
use crate::error::{HeatError, HeatResult};
use crate::field::SolutionField;
use crate::grid::GridSpec;

const COEFF_TOL: f64 = 1e-12;
const COEFF_DEPTH: u32 = 40;

/// Sine series truncated after `terms` modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourierSeries {
    pub terms: usize,
}

impl FourierSeries {
    pub fn new(terms: usize) -> Self {
        Self { terms }
    }

    /// `b_k = 2/L ∫ (u0 - w) sin(k pi x / L) dx` for `k = 1..=terms`.
    pub fn coefficients(&self, grid: &GridSpec) -> HeatResult<Vec<f64>> {
        if self.terms == 0 {
            return Err(HeatError::InvalidParameter {
                name: "terms",
                reason: "at least one Fourier term is required".into(),
            });
        }
        let length = grid.length();
        let coefficients = (1..=self.terms)
            .map(|k| {
                let wave = k as f64 * PI / length;
                let integrand =
                    |x: f64| (grid.initial_value(x) - grid.steady_state(x)) * (wave * x).sin();
                // At least two panels per half-wave so a mode cannot hide between samples
                let panels = 2 * k + 8;
                2.0 / length
                    * composite_adaptive(integrand, 0.0, length, panels, COEFF_TOL, COEFF_DEPTH)
            })
            .collect();
        Ok(coefficients)
    }

    /// Evaluate the series on the grid's sample points.
    pub fn evaluate(&self, grid: &GridSpec) -> HeatResult<SolutionField> {
        let coefficients = self.coefficients(grid)?;
        let mut field = SolutionField::new(grid);
        let x = grid.x();
        let t = grid.t();
        let nx = grid.nx();
        let mut level = vec![0.0; nx];
        for (n, &tn) in t.iter().enumerate().skip(1) {
            for (i, &xi) in x.iter().enumerate() {
                level[i] = series_value(&coefficients, grid, xi, tn);
            }
            field.write_level(n, &level, grid.u_left(), grid.u_right());
        }
        tracing::debug!(terms = self.terms, nt = grid.nt(), "fourier series evaluated");
        Ok(field)
    }

    /// Point value `u(x, t)`.
    pub fn value_at(&self, grid: &GridSpec, x: f64, t: f64) -> HeatResult<f64> {
        let coefficients = self.coefficients(grid)?;
        Ok(series_value(&coefficients, grid, x, t))
    }
}

impl Default for FourierSeries {
    fn default() -> Self {
        Self::new(50)
    }
}

fn series_value(coefficients: &[f64], grid: &GridSpec, x: f64, t: f64) -> f64 {
    let length = grid.length();
    let alpha = grid.alpha();
    let transient: f64 = coefficients
        .iter()
        .enumerate()
        .map(|(k, b)| {
            let wave = (k + 1) as f64 * PI / length;
            b * (wave * x).sin() * (-alpha * wave * wave * t).exp()
        })
        .sum();
    grid.steady_state(x) + transient
}
