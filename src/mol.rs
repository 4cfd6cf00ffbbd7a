//! Method-of-lines reference solver.
//!
//! The spatial stencil turns the rod into `nx` coupled ODEs
//! `du_i/dt = alpha (u[i-1] - 2 u[i] + u[i+1]) / dx^2` with the end values held.
//! Those are integrated with an adaptive Dormand-Prince 5(4) pair whose step is
//! clipped so that every grid time level is hit exactly.

use crate::error::{HeatError, HeatResult};
use crate::field::SolutionField;
use crate::grid::GridSpec;
use crate::stepper::second_difference;

// Dormand-Prince tableau; the system is autonomous so the nodes never appear.
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights (also the last stage row, FSAL)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Fifth minus fourth order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Adaptive integrator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodOfLines {
    pub rtol: f64,
    pub atol: f64,
    /// Budget of attempted steps (accepted and rejected) over the whole run.
    pub max_steps: usize,
    /// First trial step; `None` starts from the explicit stability limit.
    pub initial_step: Option<f64>,
}

/// Step counts of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MolStats {
    pub accepted: usize,
    pub rejected: usize,
}

impl MethodOfLines {
    pub fn new() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-10,
            max_steps: 1_000_000,
            initial_step: None,
        }
    }

    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn run(&self, grid: &GridSpec) -> HeatResult<SolutionField> {
        self.run_with_stats(grid).map(|(field, _)| field)
    }

    pub fn run_with_stats(&self, grid: &GridSpec) -> HeatResult<(SolutionField, MolStats)> {
        self.validate()?;
        let nx = grid.nx();
        let dx = grid.dx();
        let scale = grid.alpha() / (dx * dx);
        let rhs = |u: &[f64], out: &mut [f64]| second_difference(u, scale, out, false);

        let mut field = SolutionField::new(grid);
        let mut u = field.row(0).to_vec();
        let mut stages = Stages::new(nx);
        let mut trial = vec![0.0; nx];
        let mut next = vec![0.0; nx];
        let mut stats = MolStats::default();

        let mut h = self
            .initial_step
            .unwrap_or(0.5 / (4.0 * scale))
            .min(grid.t_end());
        let mut time = 0.0;
        rhs(u.as_slice(), stages.k[0].as_mut_slice());

        tracing::debug!(nx, nt = grid.nt(), rtol = self.rtol, atol = self.atol, "starting method of lines");
        for (n, &target) in grid.t().iter().enumerate().skip(1) {
            while time < target {
                if stats.accepted + stats.rejected >= self.max_steps {
                    return Err(HeatError::StepLimitExceeded {
                        limit: self.max_steps,
                    });
                }
                let remaining = target - time;
                // Stretch slightly to land on the level instead of leaving a sliver
                let clipped = remaining <= h * (1.0 + 1e-12);
                let step = if clipped { remaining } else { h };

                stages.advance(&rhs, &u, step, &mut trial, &mut next);
                let err = self.error_norm(&u, &next, &trial);
                if err <= 1.0 {
                    stats.accepted += 1;
                    time = if clipped { target } else { time + step };
                    std::mem::swap(&mut u, &mut next);
                    // FSAL: the seventh stage is f(u_{n+1})
                    stages.k.swap(0, 6);
                } else {
                    stats.rejected += 1;
                }
                let factor = if err == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                if !(clipped && err <= 1.0) {
                    h = step * factor;
                }
            }
            field.write_level(n, &u, grid.u_left(), grid.u_right());
        }
        tracing::info!(accepted = stats.accepted, rejected = stats.rejected, "method of lines complete");
        Ok((field, stats))
    }

    fn validate(&self) -> HeatResult<()> {
        let positive = |name: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(HeatError::InvalidParameter {
                    name,
                    reason: format!("must be positive and finite, got {v}"),
                })
            }
        };
        positive("rtol", self.rtol)?;
        positive("atol", self.atol)?;
        if let Some(h0) = self.initial_step {
            positive("initial_step", h0)?;
        }
        Ok(())
    }

    /// RMS of the embedded error estimate scaled by `atol + rtol * |u|`.
    fn error_norm(&self, u: &[f64], next: &[f64], err: &[f64]) -> f64 {
        let sum: f64 = u
            .iter()
            .zip(next)
            .zip(err)
            .map(|((a, b), e)| {
                let sc = self.atol + self.rtol * a.abs().max(b.abs());
                (e / sc).powi(2)
            })
            .sum();
        (sum / u.len() as f64).sqrt()
    }
}

impl Default for MethodOfLines {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage derivatives `k1..k7` and a scratch state.
struct Stages {
    k: Vec<Vec<f64>>,
    y: Vec<f64>,
}

impl Stages {
    fn new(n: usize) -> Self {
        Self {
            k: vec![vec![0.0; n]; 7],
            y: vec![0.0; n],
        }
    }

    /// One trial step of size `h` from `u`: fifth-order result in `next`, error
    /// estimate in `err`. `k[0]` must already hold `f(u)`.
    fn advance<F>(&mut self, f: &F, u: &[f64], h: f64, err: &mut [f64], next: &mut [f64])
    where
        F: Fn(&[f64], &mut [f64]),
    {
        let rows: [(usize, &[f64]); 5] = [
            (1, &[A21]),
            (2, &[A31, A32]),
            (3, &[A41, A42, A43]),
            (4, &[A51, A52, A53, A54]),
            (5, &[A61, A62, A63, A64, A65]),
        ];
        for (stage, coeffs) in rows {
            for i in 0..u.len() {
                let mut acc = 0.0;
                for (j, a) in coeffs.iter().enumerate() {
                    acc += a * self.k[j][i];
                }
                self.y[i] = u[i] + h * acc;
            }
            f(self.y.as_slice(), self.k[stage].as_mut_slice());
        }
        for i in 0..u.len() {
            let k = &self.k;
            next[i] = u[i] + h * (B1 * k[0][i] + B3 * k[2][i] + B4 * k[3][i] + B5 * k[4][i] + B6 * k[5][i]);
        }
        f(&*next, self.k[6].as_mut_slice());
        for i in 0..u.len() {
            let k = &self.k;
            err[i] = h
                * (E1 * k[0][i] + E3 * k[2][i] + E4 * k[3][i] + E5 * k[4][i] + E6 * k[5][i]
                    + E7 * k[6][i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closed_form::analytic_sine_mode;
    use std::f64::consts::PI;

    #[test]
    fn test_tableau_rows_sum_to_nodes() {
        const C2: f64 = 1.0 / 5.0;
        const C3: f64 = 3.0 / 10.0;
        const C4: f64 = 4.0 / 5.0;
        const C5: f64 = 8.0 / 9.0;
        assert!((A21 - C2).abs() < 1e-15);
        assert!((A31 + A32 - C3).abs() < 1e-15);
        assert!((A41 + A42 + A43 - C4).abs() < 1e-14);
        assert!((A51 + A52 + A53 + A54 - C5).abs() < 1e-13);
        assert!((A61 + A62 + A63 + A64 + A65 - 1.0).abs() < 1e-13);
        assert!((B1 + B3 + B4 + B5 + B6 - 1.0).abs() < 1e-15);
        assert!((E1 + E3 + E4 + E5 + E6 + E7).abs() < 1e-15);
    }

    #[test]
    fn test_matches_semi_discrete_mode() {
        // sin(pi x) is an eigenvector of the stencil with eigenvalue
        // -4 alpha / dx^2 sin^2(pi dx / 2), so the semi-discrete solution is exact.
        let grid = GridSpec::builder()
            .alpha(0.01)
            .nx(21)
            .t_end(0.5)
            .nt(11)
            .build()
            .unwrap();
        let dx = grid.dx();
        let lambda = 4.0 * 0.01 / (dx * dx) * (0.5 * PI * dx).sin().powi(2);
        let field = MethodOfLines::new().run(&grid).unwrap();
        let err = field.max_error_against(|x, t| (-lambda * t).exp() * (PI * x).sin());
        assert!(err < 1e-7, "max error {err}");
        let vs_pde = field.max_error_against(|x, t| analytic_sine_mode(x, t, 0.01, 1.0));
        assert!(vs_pde < 1e-3, "max error {vs_pde}");
    }

    #[test]
    fn test_levels_hit_exactly_and_boundaries_pinned() {
        let grid = GridSpec::builder()
            .alpha(0.1)
            .nx(11)
            .t_end(1.0)
            .nt(7)
            .initial(|x| x * (1.0 - x))
            .boundaries(0.5, -0.5)
            .build()
            .unwrap();
        let (field, stats) = MethodOfLines::new().run_with_stats(&grid).unwrap();
        assert!(stats.accepted >= 6);
        for n in 0..7 {
            assert_eq!(field.value(n, 0), 0.5);
            assert_eq!(field.value(n, 10), -0.5);
        }
    }

    #[test]
    fn test_step_budget() {
        let grid = GridSpec::builder().nx(101).build().unwrap();
        let mol = MethodOfLines {
            max_steps: 5,
            ..MethodOfLines::new()
        };
        assert_eq!(
            mol.run(&grid).unwrap_err(),
            HeatError::StepLimitExceeded { limit: 5 }
        );
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        let grid = GridSpec::builder().build().unwrap();
        let mol = MethodOfLines::new().with_tolerances(0.0, 1e-6);
        assert!(matches!(
            mol.run(&grid),
            Err(HeatError::InvalidParameter { name: "rtol", .. })
        ));
    }
}
