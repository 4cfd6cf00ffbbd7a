//! Physical invariants of a produced solution.
//!
//! Every function here takes the field by shared reference and returns plain
//! data. A failed invariant is a verdict, never an error.

use serde::{Deserialize, Serialize};

use crate::field::{nan_max, nan_min, SolutionField};
use crate::grid::GridSpec;

/// Absolute part of the comparison tolerance.
pub const ABS_TOL: f64 = 1e-12;
/// Relative part of the comparison tolerance.
pub const REL_TOL: f64 = 1e-9;

fn tolerance(reference: f64) -> f64 {
    ABS_TOL + REL_TOL * reference.abs()
}

/// `(t_n, E_n)` with `E_n = ∫ u(x, t_n)^2 dx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyTrace {
    pub samples: Vec<(f64, f64)>,
}

impl EnergyTrace {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn energies(&self) -> Vec<f64> {
        self.samples.iter().map(|&(_, e)| e).collect()
    }
}

/// Extremes of the initial and boundary data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsReport {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxPrincipleVerdict {
    pub max_interior: f64,
    pub max_allowed: f64,
    pub violated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinPrincipleVerdict {
    pub min_interior: f64,
    pub min_allowed: f64,
    pub violated: bool,
}

/// Monotonicity of an energy trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyDecayReport {
    /// No step increases the energy beyond tolerance.
    pub monotone: bool,
    /// Largest `E_{n+1} - E_n` seen (may be negative).
    pub max_increase: f64,
    /// Step `n` at which `max_increase` occurs.
    pub worst_step: usize,
}

/// `|<u_n, u_0>| <= ||u_n|| ||u_0||` at one time level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CauchySchwarzCheck {
    pub t: f64,
    pub inner: f64,
    pub bound: f64,
    pub holds: bool,
}

/// Trapezoid rule on uniformly spaced samples.
pub fn trapezoid(values: impl IntoIterator<Item = f64>, dx: f64) -> f64 {
    let mut iter = values.into_iter();
    let Some(first) = iter.next() else {
        return 0.0;
    };
    let mut sum = 0.5 * first;
    let mut last = first;
    let mut count = 1;
    for v in iter {
        sum += v;
        last = v;
        count += 1;
    }
    if count == 1 {
        return 0.0;
    }
    // `last` was added with full weight above
    (sum - 0.5 * last) * dx
}

/// Energy `∫ u^2 dx` per time level (trapezoid rule).
pub fn energy_trace(field: &SolutionField, grid: &GridSpec) -> EnergyTrace {
    let dx = grid.dx();
    let samples = field
        .t()
        .iter()
        .enumerate()
        .map(|(n, &t)| (t, trapezoid(field.row(n).iter().map(|v| v * v), dx)))
        .collect();
    EnergyTrace { samples }
}

/// `sqrt(E_n)`: the L2 norm of each level.
pub fn cauchy_schwarz_bound(trace: &EnergyTrace) -> Vec<f64> {
    trace.samples.iter().map(|&(_, e)| e.max(0.0).sqrt()).collect()
}

/// Cauchy-Schwarz against the initial level at every time level.
pub fn cauchy_schwarz_check(field: &SolutionField, grid: &GridSpec) -> Vec<CauchySchwarzCheck> {
    let dx = grid.dx();
    let initial = field.row(0);
    let norm0 = trapezoid(initial.iter().map(|v| v * v), dx).sqrt();
    field
        .t()
        .iter()
        .enumerate()
        .map(|(n, &t)| {
            let row = field.row(n);
            let inner = trapezoid(row.iter().zip(initial.iter()).map(|(a, b)| a * b), dx);
            let bound = trapezoid(row.iter().map(|v| v * v), dx).sqrt() * norm0;
            CauchySchwarzCheck {
                t,
                inner,
                bound,
                holds: inner.abs() <= bound + tolerance(bound),
            }
        })
        .collect()
}

/// Lowest and highest value among the sampled initial profile and the two
/// boundary values. Depends on the grid only.
pub fn extremal_bounds(grid: &GridSpec) -> BoundsReport {
    let initial = grid.sampled_profile();
    let edges = [grid.u_left(), grid.u_right()];
    let upper = nan_max(initial.iter().chain(edges.iter()).copied());
    let lower = nan_min(initial.iter().chain(edges.iter()).copied());
    BoundsReport { lower, upper }
}

/// Check that no sample of `field` exceeds the initial/boundary maximum.
pub fn verify_maximum_principle(field: &SolutionField, grid: &GridSpec) -> MaxPrincipleVerdict {
    let max_allowed = extremal_bounds(grid).upper;
    // NaN from a blown-up run propagates through `max` and fails the comparison.
    let max_interior = field.max();
    let violated = !(max_interior <= max_allowed + tolerance(max_allowed));
    if violated {
        tracing::warn!(max_interior, max_allowed, "maximum principle violated");
    }
    MaxPrincipleVerdict {
        max_interior,
        max_allowed,
        violated,
    }
}

/// Check that no sample of `field` drops below the initial/boundary minimum.
pub fn verify_minimum_principle(field: &SolutionField, grid: &GridSpec) -> MinPrincipleVerdict {
    let min_allowed = extremal_bounds(grid).lower;
    let min_interior = field.min();
    let violated = !(min_interior >= min_allowed - tolerance(min_allowed));
    if violated {
        tracing::warn!(min_interior, min_allowed, "minimum principle violated");
    }
    MinPrincipleVerdict {
        min_interior,
        min_allowed,
        violated,
    }
}

/// Check that the energy never increases from one level to the next.
///
/// Meaningful for homogeneous boundaries; with non-zero Dirichlet data the
/// energy relaxes towards that of the steady state and may grow.
pub fn energy_decay(trace: &EnergyTrace) -> EnergyDecayReport {
    let mut report = EnergyDecayReport {
        monotone: true,
        max_increase: f64::NEG_INFINITY,
        worst_step: 0,
    };
    for (n, pair) in trace.samples.windows(2).enumerate() {
        let (e0, e1) = (pair[0].1, pair[1].1);
        let increase = e1 - e0;
        if increase > report.max_increase {
            report.max_increase = increase;
            report.worst_step = n;
        }
        if !(increase <= tolerance(e0)) {
            report.monotone = false;
        }
    }
    if !report.monotone {
        tracing::warn!(
            step = report.worst_step,
            increase = report.max_increase,
            "energy increased between levels"
        );
    }
    if report.max_increase == f64::NEG_INFINITY {
        report.max_increase = 0.0;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepper::TimeStepper;
    use std::f64::consts::PI;

    fn sine_grid() -> GridSpec {
        GridSpec::builder()
            .alpha(0.01)
            .nx(50)
            .t_end(1.0)
            .nt(200)
            .initial(|x| (PI * x).sin())
            .build()
            .unwrap()
    }

    #[test]
    fn test_trapezoid() {
        // ∫_0^1 x dx with 5 samples is exact
        let xs = (0..5).map(|i| i as f64 * 0.25);
        assert!((trapezoid(xs, 0.25) - 0.5).abs() < 1e-15);
        assert_eq!(trapezoid(std::iter::empty(), 0.1), 0.0);
        assert_eq!(trapezoid([3.0], 0.1), 0.0);
    }

    #[test]
    fn test_initial_energy_of_sine() {
        let grid = sine_grid();
        let field = SolutionField::new(&grid);
        let trace = energy_trace(&field, &grid);
        assert_eq!(trace.len(), 200);
        // ∫ sin^2(pi x) dx = 1/2
        assert!((trace.samples[0].1 - 0.5).abs() < 1e-3);
        let norms = cauchy_schwarz_bound(&trace);
        assert!((norms[0] - 0.5_f64.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn test_extremal_bounds_sine() {
        let bounds = extremal_bounds(&sine_grid());
        assert_eq!(bounds.lower, 0.0);
        assert!((bounds.upper - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_extremal_bounds_include_boundaries() {
        let grid = GridSpec::builder()
            .initial(|x| x * (1.0 - x))
            .boundaries(-2.0, 3.0)
            .build()
            .unwrap();
        let bounds = extremal_bounds(&grid);
        assert_eq!(bounds, BoundsReport { lower: -2.0, upper: 3.0 });
    }

    #[test]
    fn test_stable_explicit_obeys_principles() {
        let grid = sine_grid();
        let field = TimeStepper::explicit().run(&grid).unwrap();
        assert!(!verify_maximum_principle(&field, &grid).violated);
        assert!(!verify_minimum_principle(&field, &grid).violated);
        assert!(cauchy_schwarz_check(&field, &grid).iter().all(|c| c.holds));
    }

    #[test]
    fn test_overshoot_is_a_violation() {
        let grid = sine_grid();
        let mut field = SolutionField::new(&grid);
        field.values_mut()[[7, 10]] = 1.5;
        field.values_mut()[[9, 12]] = -0.25;
        let max = verify_maximum_principle(&field, &grid);
        assert!(max.violated);
        assert_eq!(max.max_interior, 1.5);
        assert!(verify_minimum_principle(&field, &grid).violated);
    }

    #[test]
    fn test_nan_counts_as_violation() {
        let grid = sine_grid();
        let mut field = SolutionField::new(&grid);
        field.values_mut().fill(f64::NAN);
        assert!(verify_maximum_principle(&field, &grid).violated);
    }

    #[test]
    fn test_single_nan_sample_counts_as_violation() {
        let grid = sine_grid();
        let mut field = TimeStepper::explicit().run(&grid).unwrap();
        field.values_mut()[[5, 10]] = f64::NAN;
        let max = verify_maximum_principle(&field, &grid);
        assert!(max.violated && max.max_interior.is_nan(), "{max:?}");
        assert!(verify_minimum_principle(&field, &grid).violated);
    }

    #[test]
    fn test_overflowing_implicit_run_is_flagged() {
        // Opposite boundaries near f64::MAX overflow the right-hand side to +-inf,
        // and the Thomas sweep turns inf - inf into NaN.
        let grid = GridSpec::builder()
            .alpha(1.0)
            .nx(5)
            .t_end(1.0)
            .nt(2)
            .initial(|_| 0.0)
            .boundaries(1e308, -1e308)
            .build()
            .unwrap();
        let field = TimeStepper::implicit().run(&grid).unwrap();
        assert!(field.to_rows()[1].iter().any(|v| v.is_nan()));
        assert!(verify_maximum_principle(&field, &grid).violated);
        assert!(verify_minimum_principle(&field, &grid).violated);
    }

    #[test]
    fn test_energy_decay_detects_increase() {
        let trace = EnergyTrace {
            samples: vec![(0.0, 1.0), (0.1, 0.9), (0.2, 0.95), (0.3, 0.5)],
        };
        let report = energy_decay(&trace);
        assert!(!report.monotone);
        assert_eq!(report.worst_step, 1);
        assert!((report.max_increase - 0.05).abs() < 1e-12);

        let flat = EnergyTrace {
            samples: vec![(0.0, 1.0)],
        };
        assert!(energy_decay(&flat).monotone);
    }
}
