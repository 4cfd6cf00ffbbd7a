//! Finite-difference time steppers.
//!
//! ```text
//! GridSpec ──► stability::require_stable ──► TimeStepper::run ──► SolutionField
//!                                                  │
//!                               Explicit / Implicit (Thomas) / Rk2
//! ```
//!
//! Time levels are strictly sequential. Within a level the explicit and RK2
//! interior updates are independent per point and switch to rayon once the
//! interior is at least [`StepperConfig::min_parallel_points`] long.

mod explicit;
mod implicit;
mod rk2;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HeatError, HeatResult};
use crate::field::{nan_max, SolutionField};
use crate::grid::GridSpec;
use crate::stability;

/// Time-integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// Forward-time centred-space.
    Explicit,
    /// Backward Euler with one tridiagonal solve per step.
    Implicit,
    /// Two-stage midpoint Runge-Kutta.
    Rk2,
}

impl Scheme {
    pub const ALL: [Scheme; 3] = [Scheme::Explicit, Scheme::Implicit, Scheme::Rk2];

    /// Whether the scheme must pass the stability guard before stepping.
    pub fn is_conditionally_stable(self) -> bool {
        !matches!(self, Scheme::Implicit)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scheme::Explicit => "explicit",
            Scheme::Implicit => "implicit",
            Scheme::Rk2 => "rk2",
        };
        f.write_str(name)
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "explicit" | "ftcs" => Ok(Scheme::Explicit),
            "implicit" | "backward-euler" | "backward_euler" => Ok(Scheme::Implicit),
            "rk2" | "midpoint" => Ok(Scheme::Rk2),
            other => Err(format!("unknown scheme `{other}`")),
        }
    }
}

/// Execution knobs shared by all schemes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    /// Interior length from which per-level updates run on rayon.
    pub min_parallel_points: usize,
    /// Optional ceiling on the number of time steps.
    pub max_steps: Option<usize>,
}

impl StepperConfig {
    pub fn new() -> Self {
        Self {
            min_parallel_points: 4096,
            max_steps: None,
        }
    }

    /// Force the serial path regardless of grid size.
    pub fn serial() -> Self {
        Self {
            min_parallel_points: usize::MAX,
            ..Self::new()
        }
    }

    pub(crate) fn parallel_for(&self, interior_len: usize) -> bool {
        interior_len >= self.min_parallel_points
    }
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot handed to progress callbacks.
#[derive(Debug, Clone, Copy)]
pub struct StepProgress {
    pub scheme: Scheme,
    /// Completed steps (0..=num_steps).
    pub steps_done: usize,
    pub num_steps: usize,
    /// Simulated time of the newest level.
    pub sim_time: f64,
    /// Largest value on the newest level.
    pub level_max: f64,
}

pub(crate) trait ProgressReporter {
    fn every_steps(&self) -> usize;
    fn report(&mut self, progress: &StepProgress);

    fn maybe_report(&mut self, progress: &StepProgress) {
        let every = self.every_steps();
        if every == 0 {
            return;
        }
        if progress.steps_done % every == 0 || progress.steps_done == progress.num_steps {
            tracing::trace!(
                scheme = %progress.scheme,
                step = progress.steps_done,
                of = progress.num_steps,
                "progress"
            );
            self.report(progress);
        }
    }
}

pub(crate) struct NoProgress;

impl ProgressReporter for NoProgress {
    fn every_steps(&self) -> usize {
        0
    }
    fn report(&mut self, _progress: &StepProgress) {}
}

struct FnProgress<F> {
    every_steps: usize,
    f: F,
}

impl<F> ProgressReporter for FnProgress<F>
where
    F: FnMut(&StepProgress),
{
    fn every_steps(&self) -> usize {
        self.every_steps
    }
    fn report(&mut self, progress: &StepProgress) {
        (self.f)(progress);
    }
}

/// A scheme together with its execution settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStepper {
    scheme: Scheme,
    config: StepperConfig,
}

impl TimeStepper {
    pub fn new(scheme: Scheme) -> Self {
        Self {
            scheme,
            config: StepperConfig::new(),
        }
    }

    pub fn with_config(scheme: Scheme, config: StepperConfig) -> Self {
        Self { scheme, config }
    }

    pub fn explicit() -> Self {
        Self::new(Scheme::Explicit)
    }

    pub fn implicit() -> Self {
        Self::new(Scheme::Implicit)
    }

    pub fn rk2() -> Self {
        Self::new(Scheme::Rk2)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn config(&self) -> &StepperConfig {
        &self.config
    }

    /// Integrate `grid` over its whole time axis.
    pub fn run(&self, grid: &GridSpec) -> HeatResult<SolutionField> {
        self.run_inner(grid, NoProgress)
    }

    /// Integrate while periodically reporting progress.
    ///
    /// `every_steps = 0` disables reporting. The reporter is called after every
    /// `every_steps` completed steps and once more after the final step.
    pub fn run_with_progress<F>(
        &self,
        grid: &GridSpec,
        every_steps: usize,
        report: F,
    ) -> HeatResult<SolutionField>
    where
        F: FnMut(&StepProgress),
    {
        self.run_inner(
            grid,
            FnProgress {
                every_steps,
                f: report,
            },
        )
    }

    fn run_inner(
        &self,
        grid: &GridSpec,
        mut reporter: impl ProgressReporter,
    ) -> HeatResult<SolutionField> {
        let report = stability::validate(grid, self.scheme);
        tracing::debug!(
            scheme = %self.scheme,
            nx = grid.nx(),
            nt = grid.nt(),
            r = report.r,
            "starting run"
        );
        if self.scheme.is_conditionally_stable() {
            stability::require_stable(grid, self.scheme)?;
        }
        let num_steps = grid.nt() - 1;
        if let Some(limit) = self.config.max_steps {
            if num_steps > limit {
                return Err(HeatError::StepLimitExceeded { limit });
            }
        }

        let mut field = SolutionField::new(grid);
        match self.scheme {
            Scheme::Explicit => explicit::integrate(grid, &mut field, &self.config, &mut reporter),
            Scheme::Implicit => implicit::integrate(grid, &mut field, &mut reporter)?,
            Scheme::Rk2 => rk2::integrate(grid, &mut field, &self.config, &mut reporter),
        }
        tracing::info!(scheme = %self.scheme, steps = num_steps, "run complete");
        Ok(field)
    }
}

/// Second-difference stencil `v[i-1] - 2 v[i] + v[i+1]` written into `out` for
/// every interior `i`; boundary slots of `out` are set to zero.
pub(crate) fn second_difference(v: &[f64], scale: f64, out: &mut [f64], parallel: bool) {
    use rayon::prelude::*;

    let n = v.len();
    out[0] = 0.0;
    out[n - 1] = 0.0;
    let interior = &mut out[1..n - 1];
    if parallel {
        interior.par_iter_mut().enumerate().for_each(|(k, o)| {
            let i = k + 1;
            *o = scale * (v[i - 1] - 2.0 * v[i] + v[i + 1]);
        });
    } else {
        for (k, o) in interior.iter_mut().enumerate() {
            let i = k + 1;
            *o = scale * (v[i - 1] - 2.0 * v[i] + v[i + 1]);
        }
    }
}

pub(crate) fn level_max(values: &[f64]) -> f64 {
    nan_max(values.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics;
    use std::f64::consts::PI;

    fn sine_grid(nx: usize, nt: usize) -> GridSpec {
        GridSpec::builder()
            .alpha(0.01)
            .nx(nx)
            .t_end(1.0)
            .nt(nt)
            .initial(|x| (PI * x).sin())
            .build()
            .unwrap()
    }

    #[test]
    fn test_scheme_parse_and_display() {
        for scheme in Scheme::ALL {
            assert_eq!(scheme.to_string().parse::<Scheme>().unwrap(), scheme);
        }
        assert_eq!("FTCS".parse::<Scheme>().unwrap(), Scheme::Explicit);
        assert!("leapfrog".parse::<Scheme>().is_err());
    }

    #[test]
    fn test_unstable_grid_fails_before_stepping() {
        let grid = sine_grid(50, 10);
        assert!(grid.diffusion_number() > 0.5);
        for scheme in [Scheme::Explicit, Scheme::Rk2] {
            let err = TimeStepper::new(scheme).run(&grid).unwrap_err();
            assert!(matches!(err, HeatError::Stability { .. }), "{scheme}: {err}");
        }
        let field = TimeStepper::implicit().run(&grid).unwrap();
        assert_eq!(field.shape(), (10, 50));
    }

    #[test]
    fn test_step_limit() {
        let grid = sine_grid(20, 100);
        let stepper = TimeStepper::with_config(
            Scheme::Implicit,
            StepperConfig {
                max_steps: Some(50),
                ..StepperConfig::new()
            },
        );
        assert_eq!(
            stepper.run(&grid).unwrap_err(),
            HeatError::StepLimitExceeded { limit: 50 }
        );
    }

    #[test]
    fn test_progress_reporting() {
        let grid = sine_grid(20, 11);
        let mut seen = Vec::new();
        TimeStepper::explicit()
            .run_with_progress(&grid, 4, |p| seen.push(p.steps_done))
            .unwrap();
        assert_eq!(seen, vec![4, 8, 10]);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let grid = sine_grid(200, 2000);
        for scheme in [Scheme::Explicit, Scheme::Rk2] {
            let serial = TimeStepper::with_config(scheme, StepperConfig::serial())
                .run(&grid)
                .unwrap();
            let parallel = TimeStepper::with_config(
                scheme,
                StepperConfig {
                    min_parallel_points: 1,
                    max_steps: None,
                },
            )
            .run(&grid)
            .unwrap();
            assert_eq!(serial, parallel, "{scheme}");
        }
    }

    #[test]
    fn test_unchecked_unstable_explicit_violates_maximum_principle() {
        let grid = GridSpec::builder()
            .alpha(0.01)
            .nx(51)
            .t_end(1.0)
            .nt(30)
            .initial(|x| if (0.4..=0.6).contains(&x) { 1.0 } else { 0.0 })
            .build()
            .unwrap();
        assert!(grid.diffusion_number() > 0.5);
        let mut field = SolutionField::new(&grid);
        explicit::integrate(&grid, &mut field, &StepperConfig::serial(), &mut NoProgress);
        let verdict = diagnostics::verify_maximum_principle(&field, &grid);
        assert!(verdict.violated, "{verdict:?}");
    }
}
