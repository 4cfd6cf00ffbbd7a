//! Random-walk estimators of the rod temperature.
//!
//! [`ParticleEstimator`] is a Feynman-Kac estimate: `u(x, t)` is the expected
//! value of `u0` at the end of a Brownian path started at `x`, or the boundary
//! value if the path reached an end first. [`DensityWalk`] tracks where a cloud
//! of walkers ends up and is a picture of diffusion, not of a particular solution.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{HeatError, HeatResult};
use crate::field::SolutionField;
use crate::grid::GridSpec;
use crate::stability::EXPLICIT_LIMIT;
use crate::stepper::Scheme;

/// Monte Carlo estimate of the solution on every grid sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleEstimator {
    /// Walkers started from every spatial sample.
    pub particle_count: usize,
    /// Lattice steps over the whole horizon; `None` picks a step close to `dx`.
    pub step_count: Option<usize>,
    pub seed: u64,
}

impl ParticleEstimator {
    pub fn new(particle_count: usize, seed: u64) -> Self {
        Self {
            particle_count,
            step_count: None,
            seed,
        }
    }

    pub fn with_steps(mut self, step_count: usize) -> Self {
        self.step_count = Some(step_count);
        self
    }

    /// Number of lattice steps used for `grid`.
    pub fn resolved_steps(&self, grid: &GridSpec) -> HeatResult<usize> {
        match self.step_count {
            Some(0) => Err(HeatError::InvalidParameter {
                name: "step_count",
                reason: "must be at least 1".into(),
            }),
            Some(s) => Ok(s),
            None => {
                let dx = grid.dx();
                let s = (2.0 * grid.alpha() * grid.t_end() / (dx * dx)).round();
                Ok((s as usize).max(1))
            }
        }
    }

    /// Estimate `u` on `grid`. Row 0 and the boundary columns carry the exact data.
    pub fn estimate(&self, grid: &GridSpec) -> HeatResult<SolutionField> {
        if self.particle_count == 0 {
            return Err(HeatError::InvalidParameter {
                name: "particle_count",
                reason: "must be at least 1".into(),
            });
        }
        let steps = self.resolved_steps(grid)?;
        let h = (2.0 * grid.alpha() * grid.t_end() / steps as f64).sqrt();
        let nt = grid.nt();
        let nx = grid.nx();
        // Walk steps completed by each time level
        let checkpoints: Vec<usize> = (0..nt)
            .map(|n| ((n * steps) as f64 / (nt - 1) as f64).round() as usize)
            .collect();
        tracing::debug!(
            particles = self.particle_count,
            steps,
            h,
            nx,
            nt,
            "starting particle estimate"
        );

        let x = grid.x();
        let columns: Vec<Vec<f64>> = x
            .par_iter()
            .enumerate()
            .map(|(i, &x0)| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let mut sums = vec![0.0; nt];
                for _ in 0..self.particle_count {
                    walk(grid, x0, h, &checkpoints, &mut rng, &mut sums);
                }
                let count = self.particle_count as f64;
                sums.iter().map(|s| s / count).collect()
            })
            .collect();

        let mut field = SolutionField::new(grid);
        let mut level = vec![0.0; nx];
        for n in 1..nt {
            for (i, column) in columns.iter().enumerate() {
                level[i] = column[n];
            }
            field.write_level(n, &level, grid.u_left(), grid.u_right());
        }
        tracing::info!(particles = self.particle_count, steps, "particle estimate complete");
        Ok(field)
    }
}

impl Default for ParticleEstimator {
    fn default() -> Self {
        Self::new(1000, 0)
    }
}

/// One walker from `x0`, adding its contribution at every checkpoint into `sums`.
fn walk(
    grid: &GridSpec,
    x0: f64,
    h: f64,
    checkpoints: &[usize],
    rng: &mut impl Rng,
    sums: &mut [f64],
) {
    let length = grid.length();
    let mut pos = x0;
    let mut taken = 0;
    let mut absorbed: Option<f64> = absorbed_value(grid, pos, length);
    for (n, &target) in checkpoints.iter().enumerate() {
        while absorbed.is_none() && taken < target {
            pos += if rng.gen_bool(0.5) { h } else { -h };
            taken += 1;
            absorbed = absorbed_value(grid, pos, length);
        }
        sums[n] += match absorbed {
            Some(boundary) => boundary,
            None => grid.initial_value(pos),
        };
    }
}

fn absorbed_value(grid: &GridSpec, pos: f64, length: f64) -> Option<f64> {
    if pos <= 0.0 {
        Some(grid.u_left())
    } else if pos >= length {
        Some(grid.u_right())
    } else {
        None
    }
}

/// Walkers on a lattice of spacing `dx` that hop left or right with probability
/// `p / 2` each per step, `p = alpha dt / dx^2`, and are clamped at the ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityWalk {
    pub particle_count: usize,
    pub steps: usize,
    pub dt: f64,
    pub dx: f64,
    pub alpha: f64,
    pub length: f64,
    pub seed: u64,
}

impl DensityWalk {
    /// Hop probability `alpha dt / dx^2`.
    pub fn jump_probability(&self) -> f64 {
        self.alpha * self.dt / (self.dx * self.dx)
    }

    /// Number of histogram bins, `floor(L / dx) + 1`.
    pub fn bins(&self) -> usize {
        (self.length / self.dx).floor() as usize + 1
    }

    /// Particle fraction per bin after each step, shape `(steps, bins)`.
    pub fn simulate(&self) -> HeatResult<Array2<f64>> {
        for (name, v) in [
            ("dt", self.dt),
            ("dx", self.dx),
            ("alpha", self.alpha),
            ("length", self.length),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(HeatError::InvalidParameter {
                    name,
                    reason: format!("must be positive and finite, got {v}"),
                });
            }
        }
        if self.particle_count == 0 {
            return Err(HeatError::InvalidParameter {
                name: "particle_count",
                reason: "must be at least 1".into(),
            });
        }
        let p = self.jump_probability();
        if p > EXPLICIT_LIMIT {
            return Err(HeatError::Stability {
                scheme: Scheme::Explicit,
                r: p,
                limit: EXPLICIT_LIMIT,
            });
        }

        let bins = self.bins();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut positions: Vec<f64> = (0..self.particle_count)
            .map(|_| rng.gen_range(0.0..self.length))
            .collect();
        let mut density = Array2::zeros((self.steps, bins));
        let weight = 1.0 / self.particle_count as f64;

        for step in 0..self.steps {
            for pos in positions.iter_mut() {
                let roll: f64 = rng.gen();
                if roll < 0.5 * p {
                    *pos -= self.dx;
                } else if roll < p {
                    *pos += self.dx;
                }
                *pos = pos.clamp(0.0, self.length);
                let bin = ((*pos / self.length) * bins as f64) as usize;
                density[[step, bin.min(bins - 1)]] += weight;
            }
        }
        tracing::debug!(particles = self.particle_count, steps = self.steps, p, "density walk done");
        Ok(density)
    }
}

impl Default for DensityWalk {
    fn default() -> Self {
        Self {
            particle_count: 1000,
            steps: 100,
            dt: 0.001,
            dx: 0.02,
            alpha: 0.01,
            length: 1.0,
            seed: 0,
        }
    }
}
