//! Discretized problem description.
//!
//! A [`GridSpec`] fixes the rod length, diffusivity, spatial and temporal
//! resolution, the initial profile and the two Dirichlet boundary values.
//! It is built once through [`GridBuilder`] and then shared read-only by every
//! stepper, estimator and diagnostic.

use std::fmt;
use std::sync::Arc;

use crate::error::{HeatError, HeatResult};

/// Initial temperature profile `u0(x)`.
pub type Profile = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Largest diffusion number accepted by [`GridBuilder::build_stabilized`].
pub const MAX_STABLE_TARGET: f64 = 0.5;

/// Immutable description of a discretized rod problem.
#[derive(Clone)]
pub struct GridSpec {
    length: f64,
    alpha: f64,
    nx: usize,
    t_end: f64,
    nt: usize,
    u0: Profile,
    u_left: f64,
    u_right: f64,
}

impl GridSpec {
    pub fn builder() -> GridBuilder {
        GridBuilder::new()
    }

    /// Rod length `L`.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Diffusivity `alpha`.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of spatial samples (boundaries included).
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Time horizon `T`.
    pub fn t_end(&self) -> f64 {
        self.t_end
    }

    /// Number of time samples (initial level included).
    pub fn nt(&self) -> usize {
        self.nt
    }

    pub fn u_left(&self) -> f64 {
        self.u_left
    }

    pub fn u_right(&self) -> f64 {
        self.u_right
    }

    /// Spatial step `L / (nx - 1)`.
    pub fn dx(&self) -> f64 {
        self.length / (self.nx - 1) as f64
    }

    /// Time step `T / (nt - 1)`.
    pub fn dt(&self) -> f64 {
        self.t_end / (self.nt - 1) as f64
    }

    /// Diffusion number `alpha * dt / dx^2`.
    pub fn diffusion_number(&self) -> f64 {
        let dx = self.dx();
        self.alpha * self.dt() / (dx * dx)
    }

    /// Number of interior samples, `nx - 2`.
    pub fn interior_len(&self) -> usize {
        self.nx - 2
    }

    /// Evaluate the initial profile at `x`.
    pub fn initial_value(&self, x: f64) -> f64 {
        (self.u0)(x)
    }

    /// Shared handle to the initial profile.
    pub fn profile(&self) -> Profile {
        Arc::clone(&self.u0)
    }

    /// Spatial sample coordinates `x_i = i * dx`.
    ///
    /// The last sample is pinned to `L` exactly.
    pub fn x(&self) -> Vec<f64> {
        let dx = self.dx();
        let mut xs: Vec<f64> = (0..self.nx).map(|i| i as f64 * dx).collect();
        xs[self.nx - 1] = self.length;
        xs
    }

    /// Time sample coordinates `t_n = n * dt`.
    ///
    /// The last sample is pinned to `T` exactly.
    pub fn t(&self) -> Vec<f64> {
        let dt = self.dt();
        let mut ts: Vec<f64> = (0..self.nt).map(|n| n as f64 * dt).collect();
        ts[self.nt - 1] = self.t_end;
        ts
    }

    /// Initial profile sampled on the spatial grid, without boundary overrides.
    pub fn sampled_profile(&self) -> Vec<f64> {
        self.x().into_iter().map(|x| (self.u0)(x)).collect()
    }

    /// Steady-state linear profile joining the two boundary values.
    pub fn steady_state(&self, x: f64) -> f64 {
        self.u_left + (self.u_right - self.u_left) * x / self.length
    }

    /// Copy of this grid with a different horizon and time resolution.
    pub fn with_time_axis(&self, t_end: f64, nt: usize) -> HeatResult<GridSpec> {
        GridBuilder::from_grid(self).t_end(t_end).nt(nt).build()
    }
}

impl fmt::Debug for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridSpec")
            .field("length", &self.length)
            .field("alpha", &self.alpha)
            .field("nx", &self.nx)
            .field("t_end", &self.t_end)
            .field("nt", &self.nt)
            .field("u_left", &self.u_left)
            .field("u_right", &self.u_right)
            .finish_non_exhaustive()
    }
}

/// Builder for [`GridSpec`].
///
/// Defaults describe the unit rod with `alpha = 0.01`, `nx = 50`, `T = 1`,
/// `nt = 200`, `u0 = sin(pi x)` and zero boundaries.
#[derive(Clone)]
pub struct GridBuilder {
    length: f64,
    alpha: f64,
    nx: usize,
    t_end: f64,
    nt: usize,
    u0: Profile,
    u_left: f64,
    u_right: f64,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self {
            length: 1.0,
            alpha: 0.01,
            nx: 50,
            t_end: 1.0,
            nt: 200,
            u0: Arc::new(|x: f64| (std::f64::consts::PI * x).sin()),
            u_left: 0.0,
            u_right: 0.0,
        }
    }

    fn from_grid(grid: &GridSpec) -> Self {
        Self {
            length: grid.length,
            alpha: grid.alpha,
            nx: grid.nx,
            t_end: grid.t_end,
            nt: grid.nt,
            u0: Arc::clone(&grid.u0),
            u_left: grid.u_left,
            u_right: grid.u_right,
        }
    }

    pub fn length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn nx(mut self, nx: usize) -> Self {
        self.nx = nx;
        self
    }

    pub fn t_end(mut self, t_end: f64) -> Self {
        self.t_end = t_end;
        self
    }

    pub fn nt(mut self, nt: usize) -> Self {
        self.nt = nt;
        self
    }

    pub fn initial<F>(mut self, u0: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.u0 = Arc::new(u0);
        self
    }

    pub fn profile(mut self, u0: Profile) -> Self {
        self.u0 = u0;
        self
    }

    pub fn boundaries(mut self, u_left: f64, u_right: f64) -> Self {
        self.u_left = u_left;
        self.u_right = u_right;
        self
    }

    /// Validate and freeze the grid.
    pub fn build(self) -> HeatResult<GridSpec> {
        self.validate_space()?;
        require_positive("t_end", self.t_end)?;
        if self.nt < 2 {
            return Err(HeatError::InvalidGridSpec {
                field: "nt",
                reason: format!("must be at least 2, got {}", self.nt),
            });
        }
        Ok(GridSpec {
            length: self.length,
            alpha: self.alpha,
            nx: self.nx,
            t_end: self.t_end,
            nt: self.nt,
            u0: self.u0,
            u_left: self.u_left,
            u_right: self.u_right,
        })
    }

    /// Build a grid whose time axis is derived from a target diffusion number.
    ///
    /// `dt = r_target * dx^2 / alpha`, `nt = floor(T / dt) + 1` and the horizon is
    /// truncated to `(nt - 1) * dt`, so the resulting grid has `r == r_target`.
    /// When `T` is shorter than a single step the grid falls back to `nt = 2`,
    /// `dt = T`, which gives `r < r_target`. Any `nt` set on the builder is ignored.
    pub fn build_stabilized(self, r_target: f64) -> HeatResult<GridSpec> {
        self.validate_space()?;
        require_positive("t_end", self.t_end)?;
        if !(r_target > 0.0 && r_target <= MAX_STABLE_TARGET) {
            return Err(HeatError::InvalidParameter {
                name: "r_target",
                reason: format!("must lie in (0, {MAX_STABLE_TARGET}], got {r_target}"),
            });
        }

        let dx = self.length / (self.nx - 1) as f64;
        let dt = r_target * dx * dx / self.alpha;
        let steps = (self.t_end / dt).floor();
        let (nt, t_end) = if steps >= 1.0 {
            let steps = steps as usize;
            (steps + 1, steps as f64 * dt)
        } else {
            (2, self.t_end)
        };
        tracing::debug!(r_target, dt, nt, t_end, "derived stabilized time axis");

        Self {
            nt,
            t_end,
            ..self
        }
        .build()
    }

    fn validate_space(&self) -> HeatResult<()> {
        require_positive("length", self.length)?;
        require_positive("alpha", self.alpha)?;
        if self.nx < 3 {
            return Err(HeatError::InvalidGridSpec {
                field: "nx",
                reason: format!("must be at least 3 to leave an interior point, got {}", self.nx),
            });
        }
        require_finite("u_left", self.u_left)?;
        require_finite("u_right", self.u_right)?;
        self.validate_profile()
    }

    /// Every sample of `u0` on the spatial axis must be finite.
    fn validate_profile(&self) -> HeatResult<()> {
        let dx = self.length / (self.nx - 1) as f64;
        for i in 0..self.nx {
            let x = if i + 1 == self.nx { self.length } else { i as f64 * dx };
            let value = (self.u0)(x);
            if !value.is_finite() {
                return Err(HeatError::InvalidGridSpec {
                    field: "u0",
                    reason: format!("must be finite on the grid, got {value} at x = {x}"),
                });
            }
        }
        Ok(())
    }
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn require_positive(field: &'static str, value: f64) -> HeatResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(HeatError::InvalidGridSpec {
            field,
            reason: format!("must be finite and strictly positive, got {value}"),
        })
    }
}

fn require_finite(field: &'static str, value: f64) -> HeatResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(HeatError::InvalidGridSpec {
            field,
            reason: format!("must be finite, got {value}"),
        })
    }
}
