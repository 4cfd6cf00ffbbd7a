//! Heat-kernel convolution of the initial profile.

use std::f64::consts::PI;

use rayon::prelude::*;

use super::quadrature::composite_adaptive;
use crate::field::SolutionField;
use crate::grid::GridSpec;

const PANELS: usize = 64;
const QUAD_TOL: f64 = 1e-10;
const QUAD_DEPTH: u32 = 30;

/// Gaussian kernel `exp(-z^2 / (4 alpha t)) / sqrt(4 pi alpha t)`.
pub fn heat_kernel(z: f64, alpha: f64, t: f64) -> f64 {
    let s = 4.0 * alpha * t;
    (-z * z / s).exp() / (PI * s).sqrt()
}

/// Convolution of `u0` with the heat kernel.
///
/// With `image_terms = Some(k)` the kernel is the Dirichlet Green's function on
/// `[0, L]` built from `2k + 1` image pairs, applied to `u0 - w` where `w` is the
/// steady profile. With `None` the free-space kernel is integrated over `[0, L]`
/// against `u0` directly; that form ignores the boundary values and is only close
/// to the rod solution while the kernel is narrow compared to `L`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreenConvolution {
    pub image_terms: Option<usize>,
}

impl GreenConvolution {
    pub fn new(image_terms: Option<usize>) -> Self {
        Self { image_terms }
    }

    pub fn free_space() -> Self {
        Self::new(None)
    }

    /// Dirichlet kernel `sum_k [K(x - xi + 2kL) - K(x + xi + 2kL)]`.
    pub fn kernel(&self, x: f64, xi: f64, t: f64, alpha: f64, length: f64) -> f64 {
        match self.image_terms {
            None => heat_kernel(x - xi, alpha, t),
            Some(k) => {
                let k = k as i64;
                (-k..=k)
                    .map(|j| {
                        let shift = 2.0 * j as f64 * length;
                        heat_kernel(x - xi + shift, alpha, t)
                            - heat_kernel(x + xi + shift, alpha, t)
                    })
                    .sum()
            }
        }
    }

    /// Point value `u(x, t)` for `t > 0`; `t <= 0` returns `u0(x)`.
    pub fn value_at(&self, grid: &GridSpec, x: f64, t: f64) -> f64 {
        if t <= 0.0 {
            return grid.initial_value(x);
        }
        let (alpha, length) = (grid.alpha(), grid.length());
        match self.image_terms {
            None => composite_adaptive(
                |xi| grid.initial_value(xi) * self.kernel(x, xi, t, alpha, length),
                0.0,
                length,
                PANELS,
                QUAD_TOL,
                QUAD_DEPTH,
            ),
            Some(_) => {
                let transient = composite_adaptive(
                    |xi| {
                        (grid.initial_value(xi) - grid.steady_state(xi))
                            * self.kernel(x, xi, t, alpha, length)
                    },
                    0.0,
                    length,
                    PANELS,
                    QUAD_TOL,
                    QUAD_DEPTH,
                );
                grid.steady_state(x) + transient
            }
        }
    }

    /// Evaluate on every grid sample. Row 0 is the sampled initial profile.
    ///
    /// With images the boundary columns are pinned to the Dirichlet values; the
    /// free-space form leaves them as computed.
    pub fn evaluate(&self, grid: &GridSpec) -> SolutionField {
        let x = grid.x();
        let t = grid.t();
        let mut field = SolutionField::new(grid);
        for (n, &tn) in t.iter().enumerate().skip(1) {
            let level: Vec<f64> = x.par_iter().map(|&xi| self.value_at(grid, xi, tn)).collect();
            match self.image_terms {
                Some(_) => field.write_level(n, &level, grid.u_left(), grid.u_right()),
                None => {
                    let nx = level.len();
                    field.write_level(n, &level, level[0], level[nx - 1]);
                }
            }
        }
        tracing::debug!(image_terms = ?self.image_terms, nt = grid.nt(), "green convolution evaluated");
        field
    }
}

impl Default for GreenConvolution {
    fn default() -> Self {
        Self::new(Some(3))
    }
}
