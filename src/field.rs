//! Time-by-space solution buffer.

use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{HeatError, HeatResult};
use crate::grid::GridSpec;

/// Solution `u[n, i]` on `nt` time levels by `nx` spatial samples.
///
/// Row 0 holds the sampled initial profile and columns `0` and `nx - 1` hold the
/// Dirichlet values on every row. Where these overlap (the two corners of row 0)
/// the boundary value wins.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionField {
    x: Vec<f64>,
    t: Vec<f64>,
    u: Array2<f64>,
}

impl SolutionField {
    /// Allocate a field for `grid` with the initial and boundary data applied.
    ///
    /// Rows past the first are zero apart from their boundary slots.
    pub fn new(grid: &GridSpec) -> Self {
        let (nt, nx) = (grid.nt(), grid.nx());
        let mut u = Array2::zeros((nt, nx));
        for (i, v) in grid.sampled_profile().into_iter().enumerate() {
            u[[0, i]] = v;
        }
        for n in 0..nt {
            u[[n, 0]] = grid.u_left();
            u[[n, nx - 1]] = grid.u_right();
        }
        Self {
            x: grid.x(),
            t: grid.t(),
            u,
        }
    }

    /// Assemble a field from explicit axes and row-major values.
    pub fn from_rows(x: Vec<f64>, t: Vec<f64>, rows: Vec<Vec<f64>>) -> HeatResult<Self> {
        let (nt, nx) = (t.len(), x.len());
        if rows.len() != nt || rows.iter().any(|r| r.len() != nx) {
            return Err(HeatError::InvalidParameter {
                name: "rows",
                reason: format!("expected {nt} rows of {nx} values"),
            });
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let u = Array2::from_shape_vec((nt, nx), flat).map_err(|e| HeatError::InvalidParameter {
            name: "rows",
            reason: e.to_string(),
        })?;
        Ok(Self { x, t, u })
    }

    /// `(nt, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.t.len(), self.x.len())
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.u
    }

    pub fn value(&self, n: usize, i: usize) -> f64 {
        self.u[[n, i]]
    }

    /// Spatial profile at time level `n`.
    pub fn row(&self, n: usize) -> ArrayView1<'_, f64> {
        self.u.row(n)
    }

    /// Time history at spatial sample `i`.
    pub fn column(&self, i: usize) -> ArrayView1<'_, f64> {
        self.u.column(i)
    }

    /// Time level closest to `t`.
    pub fn at_time(&self, t: f64) -> ArrayView1<'_, f64> {
        let n = self
            .t
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - t).abs().total_cmp(&(b.1 - t).abs()))
            .map(|(n, _)| n)
            .unwrap_or(0);
        self.u.row(n)
    }

    /// Largest value over all `(n, i)`; NaN if any sample is NaN.
    pub fn max(&self) -> f64 {
        nan_max(self.u.iter().copied())
    }

    /// Smallest value over all `(n, i)`; NaN if any sample is NaN.
    pub fn min(&self) -> f64 {
        nan_min(self.u.iter().copied())
    }

    /// Largest pointwise `|self - other|`; `None` when the shapes differ.
    pub fn max_abs_difference(&self, other: &SolutionField) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.u
                .iter()
                .zip(other.u.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, nan_max_pair),
        )
    }

    /// Largest pointwise `|u(x_i, t_n) - exact(x_i, t_n)|`.
    pub fn max_error_against<F>(&self, exact: F) -> f64
    where
        F: Fn(f64, f64) -> f64,
    {
        let mut worst = 0.0_f64;
        for (n, row) in self.u.axis_iter(Axis(0)).enumerate() {
            let t = self.t[n];
            for (i, v) in row.iter().enumerate() {
                worst = nan_max_pair(worst, (v - exact(self.x[i], t)).abs());
            }
        }
        worst
    }

    /// Row-major copy, one `Vec` per time level.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.u.axis_iter(Axis(0)).map(|r| r.to_vec()).collect()
    }

    pub(crate) fn values_mut(&mut self) -> &mut Array2<f64> {
        &mut self.u
    }

    /// Overwrite level `n` with `values` and re-pin the boundary slots.
    pub(crate) fn write_level(&mut self, n: usize, values: &[f64], u_left: f64, u_right: f64) {
        let nx = self.x.len();
        let mut row = self.u.row_mut(n);
        row.assign(&ArrayView1::from(values));
        row[0] = u_left;
        row[nx - 1] = u_right;
    }
}

/// `f64::max` that lets NaN through instead of discarding it.
pub(crate) fn nan_max_pair(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

/// Largest value of `values`, NaN if any of them is NaN.
pub(crate) fn nan_max(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(f64::NEG_INFINITY, nan_max_pair)
}

/// Smallest value of `values`, NaN if any of them is NaN.
pub(crate) fn nan_min(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(f64::INFINITY, |a, b| {
        if a.is_nan() || b.is_nan() {
            f64::NAN
        } else {
            a.min(b)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridSpec {
        GridSpec::builder()
            .nx(5)
            .nt(4)
            .initial(|x| 1.0 + x)
            .boundaries(-1.0, 2.5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_applies_initial_and_boundaries() {
        let field = SolutionField::new(&grid());
        assert_eq!(field.shape(), (4, 5));
        assert!((field.value(0, 2) - 1.5).abs() < 1e-15);
        for n in 0..4 {
            assert_eq!(field.value(n, 0), -1.0);
            assert_eq!(field.value(n, 4), 2.5);
        }
        assert_eq!(field.value(3, 2), 0.0);
    }

    #[test]
    fn test_from_rows_checks_shape() {
        let ok = SolutionField::from_rows(vec![0.0, 1.0], vec![0.0], vec![vec![3.0, 4.0]]);
        assert!(ok.is_ok());
        let bad = SolutionField::from_rows(vec![0.0, 1.0], vec![0.0], vec![vec![3.0]]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_extremes_and_difference() {
        let a = SolutionField::new(&grid());
        let mut b = a.clone();
        b.values_mut()[[2, 2]] = 0.75;
        assert_eq!(a.max(), 2.5);
        assert_eq!(a.min(), -1.0);
        assert_eq!(a.max_abs_difference(&b), Some(0.75));
        assert!(a.at_time(10.0).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_write_level_repins_boundaries() {
        let g = grid();
        let mut field = SolutionField::new(&g);
        field.write_level(1, &[9.0, 1.0, 2.0, 3.0, 9.0], g.u_left(), g.u_right());
        assert_eq!(field.to_rows()[1], vec![-1.0, 1.0, 2.0, 3.0, 2.5]);
    }

    #[test]
    fn test_nan_poisons_extremes_and_differences() {
        let a = SolutionField::new(&grid());
        let mut b = a.clone();
        b.values_mut()[[2, 2]] = f64::NAN;
        assert!(b.max().is_nan());
        assert!(b.min().is_nan());
        assert!(a.max_abs_difference(&b).unwrap().is_nan());
        assert!(b.max_error_against(|_, _| 0.0).is_nan());
        // NaN in the first operand as well as the second
        assert!(nan_max([f64::NAN, 1.0]).is_nan());
        assert!(nan_min([1.0, f64::NAN]).is_nan());
        assert_eq!(nan_max([1.0, 3.0, 2.0]), 3.0);
    }
}
