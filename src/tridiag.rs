//! Banded solver for tridiagonal systems.

use thiserror::Error;

/// A pivot vanished during forward elimination.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("zero pivot {pivot:e} in row {row}")]
pub struct SingularPivot {
    pub row: usize,
    pub pivot: f64,
}

/// Tridiagonal matrix stored by bands.
///
/// Row `i` reads `sub[i] * x[i-1] + diag[i] * x[i] + sup[i] * x[i+1]`;
/// `sub[0]` and `sup[m-1]` are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct TridiagonalSystem {
    sub: Vec<f64>,
    diag: Vec<f64>,
    sup: Vec<f64>,
}

impl TridiagonalSystem {
    /// # Panics
    /// If the three bands differ in length or are empty.
    pub fn new(sub: Vec<f64>, diag: Vec<f64>, sup: Vec<f64>) -> Self {
        assert!(!diag.is_empty(), "tridiagonal system must have at least one row");
        assert_eq!(sub.len(), diag.len(), "sub-diagonal length mismatch");
        assert_eq!(sup.len(), diag.len(), "super-diagonal length mismatch");
        Self { sub, diag, sup }
    }

    /// System of size `m` with constant bands.
    pub fn constant(m: usize, sub: f64, diag: f64, sup: f64) -> Self {
        Self::new(vec![sub; m], vec![diag; m], vec![sup; m])
    }

    /// `I + r D` on `m` interior points: diagonal `1 + 2r`, off-diagonals `-r`.
    pub fn backward_euler(m: usize, r: f64) -> Self {
        Self::constant(m, -r, 1.0 + 2.0 * r, -r)
    }

    pub fn len(&self) -> usize {
        self.diag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diag.is_empty()
    }

    /// Strict row-wise diagonal dominance.
    pub fn is_diagonally_dominant(&self) -> bool {
        let m = self.len();
        (0..m).all(|i| {
            let left = if i > 0 { self.sub[i].abs() } else { 0.0 };
            let right = if i + 1 < m { self.sup[i].abs() } else { 0.0 };
            self.diag[i].abs() > left + right
        })
    }

    /// `A x`.
    pub fn multiply(&self, x: &[f64]) -> Vec<f64> {
        let m = self.len();
        assert_eq!(x.len(), m, "vector length mismatch");
        (0..m)
            .map(|i| {
                let mut v = self.diag[i] * x[i];
                if i > 0 {
                    v += self.sub[i] * x[i - 1];
                }
                if i + 1 < m {
                    v += self.sup[i] * x[i + 1];
                }
                v
            })
            .collect()
    }

    /// Solve `A x = rhs`.
    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, SingularPivot> {
        let mut scratch = vec![0.0; self.len()];
        let mut out = vec![0.0; self.len()];
        self.solve_into(rhs, &mut scratch, &mut out)?;
        Ok(out)
    }

    /// Thomas algorithm without allocation.
    ///
    /// `scratch` receives the modified super-diagonal and `out` the solution; both
    /// must have the system's length. The bands themselves are left untouched so
    /// the same system can be solved once per time step.
    pub fn solve_into(
        &self,
        rhs: &[f64],
        scratch: &mut [f64],
        out: &mut [f64],
    ) -> Result<(), SingularPivot> {
        let m = self.len();
        assert_eq!(rhs.len(), m, "right-hand side length mismatch");
        assert_eq!(scratch.len(), m, "scratch length mismatch");
        assert_eq!(out.len(), m, "output length mismatch");

        // Forward sweep
        let mut pivot = self.diag[0];
        check_pivot(0, pivot, self.row_scale(0))?;
        scratch[0] = self.sup[0] / pivot;
        out[0] = rhs[0] / pivot;
        for i in 1..m {
            pivot = self.diag[i] - self.sub[i] * scratch[i - 1];
            check_pivot(i, pivot, self.row_scale(i))?;
            scratch[i] = if i + 1 < m { self.sup[i] / pivot } else { 0.0 };
            out[i] = (rhs[i] - self.sub[i] * out[i - 1]) / pivot;
        }

        // Back substitution
        for i in (0..m - 1).rev() {
            out[i] -= scratch[i] * out[i + 1];
        }
        Ok(())
    }

    /// Magnitude of row `i`, without the ignored corner entries.
    fn row_scale(&self, i: usize) -> f64 {
        let left = if i > 0 { self.sub[i].abs() } else { 0.0 };
        let right = if i + 1 < self.len() { self.sup[i].abs() } else { 0.0 };
        self.diag[i].abs() + left + right
    }
}

fn check_pivot(row: usize, pivot: f64, scale: f64) -> Result<(), SingularPivot> {
    if !pivot.is_finite() || pivot.abs() <= f64::EPSILON * scale.max(f64::MIN_POSITIVE) {
        Err(SingularPivot { row, pivot })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Gaussian elimination with partial pivoting, for cross-checking.
    fn dense_solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
        let n = b.len();
        for k in 0..n {
            let p = (k..n)
                .max_by(|&i, &j| a[i][k].abs().total_cmp(&a[j][k].abs()))
                .unwrap();
            a.swap(k, p);
            b.swap(k, p);
            for i in k + 1..n {
                let f = a[i][k] / a[k][k];
                for j in k..n {
                    a[i][j] -= f * a[k][j];
                }
                b[i] -= f * b[k];
            }
        }
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let s: f64 = (i + 1..n).map(|j| a[i][j] * x[j]).sum();
            x[i] = (b[i] - s) / a[i][i];
        }
        x
    }

    #[test]
    fn test_backward_euler_3x3_matches_dense() {
        let r = 0.7;
        let system = TridiagonalSystem::backward_euler(3, r);
        let x = system.solve(&[1.0, 1.0, 1.0]).unwrap();

        let d = 1.0 + 2.0 * r;
        let dense = dense_solve(
            vec![vec![d, -r, 0.0], vec![-r, d, -r], vec![0.0, -r, d]],
            vec![1.0, 1.0, 1.0],
        );
        for i in 0..3 {
            assert!(
                (x[i] - dense[i]).abs() < 1e-10,
                "x[{i}] = {}, dense = {}",
                x[i],
                dense[i]
            );
        }
        // Symmetric system with symmetric RHS
        assert!((x[0] - x[2]).abs() < 1e-14);
    }

    #[test]
    fn test_hand_computed_3x3() {
        // r = 1: [[3,-1,0],[-1,3,-1],[0,-1,3]] x = [1,1,1] => x = [4/7, 5/7, 4/7]
        let x = TridiagonalSystem::backward_euler(3, 1.0)
            .solve(&[1.0, 1.0, 1.0])
            .unwrap();
        let expected = [4.0 / 7.0, 5.0 / 7.0, 4.0 / 7.0];
        for (got, want) in x.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_row() {
        let x = TridiagonalSystem::backward_euler(1, 0.25)
            .solve(&[3.0])
            .unwrap();
        assert!((x[0] - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_general_bands_roundtrip() {
        let system = TridiagonalSystem::new(
            vec![0.0, -1.0, 0.5, 2.0, -0.3],
            vec![4.0, 5.0, -6.0, 7.0, 3.0],
            vec![1.0, 2.0, -1.5, 0.25, 0.0],
        );
        let rhs = [1.0, -2.0, 3.0, 0.5, 4.0];
        let x = system.solve(&rhs).unwrap();
        let back = system.multiply(&x);
        for i in 0..rhs.len() {
            assert!((back[i] - rhs[i]).abs() < 1e-12, "row {i}");
        }
    }

    #[test]
    fn test_zero_pivot_is_reported() {
        let system = TridiagonalSystem::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0, 0.0]);
        let err = system.solve(&[1.0, 1.0]).unwrap_err();
        assert_eq!(err.row, 0);

        // Second pivot cancels: 1 - 1 * (1 / 1) = 0
        let system = TridiagonalSystem::new(vec![0.0, 1.0], vec![1.0, 1.0], vec![1.0, 0.0]);
        assert_eq!(system.solve(&[1.0, 2.0]).unwrap_err().row, 1);
    }

    #[test]
    fn test_corner_entries_do_not_affect_pivot_check() {
        let clean = TridiagonalSystem::new(vec![0.0, -1e-20], vec![1e-20, 1e-20], vec![0.0, 0.0]);
        let noisy = TridiagonalSystem::new(vec![1e10, -1e-20], vec![1e-20, 1e-20], vec![0.0, 1e10]);
        let rhs = [1e-20, 0.0];
        let expected = clean.solve(&rhs).unwrap();
        assert_eq!(noisy.solve(&rhs).unwrap(), expected);
        assert!((expected[0] - 1.0).abs() < 1e-12);
        assert!((expected[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dominance() {
        assert!(TridiagonalSystem::backward_euler(10, 3.0).is_diagonally_dominant());
        assert!(!TridiagonalSystem::constant(4, -1.0, 2.0, -1.0).is_diagonally_dominant());
    }
}
