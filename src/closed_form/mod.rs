//! Closed-form oracles used to cross-check the discretized steppers.
//!
//! The evaluators split the solution into the steady linear profile joining
//! the Dirichlet values plus a transient that vanishes at both ends:
//!
//! ```text
//! u(x, t) = w(x) + v(x, t),   w(x) = u_left + (u_right - u_left) x / L
//! ```

pub mod fourier;
pub mod green;
pub mod laplace;
pub mod quadrature;

pub use fourier::FourierSeries;
pub use green::GreenConvolution;
pub use laplace::LaplaceTransform;
pub use quadrature::{adaptive_simpson, composite_adaptive};

use std::f64::consts::PI;

/// `exp(-alpha (pi / L)^2 t) sin(pi x / L)`: the fundamental mode with zero ends.
pub fn analytic_sine_mode(x: f64, t: f64, alpha: f64, length: f64) -> f64 {
    let k = PI / length;
    (-alpha * k * k * t).exp() * (k * x).sin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analytic_mode_at_origin_and_ends() {
        assert!((analytic_sine_mode(0.5, 0.0, 0.1, 1.0) - 1.0).abs() < 1e-15);
        assert!(analytic_sine_mode(0.0, 3.0, 0.1, 1.0).abs() < 1e-15);
        let decayed = analytic_sine_mode(2.0, 2.0, 0.3, 2.0);
        assert!(decayed.abs() < 1e-12);
        let expected = (-0.01 * PI * PI * 5.0).exp();
        assert!((analytic_sine_mode(0.5, 5.0, 0.01, 1.0) - expected).abs() < 1e-15);
    }
}
