use super::canon::is_identically_zero;
use super::expr::{differentiate, simplify, Bindings, Expr};
use crate::field::nan_max_pair;

/// `u_t - alpha u_xx` for a candidate solution `u(x, t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualReport {
    pub residual: Expr,
    /// The residual reduces to zero in normal form.
    pub is_exact: bool,
    x: String,
    t: String,
}

impl ResidualReport {
    /// Largest `|residual|` over the `(x, t)` points, with the remaining symbols
    /// taken from `bindings`. `None` if a symbol is unbound.
    pub fn probe(&self, bindings: &Bindings, points: &[(f64, f64)]) -> Option<f64> {
        let mut vars = bindings.clone();
        let mut worst = 0.0_f64;
        for &(x, t) in points {
            vars.insert(self.x.clone(), x);
            vars.insert(self.t.clone(), t);
            worst = nan_max_pair(worst, self.residual.eval(&vars)?.abs());
        }
        Some(worst)
    }
}

/// Check whether `u` solves `u_t = alpha u_xx` identically.
pub fn check_heat_residual(u: &Expr, x: &str, t: &str, alpha: &Expr) -> ResidualReport {
    let u_t = differentiate(u, t);
    let u_xx = differentiate(&differentiate(u, x), x);
    let residual = simplify(&(u_t - alpha.clone() * u_xx));
    let is_exact = is_identically_zero(&residual);
    tracing::debug!(%residual, is_exact, "heat residual");
    ResidualReport {
        residual,
        is_exact,
        x: x.to_string(),
        t: t.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse;

    #[test]
    fn test_accepts_decaying_sine_mode() {
        let u = parse("exp(-alpha*pi^2*t)*sin(pi*x)").unwrap();
        let report = check_heat_residual(&u, "x", "t", &Expr::symbol("alpha"));
        assert!(report.is_exact, "residual = {}", report.residual);

        // Same with a numeric diffusivity and e^(...) notation
        let u = parse("e^(-0.01*pi^2*t)*sin(pi*x)").unwrap();
        let report = check_heat_residual(&u, "x", "t", &Expr::Const(0.01));
        assert!(report.is_exact, "residual = {}", report.residual);
    }

    #[test]
    fn test_rejects_wrong_decay_rate() {
        let u = parse("exp(-t)*sin(pi*x)").unwrap();
        let report = check_heat_residual(&u, "x", "t", &Expr::symbol("alpha"));
        assert!(!report.is_exact);
        let mut bindings = Bindings::new();
        bindings.insert("alpha".into(), 0.01);
        let worst = report.probe(&bindings, &[(0.5, 0.0), (0.25, 1.0)]).unwrap();
        // At (0.5, 0): |-1 + 0.01 pi^2| = 0.901...
        assert!((worst - (1.0 - 0.01 * std::f64::consts::PI.powi(2))).abs() < 1e-12);
        assert_eq!(report.probe(&Bindings::new(), &[(0.5, 0.0)]), None);
    }

    #[test]
    fn test_other_exact_solutions() {
        let alpha = Expr::symbol("k");
        for src in [
            "3*x + 2",
            "x^2 + 2*k*t",
            "exp(-4*k*t)*cos(2*x) + exp(-9*k*t)*sin(3*x)",
            "exp(k*t + x)",
            "exp(k*t)*sinh(x)",
        ] {
            let u = parse(src).unwrap();
            let report = check_heat_residual(&u, "x", "t", &alpha);
            assert!(report.is_exact, "{src}: residual = {}", report.residual);
        }
        let u = parse("x^2 + k*t").unwrap();
        assert!(!check_heat_residual(&u, "x", "t", &alpha).is_exact);
    }
}
