use proptest::prelude::*;
use rodheat::diagnostics::{verify_maximum_principle, verify_minimum_principle};
use rodheat::symbolic::{check_heat_residual, parse, Expr};
use rodheat::{GridSpec, Scheme, TimeStepper, TridiagonalSystem};

fn bands(m: usize) -> impl Strategy<Value = (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>)> {
    (
        prop::collection::vec(-1.0_f64..1.0, m),
        prop::collection::vec(-1.0_f64..1.0, m),
        prop::collection::vec(-1.0_f64..1.0, m),
        prop::collection::vec(-10.0_f64..10.0, m),
    )
}

// Property: a strictly diagonally dominant system is solved to residual precision.
proptest! {
    #[test]
    fn prop_dominant_system_solves(
        (sub, sup, jitter, rhs) in (1usize..40).prop_flat_map(bands),
    ) {
        let diag: Vec<f64> = sub
            .iter()
            .zip(&sup)
            .zip(&jitter)
            .map(|((a, c), j)| a.abs() + c.abs() + 0.5 + j.abs())
            .collect();
        let system = TridiagonalSystem::new(sub, diag, sup);
        prop_assert!(system.is_diagonally_dominant());
        let x = system.solve(&rhs).unwrap();
        let back = system.multiply(&x);
        for (b, r) in back.iter().zip(&rhs) {
            prop_assert!((b - r).abs() < 1e-9, "{} vs {}", b, r);
        }
    }
}

// Property: backward Euler matrices are solvable for every r >= 0 and keep a
// non-negative right-hand side non-negative.
proptest! {
    #[test]
    fn prop_backward_euler_is_monotone(
        m in 1usize..60,
        r in 0.0_f64..1e3,
        rhs in prop::collection::vec(0.0_f64..5.0, 60),
    ) {
        let rhs = &rhs[..m];
        let x = TridiagonalSystem::backward_euler(m, r).solve(rhs).unwrap();
        prop_assert!(x.iter().all(|v| *v >= -1e-12));
        let max_rhs = rhs.iter().copied().fold(0.0, f64::max);
        prop_assert!(x.iter().all(|v| *v <= max_rhs + 1e-9));
    }
}

// Property: every scheme holds the Dirichlet values on every level and a stable
// run stays within the extremes of the data.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn prop_boundaries_and_bounds_hold(
        left in -2.0_f64..2.0,
        right in -2.0_f64..2.0,
        amp in -3.0_f64..3.0,
        nx in 5usize..30,
        r in 0.05_f64..0.5,
    ) {
        let grid = GridSpec::builder()
            .alpha(0.05)
            .nx(nx)
            .t_end(0.2)
            .initial(move |x| amp * (3.0 * x).sin())
            .boundaries(left, right)
            .build_stabilized(r)
            .unwrap();
        for scheme in Scheme::ALL {
            let field = TimeStepper::new(scheme).run(&grid).unwrap();
            for n in 0..grid.nt() {
                prop_assert_eq!(field.value(n, 0), left);
                prop_assert_eq!(field.value(n, nx - 1), right);
            }
            prop_assert!(!verify_maximum_principle(&field, &grid).violated, "{}", scheme);
            prop_assert!(!verify_minimum_principle(&field, &grid).violated, "{}", scheme);
        }
    }
}

// Property: decaying modes sin(k pi x) exp(-alpha (k pi)^2 t) are exact for every k.
proptest! {
    #[test]
    fn prop_decaying_modes_are_exact(k in 1u32..12) {
        let src = format!("exp(-alpha*({k}*pi)^2*t)*sin({k}*pi*x)");
        let u = parse(&src).unwrap();
        let report = check_heat_residual(&u, "x", "t", &Expr::symbol("alpha"));
        prop_assert!(report.is_exact, "{}: {}", src, report.residual);
    }
}
