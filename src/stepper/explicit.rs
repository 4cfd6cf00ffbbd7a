use super::{level_max, ProgressReporter, Scheme, StepProgress, StepperConfig};
use crate::field::SolutionField;
use crate::grid::GridSpec;

/// FTCS: `u[n+1,i] = u[n,i] + r (u[n,i-1] - 2 u[n,i] + u[n,i+1])`.
///
/// Does not consult the stability guard; [`super::TimeStepper::run`] does that
/// before calling in.
pub(super) fn integrate(
    grid: &GridSpec,
    field: &mut SolutionField,
    config: &StepperConfig,
    reporter: &mut impl ProgressReporter,
) {
    let nx = grid.nx();
    let r = grid.diffusion_number();
    let parallel = config.parallel_for(grid.interior_len());
    let num_steps = grid.nt() - 1;
    let t = grid.t();

    let mut current = field.row(0).to_vec();
    let mut increment = vec![0.0; nx];
    let mut next = vec![0.0; nx];

    for n in 0..num_steps {
        super::second_difference(&current, r, &mut increment, parallel);
        for i in 0..nx {
            next[i] = current[i] + increment[i];
        }
        next[0] = grid.u_left();
        next[nx - 1] = grid.u_right();
        field.write_level(n + 1, &next, grid.u_left(), grid.u_right());
        std::mem::swap(&mut current, &mut next);

        reporter.maybe_report(&StepProgress {
            scheme: Scheme::Explicit,
            steps_done: n + 1,
            num_steps,
            sim_time: t[n + 1],
            level_max: level_max(&current),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::TimeStepper;
    use crate::grid::GridSpec;

    #[test]
    fn test_single_step_matches_stencil() {
        let grid = GridSpec::builder()
            .length(4.0)
            .alpha(1.0)
            .nx(5)
            .t_end(0.25)
            .nt(2)
            .initial(|x| x * x)
            .boundaries(0.0, 16.0)
            .build()
            .unwrap();
        // dx = 1, dt = 0.25 => r = 0.25; second difference of x^2 is 2.
        let field = TimeStepper::explicit().run(&grid).unwrap();
        for i in 1..4 {
            let x = i as f64;
            assert!((field.value(1, i) - (x * x + 0.5)).abs() < 1e-14, "i = {i}");
        }
    }

    #[test]
    fn test_linear_steady_state_is_preserved() {
        let grid = GridSpec::builder()
            .nx(11)
            .t_end(1.0)
            .nt(101)
            .alpha(0.1)
            .initial(|x| 2.0 + 3.0 * x)
            .boundaries(2.0, 5.0)
            .build()
            .unwrap();
        let field = TimeStepper::explicit().run(&grid).unwrap();
        for i in 0..11 {
            let expected = 2.0 + 3.0 * grid.x()[i];
            assert!((field.value(100, i) - expected).abs() < 1e-12);
        }
    }
}
