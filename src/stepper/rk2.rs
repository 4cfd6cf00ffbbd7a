use super::{level_max, ProgressReporter, Scheme, StepProgress, StepperConfig};
use crate::field::SolutionField;
use crate::grid::GridSpec;

/// Midpoint RK2 on the semi-discrete system.
///
/// `k1 = dt L(u_n)`, `k2 = dt L(u_n + k1 / 2)`, `u_{n+1} = u_n + k2`, where
/// `L(v)_i = alpha (v[i-1] - 2 v[i] + v[i+1]) / dx^2` and `L(v)` vanishes on the
/// boundary slots.
pub(super) fn integrate(
    grid: &GridSpec,
    field: &mut SolutionField,
    config: &StepperConfig,
    reporter: &mut impl ProgressReporter,
) {
    let nx = grid.nx();
    // dt * alpha / dx^2
    let r = grid.diffusion_number();
    let parallel = config.parallel_for(grid.interior_len());
    let num_steps = grid.nt() - 1;
    let t = grid.t();

    let mut current = field.row(0).to_vec();
    let mut k1 = vec![0.0; nx];
    let mut k2 = vec![0.0; nx];
    let mut midpoint = vec![0.0; nx];

    for n in 0..num_steps {
        super::second_difference(&current, r, &mut k1, parallel);
        for i in 0..nx {
            midpoint[i] = current[i] + 0.5 * k1[i];
        }
        super::second_difference(&midpoint, r, &mut k2, parallel);
        for i in 0..nx {
            current[i] += k2[i];
        }
        current[0] = grid.u_left();
        current[nx - 1] = grid.u_right();
        field.write_level(n + 1, &current, grid.u_left(), grid.u_right());

        reporter.maybe_report(&StepProgress {
            scheme: Scheme::Rk2,
            steps_done: n + 1,
            num_steps,
            sim_time: t[n + 1],
            level_max: level_max(&current),
        });
    }
}
