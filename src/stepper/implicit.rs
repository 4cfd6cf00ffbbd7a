use super::{level_max, ProgressReporter, Scheme, StepProgress};
use crate::error::{HeatError, HeatResult};
use crate::field::SolutionField;
use crate::grid::GridSpec;
use crate::tridiag::TridiagonalSystem;

/// Backward Euler: `(I + r D) u[n+1, 1..nx-1] = u[n, 1..nx-1] + r * (boundary terms)`.
///
/// The matrix is assembled once; each step only rebuilds the right-hand side and
/// runs one Thomas sweep.
pub(super) fn integrate(
    grid: &GridSpec,
    field: &mut SolutionField,
    reporter: &mut impl ProgressReporter,
) -> HeatResult<()> {
    let system = TridiagonalSystem::backward_euler(grid.interior_len(), grid.diffusion_number());
    integrate_with(grid, &system, field, reporter)
}

/// Time loop over an already assembled interior matrix.
fn integrate_with(
    grid: &GridSpec,
    system: &TridiagonalSystem,
    field: &mut SolutionField,
    reporter: &mut impl ProgressReporter,
) -> HeatResult<()> {
    let nx = grid.nx();
    let m = grid.interior_len();
    let r = grid.diffusion_number();
    let num_steps = grid.nt() - 1;
    let t = grid.t();

    let mut current = field.row(0).to_vec();
    let mut rhs = vec![0.0; m];
    let mut scratch = vec![0.0; m];
    let mut solution = vec![0.0; m];

    for n in 0..num_steps {
        rhs.copy_from_slice(&current[1..nx - 1]);
        // Dirichlet neighbours of the first and last interior rows move to the RHS.
        rhs[0] += r * grid.u_left();
        rhs[m - 1] += r * grid.u_right();

        system
            .solve_into(&rhs, &mut scratch, &mut solution)
            .map_err(|e| HeatError::SingularSystem {
                step: n,
                row: e.row,
                pivot: e.pivot,
            })?;

        current[0] = grid.u_left();
        current[1..nx - 1].copy_from_slice(&solution);
        current[nx - 1] = grid.u_right();
        field.write_level(n + 1, &current, grid.u_left(), grid.u_right());

        reporter.maybe_report(&StepProgress {
            scheme: Scheme::Implicit,
            steps_done: n + 1,
            num_steps,
            sim_time: t[n + 1],
            level_max: level_max(&current),
        });
    }
    Ok(())
}
