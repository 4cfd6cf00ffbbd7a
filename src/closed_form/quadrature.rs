/// Adaptive Simpson quadrature of `f` over `[a, b]`.
///
/// Subdivides until the Richardson estimate drops below `tol` or `max_depth`
/// halvings have been made on a branch.
pub fn adaptive_simpson<F>(f: F, a: f64, b: f64, tol: f64, max_depth: u32) -> f64
where
    F: Fn(f64) -> f64,
{
    if a == b {
        return 0.0;
    }
    let fa = f(a);
    let fb = f(b);
    let m = 0.5 * (a + b);
    let fm = f(m);
    let whole = simpson(a, b, fa, fm, fb);
    refine(&f, a, b, fa, fm, fb, whole, tol, max_depth)
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn refine<F>(f: &F, a: f64, b: f64, fa: f64, fm: f64, fb: f64, whole: f64, tol: f64, depth: u32) -> f64
where
    F: Fn(f64) -> f64,
{
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * tol {
        return left + right + delta / 15.0;
    }
    refine(f, a, m, fa, flm, fm, left, 0.5 * tol, depth - 1)
        + refine(f, m, b, fm, frm, fb, right, 0.5 * tol, depth - 1)
}

/// Adaptive Simpson over `n` equal panels, for integrands that are sharply
/// peaked somewhere inside `[a, b]`.
pub fn composite_adaptive<F>(f: F, a: f64, b: f64, panels: usize, tol: f64, max_depth: u32) -> f64
where
    F: Fn(f64) -> f64,
{
    let panels = panels.max(1);
    let h = (b - a) / panels as f64;
    let per_panel = tol / panels as f64;
    (0..panels)
        .map(|k| {
            let lo = a + k as f64 * h;
            let hi = if k + 1 == panels { b } else { lo + h };
            adaptive_simpson(&f, lo, hi, per_panel, max_depth)
        })
        .sum()
}
