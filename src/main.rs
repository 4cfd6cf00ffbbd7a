use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rodheat::config::RunConfig;
use rodheat::io::{write_field_json, DiagnosticsRecord};
use rodheat::stability;
use rodheat::symbolic::{self, check_heat_residual, Bindings};
use rodheat::{
    FourierSeries, GreenConvolution, GridSpec, LaplaceTransform, MethodOfLines,
    ParticleEstimator, Scheme, SolutionField, TimeStepper,
};

#[derive(Parser)]
#[command(name = "rodheat")]
#[command(about = "Solvers and checks for the 1D heat equation on a rod")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one finite-difference scheme and print its diagnostics
    Solve {
        #[command(flatten)]
        problem: ProblemArgs,
        /// Scheme override (explicit, implicit, rk2)
        #[arg(short, long)]
        scheme: Option<Scheme>,
        /// Report progress every N steps
        #[arg(long, default_value = "0")]
        progress: usize,
        /// Write the field and diagnostics as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every solver and compare it against the Fourier series
    Compare {
        #[command(flatten)]
        problem: ProblemArgs,
        /// Fourier terms of the reference solution
        #[arg(long, default_value = "50")]
        terms: usize,
        /// Particles per sample for the random-walk estimate (0 skips it)
        #[arg(long, default_value = "0")]
        particles: usize,
    },

    /// Estimate the solution with random walks
    Walk {
        #[command(flatten)]
        problem: ProblemArgs,
        #[arg(long, default_value = "1000")]
        particles: usize,
        /// Walk steps over the horizon (default: step close to dx)
        #[arg(long)]
        steps: Option<usize>,
        #[arg(long, default_value = "0")]
        seed: u64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check symbolically whether u(x, t) solves u_t = alpha u_xx
    Check {
        /// Candidate solution, e.g. "exp(-alpha*pi^2*t)*sin(pi*x)"
        expr: String,
        /// Diffusivity: a number or an expression
        #[arg(long, default_value = "alpha")]
        alpha: String,
        /// Value for a symbolic diffusivity when probing numerically
        #[arg(long, default_value = "0.01")]
        probe_alpha: f64,
    },
}

/// Problem definition: a config file, individual overrides, or both.
#[derive(Args)]
struct ProblemArgs {
    /// JSON run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    length: Option<f64>,
    #[arg(long)]
    alpha: Option<f64>,
    #[arg(long)]
    nx: Option<usize>,
    #[arg(long)]
    t_end: Option<f64>,
    #[arg(long)]
    nt: Option<usize>,
    /// Derive nt from this diffusion number instead
    #[arg(long, conflicts_with = "nt")]
    r_target: Option<f64>,
    #[arg(long)]
    left: Option<f64>,
    #[arg(long)]
    right: Option<f64>,
}

impl ProblemArgs {
    fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        let g = &mut config.grid;
        if let Some(v) = self.length {
            g.length = v;
        }
        if let Some(v) = self.alpha {
            g.alpha = v;
        }
        if let Some(v) = self.nx {
            g.nx = v;
        }
        if let Some(v) = self.t_end {
            g.t_end = v;
        }
        if let Some(v) = self.nt {
            g.nt = Some(v);
            g.r_target = None;
        }
        if let Some(v) = self.r_target {
            g.nt = None;
            g.r_target = Some(v);
        }
        if let Some(v) = self.left {
            config.boundary.left = v;
        }
        if let Some(v) = self.right {
            config.boundary.right = v;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rodheat=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Solve {
            problem,
            scheme,
            progress,
            output,
        } => solve(&problem, scheme, progress, output),
        Command::Compare {
            problem,
            terms,
            particles,
        } => compare(&problem, terms, particles),
        Command::Walk {
            problem,
            particles,
            steps,
            seed,
            output,
        } => walk(&problem, particles, steps, seed, output),
        Command::Check {
            expr,
            alpha,
            probe_alpha,
        } => check(&expr, &alpha, probe_alpha),
    }
}

fn solve(
    problem: &ProblemArgs,
    scheme: Option<Scheme>,
    progress: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = problem.resolve()?;
    let grid = config.to_grid()?;
    let scheme = scheme.unwrap_or(config.scheme);
    let stepper = TimeStepper::with_config(scheme, config.stepper);
    let field = stepper.run_with_progress(&grid, progress, |p| {
        tracing::info!(
            step = p.steps_done,
            of = p.num_steps,
            t = p.sim_time,
            max = p.level_max,
            "progress"
        );
    })?;

    let diagnostics = DiagnosticsRecord::collect(&field, &grid, Some(scheme));
    print_grid(&grid);
    print_diagnostics(&diagnostics);
    if let Some(path) = output {
        write_field_json(&path, &field, Some(&diagnostics))?;
    }
    Ok(())
}

fn compare(problem: &ProblemArgs, terms: usize, particles: usize) -> Result<()> {
    let grid = problem.resolve()?.to_grid()?;
    print_grid(&grid);
    let reference = FourierSeries::new(terms).evaluate(&grid)?;

    let mut rows: Vec<(String, Option<f64>)> = Vec::new();
    for scheme in Scheme::ALL {
        let report = stability::validate(&grid, scheme);
        if !report.stable {
            println!("{scheme:>12}: skipped (r = {:.4} above its limit)", report.r);
            continue;
        }
        let field = TimeStepper::new(scheme).run(&grid)?;
        rows.push((scheme.to_string(), field.max_abs_difference(&reference)));
    }
    let mol = MethodOfLines::new().run(&grid)?;
    rows.push(("mol".into(), mol.max_abs_difference(&reference)));
    let green = GreenConvolution::default().evaluate(&grid);
    rows.push(("green".into(), green.max_abs_difference(&reference)));
    let laplace = LaplaceTransform::default().evaluate(&grid)?;
    rows.push(("laplace".into(), laplace.max_abs_difference(&reference)));
    if particles > 0 {
        let walk = ParticleEstimator::new(particles, 0).estimate(&grid)?;
        rows.push(("particles".into(), walk.max_abs_difference(&reference)));
    }

    println!("max |u - fourier| over all samples:");
    for (name, err) in rows {
        match err {
            Some(e) => println!("{name:>12}: {e:.3e}"),
            None => println!("{name:>12}: shape mismatch"),
        }
    }
    Ok(())
}

fn walk(
    problem: &ProblemArgs,
    particles: usize,
    steps: Option<usize>,
    seed: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    let grid = problem.resolve()?.to_grid()?;
    let estimator = ParticleEstimator {
        particle_count: particles,
        step_count: steps,
        seed,
    };
    let field = estimator.estimate(&grid)?;
    print_grid(&grid);
    print_final_level(&field);
    if let Some(path) = output {
        let diagnostics = DiagnosticsRecord::collect(&field, &grid, None);
        write_field_json(&path, &field, Some(&diagnostics))?;
    }
    Ok(())
}

fn check(expr: &str, alpha: &str, probe_alpha: f64) -> Result<()> {
    let u = symbolic::parse(expr)?;
    let alpha_expr = symbolic::parse(alpha)?;
    let report = check_heat_residual(&u, "x", "t", &alpha_expr);
    println!("u           = {u}");
    println!("residual    = {}", report.residual);
    if report.is_exact {
        println!("exact solution of u_t = alpha u_xx");
        return Ok(());
    }
    let mut bindings = Bindings::new();
    for name in alpha_expr.free_symbols() {
        bindings.insert(name, probe_alpha);
    }
    let points: Vec<(f64, f64)> = (0..=4)
        .flat_map(|i| (0..=2).map(move |j| (0.25 * i as f64, 0.5 * j as f64)))
        .collect();
    match report.probe(&bindings, &points) {
        Some(worst) => println!("max |residual| on probe points = {worst:.3e}"),
        None => println!("residual has symbols other than x, t and the diffusivity"),
    }
    bail!("`{expr}` does not solve the heat equation")
}

fn print_grid(grid: &GridSpec) {
    println!(
        "L = {}, alpha = {}, nx = {}, T = {}, nt = {}, r = {:.4}",
        grid.length(),
        grid.alpha(),
        grid.nx(),
        grid.t_end(),
        grid.nt(),
        grid.diffusion_number()
    );
}

fn print_diagnostics(d: &DiagnosticsRecord) {
    if let Some(s) = &d.stability {
        match s.limit {
            Some(limit) => println!("stability: r = {:.4}, limit = {limit}, stable = {}", s.r, s.stable),
            None => println!("stability: r = {:.4}, unconditionally stable", s.r),
        }
    }
    println!("bounds: [{:.6}, {:.6}]", d.bounds.lower, d.bounds.upper);
    println!(
        "maximum principle: max = {:.6}, allowed = {:.6}, violated = {}",
        d.maximum_principle.max_interior, d.maximum_principle.max_allowed, d.maximum_principle.violated
    );
    println!(
        "minimum principle: min = {:.6}, allowed = {:.6}, violated = {}",
        d.minimum_principle.min_interior, d.minimum_principle.min_allowed, d.minimum_principle.violated
    );
    if let (Some(first), Some(last)) = (d.energy.samples.first(), d.energy.samples.last()) {
        println!(
            "energy: {:.6e} -> {:.6e}, non-increasing = {}",
            first.1, last.1, d.energy_decay.monotone
        );
    }
}

fn print_final_level(field: &SolutionField) {
    let (nt, _) = field.shape();
    let t = field.t()[nt - 1];
    println!("u(x, {t}):");
    for (x, u) in field.x().iter().zip(field.row(nt - 1).iter()) {
        println!("  {x:.4}  {u:.6}");
    }
}
