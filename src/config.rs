//! JSON run configuration.
//!
//! ```json
//! {
//!   "grid": { "length": 1.0, "alpha": 0.01, "nx": 50, "t_end": 1.0, "nt": 200 },
//!   "profile": { "kind": "sine", "mode": 1, "amplitude": 1.0 },
//!   "boundary": { "left": 0.0, "right": 0.0 },
//!   "scheme": "explicit",
//!   "stepper": { "min_parallel_points": 4096, "max_steps": null }
//! }
//! ```
//!
//! Every section is optional. Leaving `nt` out and giving `r_target` derives the
//! time resolution from the stability target.

use std::f64::consts::PI;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::grid::{GridSpec, Profile, MAX_STABLE_TARGET};
use crate::stepper::{Scheme, StepperConfig};
use crate::symbolic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub length: f64,
    pub alpha: f64,
    pub nx: usize,
    pub t_end: f64,
    pub nt: Option<usize>,
    pub r_target: Option<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            length: 1.0,
            alpha: 0.01,
            nx: 50,
            t_end: 1.0,
            nt: Some(200),
            r_target: None,
        }
    }
}

/// Initial temperature profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileConfig {
    /// `amplitude * sin(mode pi x / L)`.
    Sine { mode: u32, amplitude: f64 },
    /// `4 x (L - x) / L^2`, peak 1 at the centre.
    Parabola,
    Constant { value: f64 },
    /// `exp(-((x - center) / width)^2)`.
    Gaussian { center: f64, width: f64 },
    /// Expression in `x`, e.g. `"sin(pi*x) + 0.5*sin(3*pi*x)"`.
    Expression { expr: String },
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig::Sine {
            mode: 1,
            amplitude: 1.0,
        }
    }
}

impl ProfileConfig {
    /// Build the profile for a rod of length `length`.
    pub fn build(&self, length: f64) -> Result<Profile> {
        let profile: Profile = match self.clone() {
            ProfileConfig::Sine { mode, amplitude } => {
                let k = mode as f64 * PI / length;
                Arc::new(move |x| amplitude * (k * x).sin())
            }
            ProfileConfig::Parabola => Arc::new(move |x| 4.0 * x * (length - x) / (length * length)),
            ProfileConfig::Constant { value } => Arc::new(move |_| value),
            ProfileConfig::Gaussian { center, width } => {
                if !(width > 0.0) {
                    bail!("gaussian width must be positive, got {width}");
                }
                Arc::new(move |x| (-((x - center) / width).powi(2)).exp())
            }
            ProfileConfig::Expression { expr } => {
                let parsed = symbolic::parse(&expr)
                    .with_context(|| format!("Failed to parse initial profile `{expr}`"))?;
                let stray: Vec<String> = parsed
                    .free_symbols()
                    .into_iter()
                    .filter(|s| s != "x")
                    .collect();
                if !stray.is_empty() {
                    bail!("initial profile `{expr}` may only use `x`, found {stray:?}");
                }
                Arc::new(move |x| parsed.eval_at("x", x).unwrap_or(f64::NAN))
            }
        };
        Ok(profile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub left: f64,
    pub right: f64,
}

/// Everything needed for one solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub grid: GridConfig,
    pub profile: ProfileConfig,
    pub boundary: BoundaryConfig,
    pub scheme: Scheme,
    pub stepper: StepperConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            profile: ProfileConfig::default(),
            boundary: BoundaryConfig::default(),
            scheme: Scheme::Explicit,
            stepper: StepperConfig::new(),
        }
    }
}

impl RunConfig {
    /// Reads a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config: {}", path.display()))?;
        let config: RunConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse config from string")
    }

    /// Validated grid for this configuration.
    pub fn to_grid(&self) -> Result<GridSpec> {
        let g = &self.grid;
        let builder = GridSpec::builder()
            .length(g.length)
            .alpha(g.alpha)
            .nx(g.nx)
            .t_end(g.t_end)
            .profile(self.profile.build(g.length)?)
            .boundaries(self.boundary.left, self.boundary.right);
        let grid = match (g.nt, g.r_target) {
            (Some(nt), _) => builder.nt(nt).build()?,
            (None, Some(r)) => builder.build_stabilized(r)?,
            (None, None) => builder.build_stabilized(MAX_STABLE_TARGET)?,
        };
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeatError;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_reference_problem() -> Result<()> {
        let grid = RunConfig::default().to_grid()?;
        assert_eq!(grid.nx(), 50);
        assert_eq!(grid.nt(), 200);
        assert!((grid.initial_value(0.5) - 1.0).abs() < 1e-15);
        Ok(())
    }

    #[test]
    fn test_partial_json_fills_defaults() -> Result<()> {
        let config = RunConfig::from_json(
            r#"{
                "grid": { "nx": 21, "nt": null, "r_target": 0.4 },
                "profile": { "kind": "gaussian", "center": 0.5, "width": 0.1 },
                "boundary": { "left": 1.0 },
                "scheme": "rk2"
            }"#,
        )?;
        assert_eq!(config.scheme, Scheme::Rk2);
        assert_eq!(config.boundary, BoundaryConfig { left: 1.0, right: 0.0 });
        let grid = config.to_grid()?;
        assert!(grid.diffusion_number() <= 0.4 + 1e-12);
        assert_eq!(grid.u_left(), 1.0);
        assert!((grid.initial_value(0.5) - 1.0).abs() < 1e-15);
        Ok(())
    }

    #[test]
    fn test_expression_profile() -> Result<()> {
        let profile = ProfileConfig::Expression {
            expr: "sin(pi*x) + 0.5*x".into(),
        }
        .build(1.0)?;
        assert!((profile(0.5) - 1.25).abs() < 1e-15);

        let bad = ProfileConfig::Expression { expr: "a*x".into() };
        assert!(bad.build(1.0).is_err());
        let bad = ProfileConfig::Expression { expr: "sin(".into() };
        assert!(bad.build(1.0).is_err());
        Ok(())
    }

    #[test]
    fn test_expression_undefined_on_grid_is_rejected() -> Result<()> {
        let config = RunConfig::from_json(
            r#"{ "profile": { "kind": "expression", "expr": "sqrt(x - 0.5)" } }"#,
        )?;
        let err = config.to_grid().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HeatError>(),
            Some(HeatError::InvalidGridSpec { field: "u0", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("run.json");
        let mut config = RunConfig::default();
        config.profile = ProfileConfig::Parabola;
        config.scheme = Scheme::Implicit;
        std::fs::write(&path, serde_json::to_string_pretty(&config)?)?;

        let loaded = RunConfig::load(&path)?;
        assert_eq!(loaded, config);
        assert!(RunConfig::load(&dir.path().join("missing.json")).is_err());
        Ok(())
    }
}
