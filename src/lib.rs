pub mod closed_form;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod grid;
pub mod io;
pub mod mol;
pub mod stability;
pub mod stepper;
pub mod stochastic;
pub mod symbolic;
pub mod tridiag;

// Prelude
pub use closed_form::{analytic_sine_mode, FourierSeries, GreenConvolution, LaplaceTransform};
pub use config::RunConfig;
pub use error::{HeatError, HeatResult};
pub use field::SolutionField;
pub use grid::{GridBuilder, GridSpec, Profile};
pub use mol::MethodOfLines;
pub use stability::StabilityReport;
pub use stepper::{Scheme, StepProgress, StepperConfig, TimeStepper};
pub use stochastic::{DensityWalk, ParticleEstimator};
pub use tridiag::TridiagonalSystem;
