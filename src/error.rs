use thiserror::Error;

use crate::stepper::Scheme;

/// Errors raised by the discretized core and the peer solvers.
///
/// Maximum-principle violations are reported through
/// [`crate::diagnostics::MaxPrincipleVerdict`] instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeatError {
    /// A grid parameter is outside its admissible range.
    #[error("invalid grid spec: {field} {reason}")]
    InvalidGridSpec { field: &'static str, reason: String },

    /// An explicit integrator was asked to run above its stability limit.
    #[error("stability condition not met for {scheme}: r = {r} > {limit}")]
    Stability { scheme: Scheme, r: f64, limit: f64 },

    /// The implicit solve hit a (numerically) zero pivot.
    #[error("singular tridiagonal system at time step {step}, row {row} (pivot = {pivot:e})")]
    SingularSystem { step: usize, row: usize, pivot: f64 },

    /// A caller-imposed step ceiling was reached before the horizon.
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: usize },

    /// A solver parameter outside the grid is invalid.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub type HeatResult<T> = Result<T, HeatError>;
