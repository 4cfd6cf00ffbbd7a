//! Symbolic check that a closed-form candidate satisfies `u_t = alpha u_xx`.
//!
//! Independent of the grid and the steppers: expressions are parsed, differentiated
//! and reduced to a sum-of-monomials normal form in which an exact solution leaves
//! no terms.

pub mod canon;
pub mod expr;
pub mod parse;
pub mod residual;

pub use canon::{canonicalize, is_identically_zero};
pub use expr::{differentiate, simplify, Bindings, Expr, Func};
pub use parse::{parse, ParseError};
pub use residual::{check_heat_residual, ResidualReport};
