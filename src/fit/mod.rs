//! Parameter estimation.
//!
//! Responsibilities:
//!
//! - pack `(a, b, coefficients)` into one joint vector
//! - evaluate the collocation cost (data misfit + ODE residual)
//! - minimize it (L-BFGS or Nelder-Mead)
//! - sweep the regularization weight (parallel)

pub mod estimator;
pub mod knots;
pub mod layout;
pub mod objective;
pub mod optimizer;
pub mod residual;
pub mod sweep;

pub use estimator::*;
pub use knots::*;
pub use layout::*;
pub use objective::*;
pub use optimizer::*;
pub use residual::*;
pub use sweep::*;
