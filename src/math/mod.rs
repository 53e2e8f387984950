//! Numerical building blocks: cubic spline interpolation and adaptive quadrature.

pub mod quadrature;
pub mod spline;

pub use quadrature::*;
pub use spline::*;
