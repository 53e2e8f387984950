//! `ode-collocation` library crate.
//!
//! Estimates `(a, b)` in `dy/dt = a·y + b` from noisy samples by fitting a cubic
//! spline to the data while penalizing its ODE residual.
//!
//! The binary (`odefit`) is a thin wrapper around this library so the
//! estimation core is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
