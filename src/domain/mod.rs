//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - validated inputs (`ObservationSet`, `KnotGrid`)
//! - ODE coefficients (`OdeParams`)
//! - estimation outputs (`Estimate`, `SweepPoint`, `EstimateFile`)
//! - the per-command configuration assembled from CLI flags (`FitConfig`,
//!   `SweepConfig` and their shared `RunConfig`)

pub mod types;

pub use types::*;
