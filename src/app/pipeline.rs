//! Shared estimation pipeline used by the `fit` and `sweep` commands.
//!
//! load/generate observations -> knot grid -> estimate (or sweep) -> fitted points
//!
//! The command handlers then only deal with presentation and exports.

use crate::data::{SyntheticConfig, generate_observations};
use crate::domain::{
    DataSource, Estimate, FitConfig, FittedPoint, ObservationSet, OdeParams, RunConfig, SweepConfig,
    SweepPoint,
};
use crate::error::{AppError, EstimateError};
use crate::fit::{EstimateOptions, InitialGuess, OptimizerConfig, estimate, knots_for, sweep_lambda};
use crate::math::QuadratureConfig;

/// Observations plus what is known about where they came from.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub observations: ObservationSet,
    /// Generating parameters when the data is synthetic.
    pub truth: Option<OdeParams>,
    /// Short description for the report header.
    pub label: String,
}

/// All computed outputs of a single `odefit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub data: LoadedData,
    pub estimate: Estimate,
    pub fitted: Vec<FittedPoint>,
}

/// All computed outputs of an `odefit sweep` run.
#[derive(Debug, Clone)]
pub struct SweepOutput {
    pub data: LoadedData,
    pub points: Vec<SweepPoint>,
}

/// Execute one estimation and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let data = load_data(&config.run.source)?;
    let knots = knots_for(&data.observations, config.run.knot_count)?;
    let initial = initial_guess(&config.run);
    let options = estimate_options(&config.run)?;

    let estimate = estimate(&data.observations, &knots, config.lambda_reg, &initial, &options)?;
    let fitted = crate::report::compute_fitted_points(&estimate, &data.observations)?;

    Ok(RunOutput {
        data,
        estimate,
        fitted,
    })
}

/// Execute one estimation per configured lambda value.
pub fn run_sweep(config: &SweepConfig) -> Result<SweepOutput, AppError> {
    let data = load_data(&config.run.source)?;
    let knots = knots_for(&data.observations, config.run.knot_count)?;
    let initial = initial_guess(&config.run);
    let options = estimate_options(&config.run)?;

    let points = sweep_lambda(&data.observations, &knots, &config.lambdas, &initial, &options)?;
    Ok(SweepOutput { data, points })
}

pub fn load_data(source: &DataSource) -> Result<LoadedData, AppError> {
    match source {
        DataSource::Synthetic(synthetic) => load_synthetic(synthetic),
        DataSource::Csv(path) => Ok(LoadedData {
            observations: crate::io::load_observations(path)?,
            truth: None,
            label: path.display().to_string(),
        }),
    }
}

fn load_synthetic(config: &SyntheticConfig) -> Result<LoadedData, AppError> {
    let generated = generate_observations(config)?;
    Ok(LoadedData {
        observations: generated.observations,
        truth: Some(generated.params),
        label: format!(
            "synthetic (a={}, b={}, y0={}, sigma={}, seed={})",
            config.a, config.b, config.y0, config.noise_sigma, config.seed
        ),
    })
}

fn initial_guess(config: &RunConfig) -> InitialGuess {
    InitialGuess::uniform(
        OdeParams::new(config.initial_a, config.initial_b),
        config.initial_coefficient,
        config.knot_count,
    )
}

fn estimate_options(config: &RunConfig) -> Result<EstimateOptions, AppError> {
    let optimizer = OptimizerConfig::new(config.method, config.max_iterations, config.tolerance)
        .map_err(EstimateError::from)?;
    Ok(EstimateOptions {
        optimizer,
        quadrature: QuadratureConfig::default(),
    })
}
