//! Regularization trade-off sweep.
//!
//! Re-estimates the model once per `lambda_reg` value, each run starting from
//! the same initial guess. Runs are independent, so they are evaluated in
//! parallel; results come back in the order of `lambdas`.
//!
//! Larger `lambda_reg` pushes the spline toward the ODE: the ODE term should
//! shrink and the data term should grow.

use rayon::prelude::*;

use crate::domain::{KnotGrid, ObservationSet, SweepPoint};
use crate::error::EstimateError;
use crate::fit::estimator::{EstimateOptions, InitialGuess, estimate};

pub fn sweep_lambda(
    observations: &ObservationSet,
    knots: &KnotGrid,
    lambdas: &[f64],
    initial: &InitialGuess,
    options: &EstimateOptions,
) -> Result<Vec<SweepPoint>, EstimateError> {
    if lambdas.is_empty() {
        return Err(EstimateError::invalid_domain("lambda sweep needs at least one value"));
    }

    lambdas
        .par_iter()
        .map(|&lambda_reg| {
            let est = estimate(observations, knots, lambda_reg, initial, options)?;
            Ok(SweepPoint {
                lambda_reg,
                params: est.params,
                data_term: est.data_term,
                ode_term: est.ode_term,
                cost: est.cost,
                converged: est.converged,
            })
        })
        .collect()
}
