//! Estimation driver.
//!
//! Validates the inputs, packs the initial guess, binds the collocation
//! objective, runs the optimizer and unpacks the answer into an [`Estimate`].
//!
//! Malformed inputs fail before the first objective evaluation. A quadrature
//! failure during the run aborts it; no partial result is returned.

use crate::domain::{Estimate, KnotGrid, ObservationSet, OdeParams};
use crate::error::EstimateError;
use crate::fit::objective::CollocationObjective;
use crate::fit::optimizer::{OptimizerConfig, minimize};
use crate::math::QuadratureConfig;

/// Starting point for the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialGuess {
    pub params: OdeParams,
    /// One value per knot.
    pub coefficients: Vec<f64>,
}

impl InitialGuess {
    /// Same starting value for every spline coefficient.
    pub fn uniform(params: OdeParams, coefficient: f64, knot_count: usize) -> Self {
        Self {
            params,
            coefficients: vec![coefficient; knot_count],
        }
    }

    /// `a = 1`, `b = 1`, all coefficients `1`.
    pub fn ones(knot_count: usize) -> Self {
        Self::uniform(OdeParams::new(1.0, 1.0), 1.0, knot_count)
    }
}

/// Settings shared by every estimation run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EstimateOptions {
    pub optimizer: OptimizerConfig,
    pub quadrature: QuadratureConfig,
}

/// Fit `(a, b)` and the spline coefficients to `observations`.
pub fn estimate(
    observations: &ObservationSet,
    knots: &KnotGrid,
    lambda_reg: f64,
    initial: &InitialGuess,
    options: &EstimateOptions,
) -> Result<Estimate, EstimateError> {
    let objective = CollocationObjective::new(observations, knots, lambda_reg, options.quadrature)?;
    let layout = objective.layout();
    let guess = layout.pack(initial.params, &initial.coefficients)?;

    log::info!(
        "estimating with {} observations, {} knots on [{}, {}], lambda_reg={lambda_reg}",
        observations.len(),
        knots.len(),
        knots.first(),
        knots.last()
    );

    let initial_cost = objective.cost(&guess)?;
    log::debug!("initial cost: {initial_cost:.6e}");

    let minimum = minimize(|joint| objective.cost(joint), &guess, &options.optimizer)?;

    let joint = layout.unpack(&minimum.params)?;
    let breakdown = objective.breakdown(&minimum.params)?;
    log::info!(
        "estimated a={:.6} b={:.6} (data={:.6e}, ode={:.6e}, converged={})",
        joint.ode.a,
        joint.ode.b,
        breakdown.data_term,
        breakdown.ode_term,
        minimum.converged
    );

    Ok(Estimate {
        params: joint.ode,
        knots: knots.clone(),
        coefficients: joint.coefficients.to_vec(),
        lambda_reg,
        cost: breakdown.total,
        data_term: breakdown.data_term,
        ode_term: breakdown.ode_term,
        converged: minimum.converged,
        termination: minimum.termination,
        method: options.optimizer.method(),
        iterations: minimum.iterations,
        evaluations: objective.evaluations(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SyntheticConfig, generate_observations};
    use crate::domain::Method;
    use crate::fit::knots::uniform_knots;

    #[test]
    fn recovers_parameters_from_noisy_synthetic_data() {
        let data = generate_observations(&SyntheticConfig::default()).unwrap();
        let knots = uniform_knots(0.0, 10.0, 10).unwrap();
        let initial = InitialGuess::ones(knots.len());

        let est = estimate(
            &data.observations,
            &knots,
            0.1,
            &initial,
            &EstimateOptions::default(),
        )
        .unwrap();

        assert!(est.cost.is_finite());
        assert!((est.params.a - 0.5).abs() < 0.05, "a = {}", est.params.a);
        assert!((est.params.b - 2.0).abs() < 0.3, "b = {}", est.params.b);
        // Much closer to the truth than the starting point (1, 1).
        assert!((est.params.a - 0.5).abs() < 0.25 * (1.0_f64 - 0.5).abs());
        assert!((est.params.b - 2.0).abs() < 0.5 * (1.0_f64 - 2.0).abs());
        assert_eq!(est.coefficients.len(), knots.len());
        assert!(est.evaluations > est.iterations);
    }

    #[test]
    fn recovery_holds_across_noise_seeds() {
        let knots = uniform_knots(0.0, 10.0, 10).unwrap();
        for seed in [1, 7, 2024] {
            let config = SyntheticConfig {
                seed,
                ..SyntheticConfig::default()
            };
            let data = generate_observations(&config).unwrap();
            let est = estimate(
                &data.observations,
                &knots,
                0.1,
                &InitialGuess::ones(knots.len()),
                &EstimateOptions::default(),
            )
            .unwrap();
            assert!((est.params.a - 0.5).abs() < 0.05, "seed {seed}: a = {}", est.params.a);
            assert!((est.params.b - 2.0).abs() < 0.3, "seed {seed}: b = {}", est.params.b);
        }
    }

    #[test]
    fn nelder_mead_recovers_parameters_without_stagnating() {
        let data = generate_observations(&SyntheticConfig::default()).unwrap();
        let knots = uniform_knots(0.0, 10.0, 10).unwrap();
        let options = EstimateOptions {
            optimizer: OptimizerConfig::new(Method::NelderMead, 50_000, 1e-10).unwrap(),
            ..EstimateOptions::default()
        };

        let est = estimate(
            &data.observations,
            &knots,
            0.1,
            &InitialGuess::ones(knots.len()),
            &options,
        )
        .unwrap();

        assert_eq!(est.method, Method::NelderMead);
        assert!((est.params.a - 0.5).abs() < 0.05, "a = {}", est.params.a);
        assert!((est.params.b - 2.0).abs() < 0.5, "b = {}", est.params.b);
    }

    #[test]
    fn zero_lambda_fits_data_and_leaves_ode_params_untouched() {
        let data = generate_observations(&SyntheticConfig::default()).unwrap();
        let knots = uniform_knots(0.0, 10.0, 10).unwrap();
        let initial = InitialGuess::ones(knots.len());

        let est = estimate(
            &data.observations,
            &knots,
            0.0,
            &initial,
            &EstimateOptions::default(),
        )
        .unwrap();

        // Without the ODE term the cost does not depend on (a, b).
        assert_eq!(est.params, initial.params);
        assert_eq!(est.cost, est.data_term);
        assert!(est.ode_term > 0.0);
        assert!(est.data_term < 1.0, "data term {}", est.data_term);
    }

    #[test]
    fn malformed_inputs_fail_before_optimizing() {
        let data = generate_observations(&SyntheticConfig::default()).unwrap();
        let knots = uniform_knots(0.0, 10.0, 10).unwrap();
        let options = EstimateOptions::default();

        let short = InitialGuess::ones(knots.len() - 1);
        assert!(matches!(
            estimate(&data.observations, &knots, 0.1, &short, &options),
            Err(EstimateError::InvalidDomain(_))
        ));

        let initial = InitialGuess::ones(knots.len());
        assert!(matches!(
            estimate(&data.observations, &knots, -0.1, &initial, &options),
            Err(EstimateError::InvalidDomain(_))
        ));
    }

    #[test]
    fn quadrature_failure_aborts_the_run() {
        let data = generate_observations(&SyntheticConfig::default()).unwrap();
        let knots = uniform_knots(0.0, 10.0, 10).unwrap();
        let options = EstimateOptions {
            quadrature: QuadratureConfig {
                abs_tol: 0.0,
                rel_tol: 0.0,
                max_subdivisions: 0,
            },
            ..EstimateOptions::default()
        };
        // A curved starting spline so no piece integrates without rounding error.
        let initial = InitialGuess {
            params: OdeParams::new(1.0, 1.0),
            coefficients: knots.as_slice().iter().map(|&t| (0.3 * t).exp()).collect(),
        };
        let result = estimate(&data.observations, &knots, 0.1, &initial, &options);
        assert!(matches!(result, Err(EstimateError::QuadratureFailure { .. })));
    }
}
