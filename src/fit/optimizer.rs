//! Unconstrained local minimization of the joint parameter vector.
//!
//! Both methods run on `argmin`:
//!
//! - **L-BFGS** (default): limited-memory quasi-Newton with a More–Thuente line
//!   search. Gradients are central finite differences from `finitediff`, with a
//!   forward-difference fallback. Stops when the gradient L2 norm is below the
//!   tolerance, or when the cost stops changing.
//! - **Nelder–Mead**: derivative-free simplex search with dimension-adaptive
//!   coefficients. Stops when the standard deviation of the simplex values is
//!   below the tolerance. A converged simplex is rebuilt around its best vertex
//!   and searched again until a restart no longer improves the cost.
//!
//! Running out of iterations is not an error: the best iterate is returned with
//! `converged = false`. Non-finite objective values at trial points count as
//! "worse"; errors returned by the objective abort the run.
//!
//! There is no global-optimality guarantee. The answer depends on the initial
//! guess.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use argmin::core::observers::{Observe, ObserverMode};
use argmin::core::{
    CostFunction, Error as SolverError, Executor, Gradient, State, TerminationReason,
    TerminationStatus, KV,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::neldermead::NelderMead;
use argmin::solver::quasinewton::LBFGS;
use argmin_math::ArgminL2Norm;
use finitediff::FiniteDiff;
use thiserror::Error;

use crate::domain::{Method, Termination};
use crate::error::EstimateError;

type Point = Vec<f64>;

type MoreThuente = MoreThuenteLineSearch<Point, Point, f64>;

type Lbfgs = LBFGS<MoreThuente, Point, Point, f64>;

/// Curvature pairs kept by L-BFGS.
const LBFGS_MEMORY: usize = 7;

/// Relative perturbation for the initial Nelder–Mead simplex.
const SIMPLEX_NONZERO_DELTA: f64 = 0.05;
/// Absolute perturbation used for zero coordinates.
const SIMPLEX_ZERO_DELTA: f64 = 0.00025;

/// Upper bound on simplex rebuilds within one run.
const MAX_RESTARTS: usize = 100;

/// Configuration for [`minimize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerConfig {
    method: Method,
    max_iterations: usize,
    tolerance: f64,
}

/// Errors that can occur when validating an optimizer config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tolerance must be finite and non-negative")]
    Tolerance,
}

impl From<ConfigError> for EstimateError {
    fn from(err: ConfigError) -> Self {
        EstimateError::invalid_domain(err.to_string())
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            method: Method::Bfgs,
            max_iterations: 2000,
            tolerance: 1e-5,
        }
    }
}

impl OptimizerConfig {
    /// Creates a new config with a validated tolerance.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is negative or non-finite.
    pub fn new(method: Method, max_iterations: usize, tolerance: f64) -> Result<Self, ConfigError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Tolerance);
        }
        Ok(Self {
            method,
            max_iterations,
            tolerance,
        })
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

/// Best point found by [`minimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub params: Vec<f64>,
    pub cost: f64,
    pub converged: bool,
    pub termination: Termination,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Minimize `objective` starting from `initial_guess`.
///
/// # Errors
///
/// `InvalidDomain` if the initial guess is empty, non-finite or has a
/// non-finite cost. Any error returned by `objective` is propagated as-is.
pub fn minimize<F>(
    objective: F,
    initial_guess: &[f64],
    config: &OptimizerConfig,
) -> Result<Minimum, EstimateError>
where
    F: Fn(&[f64]) -> Result<f64, EstimateError>,
{
    if initial_guess.is_empty() {
        return Err(EstimateError::invalid_domain("initial guess is empty"));
    }
    if initial_guess.iter().any(|v| !v.is_finite()) {
        return Err(EstimateError::invalid_domain("initial guess is not finite"));
    }

    let evaluations = AtomicUsize::new(0);
    let problem = Problem::new(&objective, &evaluations);
    let initial_cost = problem.evaluate(initial_guess)?;
    if !initial_cost.is_finite() {
        return Err(EstimateError::invalid_domain(
            "objective is not finite at the initial guess",
        ));
    }
    let start = Iterate {
        params: initial_guess.to_vec(),
        cost: initial_cost,
    };

    let outcome = match config.method {
        Method::Bfgs => run_lbfgs(problem, start, config)?,
        Method::NelderMead => run_nelder_mead(&objective, &evaluations, start, config)?,
    };

    let evaluations = evaluations.load(Ordering::Relaxed);
    let Outcome {
        best,
        termination,
        iterations,
    } = outcome;
    if termination.is_converged() {
        log::info!(
            "{} converged after {iterations} iterations ({evaluations} evaluations): cost={:.6e}",
            config.method.display_name(),
            best.cost
        );
    } else {
        log::warn!(
            "{} stopped without converging after {iterations} iterations: {}",
            config.method.display_name(),
            termination.describe()
        );
    }

    Ok(Minimum {
        params: best.params,
        cost: best.cost,
        converged: termination.is_converged(),
        termination,
        iterations,
        evaluations,
    })
}

#[derive(Debug, Clone, PartialEq)]
struct Iterate {
    params: Point,
    cost: f64,
}

#[derive(Debug)]
struct Outcome {
    best: Iterate,
    termination: Termination,
    iterations: usize,
}

/// The objective as an `argmin` problem.
struct Problem<'a, F> {
    objective: &'a F,
    evaluations: &'a AtomicUsize,
}

impl<'a, F> Problem<'a, F>
where
    F: Fn(&[f64]) -> Result<f64, EstimateError>,
{
    fn new(objective: &'a F, evaluations: &'a AtomicUsize) -> Self {
        Self {
            objective,
            evaluations,
        }
    }

    /// Evaluate, mapping non-finite costs to `+∞`.
    fn evaluate(&self, x: &[f64]) -> Result<f64, EstimateError> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let v = (self.objective)(x)?;
        Ok(if v.is_finite() { v } else { f64::INFINITY })
    }
}

impl<F> CostFunction for Problem<'_, F>
where
    F: Fn(&[f64]) -> Result<f64, EstimateError>,
{
    type Param = Point;
    type Output = f64;

    fn cost(&self, x: &Point) -> Result<f64, SolverError> {
        Ok(self.evaluate(x)?)
    }
}

impl<F> Gradient for Problem<'_, F>
where
    F: Fn(&[f64]) -> Result<f64, EstimateError>,
{
    type Param = Point;
    type Gradient = Point;

    fn gradient(&self, x: &Point) -> Result<Point, SolverError> {
        // finitediff wants a plain `f64`, so the first error is parked here.
        let failure: RefCell<Option<EstimateError>> = RefCell::new(None);
        let cost = |p: &Point| -> f64 {
            match self.evaluate(p) {
                Ok(v) => v,
                Err(err) => {
                    let mut slot = failure.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                    f64::NAN
                }
            }
        };

        let mut grad = x.central_diff(&cost);
        if failure.borrow().is_none() && grad.iter().any(|g| !g.is_finite()) {
            grad = x.forward_diff(&cost);
        }
        if let Some(err) = failure.into_inner() {
            return Err(err.into());
        }
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(SolverError::msg("finite-difference gradient is not finite"));
        }
        Ok(grad)
    }
}

/// Per-iteration debug log that also remembers the best iterate, so a solver
/// error can still hand back the progress made so far.
#[derive(Clone)]
struct ProgressLog {
    label: &'static str,
    progress: Arc<Mutex<Progress>>,
}

#[derive(Debug, Clone, Default)]
struct Progress {
    iterations: usize,
    best: Option<Iterate>,
}

impl ProgressLog {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            progress: Arc::new(Mutex::new(Progress::default())),
        }
    }

    fn snapshot(&self) -> Progress {
        self.progress
            .lock()
            .map(|progress| progress.clone())
            .unwrap_or_default()
    }
}

impl<I> Observe<I> for ProgressLog
where
    I: State<Param = Point, Float = f64>,
{
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), SolverError> {
        log::debug!(
            "{} iter={} cost={:.10e} best={:.10e}",
            self.label,
            state.get_iter(),
            state.get_cost(),
            state.get_best_cost()
        );
        if let Ok(mut progress) = self.progress.lock() {
            progress.iterations += 1;
            if let Some(params) = state.get_best_param() {
                progress.best = Some(Iterate {
                    params: params.clone(),
                    cost: state.get_best_cost(),
                });
            }
        }
        Ok(())
    }
}

fn run_lbfgs<F>(
    problem: Problem<'_, F>,
    start: Iterate,
    config: &OptimizerConfig,
) -> Result<Outcome, EstimateError>
where
    F: Fn(&[f64]) -> Result<f64, EstimateError>,
{
    let solver = Lbfgs::new(MoreThuente::new(), LBFGS_MEMORY)
        .with_tolerance_grad(config.tolerance)
        .map_err(solver_setup)?;
    let observer = ProgressLog::new("l-bfgs");

    let initial = start.params.clone();
    let result = Executor::new(problem, solver)
        .configure(|state| state.param(initial).max_iters(config.max_iterations as u64))
        .add_observer(observer.clone(), ObserverMode::Always)
        .run();

    let result = match result {
        Ok(result) => result,
        Err(err) => return stalled(err, &observer, start),
    };
    let state = result.state();
    let termination = match state.get_termination_status() {
        TerminationStatus::Terminated(TerminationReason::SolverConverged) => {
            let small_gradient = state
                .get_gradient()
                .is_some_and(|g| g.l2_norm() < config.tolerance);
            if small_gradient {
                Termination::GradientTolerance
            } else {
                Termination::CostTolerance
            }
        }
        TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
            Termination::MaxIterations
        }
        _ => Termination::Stalled,
    };

    Ok(Outcome {
        best: best_of(state, start),
        termination,
        iterations: state.get_iter() as usize,
    })
}

fn run_nelder_mead<F>(
    objective: &F,
    evaluations: &AtomicUsize,
    start: Iterate,
    config: &OptimizerConfig,
) -> Result<Outcome, EstimateError>
where
    F: Fn(&[f64]) -> Result<f64, EstimateError>,
{
    let mut best = start;
    let mut iterations = 0;

    for restart in 0..=MAX_RESTARTS {
        let remaining = config.max_iterations.saturating_sub(iterations);
        if restart > 0 && remaining == 0 {
            break;
        }
        let solver = adaptive_simplex(&best.params, config.tolerance)?;
        let observer = ProgressLog::new("nelder-mead");

        let result = Executor::new(Problem::new(objective, evaluations), solver)
            .configure(|state| state.max_iters(remaining as u64))
            .add_observer(observer.clone(), ObserverMode::Always)
            .run();

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                let mut outcome = stalled(err, &observer, best)?;
                outcome.iterations += iterations;
                return Ok(outcome);
            }
        };
        let state = result.state();
        iterations += state.get_iter() as usize;
        let previous_cost = best.cost;
        best = best_of(state, best);

        match state.get_termination_status() {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {}
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                return Ok(Outcome {
                    best,
                    termination: Termination::MaxIterations,
                    iterations,
                });
            }
            _ => {
                return Ok(Outcome {
                    best,
                    termination: Termination::Stalled,
                    iterations,
                });
            }
        }

        if previous_cost - best.cost <= config.tolerance {
            break;
        }
        log::debug!(
            "nelder-mead restart {} from cost={:.10e}",
            restart + 1,
            best.cost
        );
    }

    Ok(Outcome {
        best,
        termination: Termination::SimplexTolerance,
        iterations,
    })
}

/// Simplex around `center` with the Gao–Han coefficients for its dimension.
///
/// Contraction is capped at one half.
fn adaptive_simplex(center: &[f64], tolerance: f64) -> Result<NelderMead<Point, f64>, EstimateError> {
    let n = center.len() as f64;
    let mut vertices = Vec::with_capacity(center.len() + 1);
    vertices.push(center.to_vec());
    for i in 0..center.len() {
        let mut vertex = center.to_vec();
        vertex[i] = if vertex[i] != 0.0 {
            vertex[i] * (1.0 + SIMPLEX_NONZERO_DELTA)
        } else {
            SIMPLEX_ZERO_DELTA
        };
        vertices.push(vertex);
    }

    NelderMead::new(vertices)
        .with_sd_tolerance(tolerance)
        .and_then(|nm| nm.with_alpha(1.0))
        .and_then(|nm| nm.with_gamma(1.0 + 2.0 / n))
        .and_then(|nm| nm.with_rho((0.75 - 0.5 / n).min(0.5)))
        .and_then(|nm| nm.with_sigma((1.0 - 1.0 / n).max(0.5)))
        .map_err(solver_setup)
}

fn best_of<I>(state: &I, fallback: Iterate) -> Iterate
where
    I: State<Param = Point, Float = f64>,
{
    match state.get_best_param() {
        Some(params) if state.get_best_cost() <= fallback.cost => Iterate {
            params: params.clone(),
            cost: state.get_best_cost(),
        },
        _ => fallback,
    }
}

/// Objective errors propagate. Any other solver error ends the run with the
/// best iterate seen so far.
fn stalled(
    err: SolverError,
    observer: &ProgressLog,
    start: Iterate,
) -> Result<Outcome, EstimateError> {
    let err = match err.downcast::<EstimateError>() {
        Ok(objective_error) => return Err(objective_error),
        Err(err) => err,
    };
    log::warn!("{} stopped early: {err}", observer.label);

    let progress = observer.snapshot();
    let best = match progress.best {
        Some(best) if best.cost <= start.cost => best,
        _ => start,
    };
    Ok(Outcome {
        best,
        termination: Termination::Stalled,
        iterations: progress.iterations,
    })
}

fn solver_setup(err: SolverError) -> EstimateError {
    EstimateError::invalid_domain(format!("invalid solver settings: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rosenbrock(x: &[f64]) -> Result<f64, EstimateError> {
        Ok((1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2))
    }

    fn bowl(x: &[f64]) -> Result<f64, EstimateError> {
        Ok((x[0] - 1.0).powi(2) + 10.0 * (x[1] + 2.0).powi(2))
    }

    fn quadrature_failure() -> EstimateError {
        EstimateError::QuadratureFailure {
            start: 0.0,
            end: 1.0,
            error_estimate: 1.0,
            subdivisions: 50,
        }
    }

    #[test]
    fn lbfgs_minimizes_rosenbrock() {
        let config = OptimizerConfig::new(Method::Bfgs, 200, 1e-6).unwrap();
        let min = minimize(rosenbrock, &[-1.2, 1.0], &config).unwrap();
        assert!(min.converged, "{:?}", min.termination);
        assert!((min.params[0] - 1.0).abs() < 1e-4, "x = {:?}", min.params);
        assert!((min.params[1] - 1.0).abs() < 1e-4, "x = {:?}", min.params);
        assert!(min.cost < 1e-6);
    }

    #[test]
    fn nelder_mead_minimizes_bowl_and_rosenbrock() {
        let config = OptimizerConfig::new(Method::NelderMead, 5000, 1e-12).unwrap();

        let min = minimize(bowl, &[0.0, 0.0], &config).unwrap();
        assert!(min.converged);
        assert_eq!(min.termination, Termination::SimplexTolerance);
        assert!((min.params[0] - 1.0).abs() < 1e-4, "x = {:?}", min.params);
        assert!((min.params[1] + 2.0).abs() < 1e-4, "x = {:?}", min.params);

        let min = minimize(rosenbrock, &[-1.2, 1.0], &config).unwrap();
        assert!(min.converged);
        assert!((min.params[0] - 1.0).abs() < 1e-3, "x = {:?}", min.params);
        assert!((min.params[1] - 1.0).abs() < 1e-3, "x = {:?}", min.params);
    }

    #[test]
    fn simplex_coefficients_adapt_to_dimension() {
        // A stretched 12-dimensional bowl, the size of a 10-knot fit.
        let stretched = |x: &[f64]| -> Result<f64, EstimateError> {
            Ok(x
                .iter()
                .enumerate()
                .map(|(i, v)| (1.0 + i as f64) * (v - 1.0).powi(2))
                .sum())
        };
        let config = OptimizerConfig::new(Method::NelderMead, 50_000, 1e-14).unwrap();
        let min = minimize(stretched, &[0.5; 12], &config).unwrap();
        assert!(min.converged, "{:?}", min.termination);
        for (i, v) in min.params.iter().enumerate() {
            assert!((v - 1.0).abs() < 1e-3, "x[{i}] = {v}");
        }
    }

    #[test]
    fn exhausted_budget_returns_best_iterate_unconverged() {
        let start = [-1.2, 1.0];
        let f0 = rosenbrock(&start).unwrap();
        for method in [Method::Bfgs, Method::NelderMead] {
            let config = OptimizerConfig::new(method, 2, 1e-12).unwrap();
            let min = minimize(rosenbrock, &start, &config).unwrap();
            assert!(!min.converged);
            assert_eq!(min.termination, Termination::MaxIterations);
            assert_eq!(min.iterations, 2);
            assert!(min.cost <= f0);
            assert!(min.evaluations > 0);
        }
    }

    #[test]
    fn objective_errors_abort_the_run() {
        let failing = |_: &[f64]| -> Result<f64, EstimateError> { Err(quadrature_failure()) };
        let result = minimize(failing, &[1.0], &OptimizerConfig::default());
        assert!(matches!(result, Err(EstimateError::QuadratureFailure { .. })));
    }

    #[test]
    fn objective_errors_inside_the_solver_abort_the_run() {
        // Fine at the start, fails once the solver moves away from it.
        let fails_away_from_start = |x: &[f64]| -> Result<f64, EstimateError> {
            if (x[0] - 3.0).abs() > 1e-3 {
                Err(quadrature_failure())
            } else {
                Ok(x[0] * x[0])
            }
        };
        for method in [Method::Bfgs, Method::NelderMead] {
            let config = OptimizerConfig::new(method, 100, 1e-8).unwrap();
            let result = minimize(fails_away_from_start, &[3.0], &config);
            assert!(
                matches!(result, Err(EstimateError::QuadratureFailure { .. })),
                "{method:?}: {result:?}"
            );
        }
    }

    #[test]
    fn non_finite_trial_points_are_treated_as_worse() {
        // Undefined for x < 0; the minimum sits at x = 0.5.
        let guarded = |x: &[f64]| -> Result<f64, EstimateError> {
            if x[0] < 0.0 {
                Ok(f64::NAN)
            } else {
                Ok((x[0] - 0.5).powi(2))
            }
        };
        let config = OptimizerConfig::new(Method::NelderMead, 1000, 1e-12).unwrap();
        let min = minimize(guarded, &[3.0], &config).unwrap();
        assert!(min.converged);
        assert!((min.params[0] - 0.5).abs() < 1e-4, "x = {:?}", min.params);
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert!(matches!(
            minimize(bowl, &[], &OptimizerConfig::default()),
            Err(EstimateError::InvalidDomain(_))
        ));
        assert!(matches!(
            minimize(bowl, &[f64::NAN, 0.0], &OptimizerConfig::default()),
            Err(EstimateError::InvalidDomain(_))
        ));
        assert_eq!(
            OptimizerConfig::new(Method::Bfgs, 10, -1.0),
            Err(ConfigError::Tolerance)
        );
    }
}
