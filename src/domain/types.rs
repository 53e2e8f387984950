//! Shared domain types.
//!
//! These types are lightweight and serializable so they can be:
//!
//! - used in-memory during estimation
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EstimateError;

/// Noisy samples of the unknown trajectory.
///
/// Times are strictly increasing and every value is finite. The set is never
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl ObservationSet {
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self, EstimateError> {
        if times.is_empty() {
            return Err(EstimateError::invalid_domain("observation set is empty"));
        }
        if times.len() != values.len() {
            return Err(EstimateError::invalid_domain(format!(
                "observation length mismatch: {} times vs {} values",
                times.len(),
                values.len()
            )));
        }
        ensure_strictly_increasing("observation times", &times)?;
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(EstimateError::invalid_domain(format!(
                "observation value #{i} is not finite"
            )));
        }
        Ok(Self { times, values })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// `(min, max)` observation time.
    pub fn span(&self) -> (f64, f64) {
        (self.times[0], self.times[self.times.len() - 1])
    }
}

/// Fixed spline knot positions (at least two, strictly increasing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct KnotGrid {
    knots: Vec<f64>,
}

impl KnotGrid {
    pub fn new(knots: Vec<f64>) -> Result<Self, EstimateError> {
        if knots.len() < 2 {
            return Err(EstimateError::invalid_domain(format!(
                "knot grid needs at least 2 knots, got {}",
                knots.len()
            )));
        }
        ensure_strictly_increasing("knots", &knots)?;
        Ok(Self { knots })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.knots
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.knots[0]
    }

    pub fn last(&self) -> f64 {
        self.knots[self.knots.len() - 1]
    }
}

impl TryFrom<Vec<f64>> for KnotGrid {
    type Error = EstimateError;

    fn try_from(knots: Vec<f64>) -> Result<Self, Self::Error> {
        KnotGrid::new(knots)
    }
}

impl From<KnotGrid> for Vec<f64> {
    fn from(grid: KnotGrid) -> Self {
        grid.knots
    }
}

/// Fail with `InvalidDomain` unless `xs` is finite and strictly increasing.
pub fn ensure_strictly_increasing(label: &str, xs: &[f64]) -> Result<(), EstimateError> {
    if let Some(i) = xs.iter().position(|x| !x.is_finite()) {
        return Err(EstimateError::invalid_domain(format!(
            "{label}: entry #{i} is not finite"
        )));
    }
    if let Some(i) = xs.windows(2).position(|w| w[1] <= w[0]) {
        return Err(EstimateError::invalid_domain(format!(
            "{label} must be strictly increasing (entry #{} = {} follows {})",
            i + 1,
            xs[i + 1],
            xs[i]
        )));
    }
    Ok(())
}

/// Coefficients of `dy/dt = a·y + b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OdeParams {
    pub a: f64,
    pub b: f64,
}

impl OdeParams {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Right-hand side `a·y + b`.
    pub fn rhs(&self, y: f64) -> f64 {
        self.a * y + self.b
    }
}

/// Unconstrained local minimizer to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Limited-memory quasi-Newton with finite-difference gradients.
    Bfgs,
    /// Derivative-free downhill simplex.
    NelderMead,
}

impl Method {
    pub fn display_name(self) -> &'static str {
        match self {
            Method::Bfgs => "L-BFGS",
            Method::NelderMead => "Nelder-Mead",
        }
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Gradient L2 norm dropped below the tolerance.
    GradientTolerance,
    /// The cost stopped changing between iterations.
    CostTolerance,
    /// Spread of the simplex values dropped below the tolerance.
    SimplexTolerance,
    /// Iteration budget exhausted.
    MaxIterations,
    /// The solver gave up before meeting its tolerance.
    Stalled,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Termination::GradientTolerance
                | Termination::CostTolerance
                | Termination::SimplexTolerance
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            Termination::GradientTolerance => "gradient norm below tolerance",
            Termination::CostTolerance => "cost stopped changing",
            Termination::SimplexTolerance => "simplex collapsed below tolerance",
            Termination::MaxIterations => "iteration budget exhausted",
            Termination::Stalled => "solver stopped before reaching its tolerance",
        }
    }
}

/// Output of one estimation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimate {
    pub params: OdeParams,
    pub knots: KnotGrid,
    pub coefficients: Vec<f64>,
    pub lambda_reg: f64,
    /// `data_term + lambda_reg * ode_term` at the returned parameters.
    pub cost: f64,
    pub data_term: f64,
    pub ode_term: f64,
    pub converged: bool,
    pub termination: Termination,
    pub method: Method,
    pub iterations: usize,
    pub evaluations: usize,
}

/// One point of a `lambda_reg` trade-off curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    pub lambda_reg: f64,
    pub params: OdeParams,
    pub data_term: f64,
    pub ode_term: f64,
    pub cost: f64,
    pub converged: bool,
}

/// Where the observations come from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Generate a noisy trajectory of a known ODE.
    Synthetic(crate::data::SyntheticConfig),
    /// Load `(t, y)` pairs from a CSV file.
    Csv(PathBuf),
}

/// Settings shared by the `fit` and `sweep` commands.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: DataSource,

    pub knot_count: usize,

    pub method: Method,
    pub max_iterations: usize,
    pub tolerance: f64,

    pub initial_a: f64,
    pub initial_b: f64,
    pub initial_coefficient: f64,
}

/// Configuration of one `fit` run.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub run: RunConfig,
    pub lambda_reg: f64,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_estimate: Option<PathBuf>,
    pub export_residuals: Option<PathBuf>,
}

/// Configuration of one `sweep` run.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub run: RunConfig,
    /// Evaluated in this order.
    pub lambdas: Vec<f64>,
}

/// A saved estimate file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateFile {
    pub tool: String,
    pub estimate: Estimate,
    /// Generating parameters when the data was synthetic.
    pub truth: Option<OdeParams>,
    pub observations: Vec<ObservationRow>,
    pub grid: FittedGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRow {
    pub t: f64,
    pub y: f64,
}

/// Fitted spline sampled on a dense grid for quick plotting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedGrid {
    pub t: Vec<f64>,
    pub y: Vec<f64>,
}

/// A per-observation fitted value (used for exports and plots).
///
/// `residual = y_obs - y_fit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FittedPoint {
    pub t: f64,
    pub y_obs: f64,
    pub y_fit: f64,
    pub residual: f64,
}
