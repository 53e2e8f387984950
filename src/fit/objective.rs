//! Composite collocation objective.
//!
//! ```text
//! cost(θ) = (1/N) Σ (S(t_i) - y_i)²  +  λ ∫_{t_min}^{t_max} (S'(t) - a·S(t) - b)² dt
//! ```
//!
//! where `θ = [a, b, c_0..c_{M-1}]` and `S` is the cubic spline through
//! `(knots, c)`. The first term keeps the spline near the data, the second keeps
//! it consistent with the ODE.
//!
//! Evaluation is a pure function of `θ`: the spline is rebuilt on every call and
//! nothing is cached, so the objective can be shared across threads.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{KnotGrid, ObservationSet};
use crate::error::EstimateError;
use crate::fit::layout::ParamLayout;
use crate::fit::residual::OdeResidual;
use crate::math::{CubicSpline, QuadratureConfig};

/// Cost split into its two terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub data_term: f64,
    pub ode_term: f64,
    pub total: f64,
}

/// Objective with observations, knots and `λ` bound.
#[derive(Debug)]
pub struct CollocationObjective<'a> {
    observations: &'a ObservationSet,
    knots: &'a KnotGrid,
    lambda_reg: f64,
    layout: ParamLayout,
    quadrature: QuadratureConfig,
    evaluations: AtomicUsize,
}

impl<'a> CollocationObjective<'a> {
    pub fn new(
        observations: &'a ObservationSet,
        knots: &'a KnotGrid,
        lambda_reg: f64,
        quadrature: QuadratureConfig,
    ) -> Result<Self, EstimateError> {
        if !lambda_reg.is_finite() || lambda_reg < 0.0 {
            return Err(EstimateError::invalid_domain(format!(
                "lambda_reg must be finite and non-negative, got {lambda_reg}"
            )));
        }
        Ok(Self {
            observations,
            knots,
            lambda_reg,
            layout: ParamLayout::new(knots.len()),
            quadrature,
            evaluations: AtomicUsize::new(0),
        })
    }

    pub fn layout(&self) -> ParamLayout {
        self.layout
    }

    pub fn lambda_reg(&self) -> f64 {
        self.lambda_reg
    }

    /// Number of cost evaluations so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Scalar cost `data_term + λ·ode_term`.
    ///
    /// With `λ = 0` the ODE term cannot contribute and is not integrated.
    pub fn cost(&self, joint: &[f64]) -> Result<f64, EstimateError> {
        if self.lambda_reg == 0.0 {
            self.evaluations.fetch_add(1, Ordering::Relaxed);
            let params = self.layout.unpack(joint)?;
            let spline = CubicSpline::new(self.knots.as_slice(), params.coefficients)?;
            return Ok(mean_squared_error(&spline, self.observations));
        }
        self.breakdown(joint).map(|c| c.total)
    }

    /// Both terms of the cost. The ODE term is always integrated, even when
    /// `λ = 0`, so it can be reported.
    pub fn breakdown(&self, joint: &[f64]) -> Result<CostBreakdown, EstimateError> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let params = self.layout.unpack(joint)?;
        let spline = CubicSpline::new(self.knots.as_slice(), params.coefficients)?;

        let data_term = mean_squared_error(&spline, self.observations);
        let (t_start, t_end) = self.observations.span();
        let ode_term = OdeResidual::new(params.ode, &spline).integrate_squared_residual(
            t_start,
            t_end,
            &self.quadrature,
        )?;

        Ok(CostBreakdown {
            data_term,
            ode_term,
            total: data_term + self.lambda_reg * ode_term,
        })
    }
}

/// Mean squared error of the spline against the observations.
pub fn mean_squared_error(spline: &CubicSpline, observations: &ObservationSet) -> f64 {
    let sse: f64 = observations
        .times()
        .iter()
        .zip(observations.values())
        .map(|(&t, &y)| {
            let r = spline.value_at(t) - y;
            r * r
        })
        .sum();
    sse / observations.len() as f64
}

/// Standalone form of the objective with every argument explicit.
pub fn collocation_cost(
    joint: &[f64],
    observations: &ObservationSet,
    knots: &KnotGrid,
    lambda_reg: f64,
) -> Result<f64, EstimateError> {
    CollocationObjective::new(observations, knots, lambda_reg, QuadratureConfig::default())?
        .cost(joint)
}
