//! ODE residual of a spline trajectory.
//!
//! For a candidate trajectory `S(t)` and coefficients `(a, b)` the pointwise
//! defect is
//!
//! ```text
//! r(t) = S'(t) - (a·S(t) + b)
//! ```
//!
//! and the physics penalty is `∫ r(t)² dt`. On every knot interval `r²` is a
//! polynomial of degree 6, so the knots are handed to the integrator as
//! breakpoints.

use crate::domain::OdeParams;
use crate::error::EstimateError;
use crate::math::{CubicSpline, QuadratureConfig, integrate};

#[derive(Debug, Clone, Copy)]
pub struct OdeResidual<'a> {
    params: OdeParams,
    spline: &'a CubicSpline,
}

impl<'a> OdeResidual<'a> {
    pub fn new(params: OdeParams, spline: &'a CubicSpline) -> Self {
        Self { params, spline }
    }

    /// Pointwise defect at `t`.
    pub fn at(&self, t: f64) -> f64 {
        self.spline.derivative_at(t) - self.params.rhs(self.spline.value_at(t))
    }

    /// `∫ r(t)² dt` over `[t_start, t_end]`.
    ///
    /// # Errors
    ///
    /// `QuadratureFailure` if the integrator misses its tolerance, and
    /// `InvalidDomain` for a reversed or non-finite interval.
    pub fn integrate_squared_residual(
        &self,
        t_start: f64,
        t_end: f64,
        config: &QuadratureConfig,
    ) -> Result<f64, EstimateError> {
        integrate(
            |t| {
                let r = self.at(t);
                r * r
            },
            t_start,
            t_end,
            self.spline.knots(),
            config,
        )
    }
}
