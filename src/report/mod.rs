//! Reporting utilities: fitted values, residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{Estimate, FittedPoint, ObservationSet};
use crate::error::EstimateError;
use crate::math::CubicSpline;

/// Fitted value and residual at every observation time.
pub fn compute_fitted_points(
    estimate: &Estimate,
    observations: &ObservationSet,
) -> Result<Vec<FittedPoint>, EstimateError> {
    let spline = CubicSpline::new(estimate.knots.as_slice(), &estimate.coefficients)?;
    Ok(observations
        .times()
        .iter()
        .zip(observations.values())
        .map(|(&t, &y_obs)| {
            let y_fit = spline.value_at(t);
            FittedPoint {
                t,
                y_obs,
                y_fit,
                residual: y_obs - y_fit,
            }
        })
        .collect())
}

/// Root mean square of the residuals.
pub fn rmse(points: &[FittedPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let sse: f64 = points.iter().map(|p| p.residual * p.residual).sum();
    (sse / points.len() as f64).sqrt()
}
