//! Cubic spline interpolation with not-a-knot end conditions.
//!
//! On each knot interval `[x_i, x_{i+1}]` with width `h_i` the spline is
//!
//! ```text
//! S(t) = A y_i + B y_{i+1} + ((A³ - A) M_i + (B³ - B) M_{i+1}) h_i² / 6
//! A = (x_{i+1} - t) / h_i,   B = (t - x_i) / h_i
//! ```
//!
//! where `M_i = S''(x_i)` are the knot moments. The moments come from one dense
//! linear solve:
//!
//! - interior rows enforce C² continuity
//! - the first and last rows enforce a continuous third derivative across the
//!   second and second-to-last knots (not-a-knot)
//!
//! With three knots both not-a-knot rows coincide, so we instead require equal
//! moments, which yields the parabola through the three points. With two knots
//! the moments are zero (straight line).
//!
//! Outside the knot range the boundary segment's cubic is evaluated as-is
//! (cubic extension). Nothing is cached between evaluations.

use nalgebra::{DMatrix, DVector};

use crate::domain::ensure_strictly_increasing;
use crate::error::EstimateError;

#[derive(Debug, Clone)]
pub struct CubicSpline {
    knots: Vec<f64>,
    values: Vec<f64>,
    moments: Vec<f64>,
}

impl CubicSpline {
    /// Build the interpolant through `(knots[i], values[i])`.
    pub fn new(knots: &[f64], values: &[f64]) -> Result<Self, EstimateError> {
        if knots.len() != values.len() {
            return Err(EstimateError::invalid_domain(format!(
                "spline needs one value per knot: {} knots vs {} values",
                knots.len(),
                values.len()
            )));
        }
        if knots.len() < 2 {
            return Err(EstimateError::invalid_domain(format!(
                "spline needs at least 2 knots, got {}",
                knots.len()
            )));
        }
        ensure_strictly_increasing("spline knots", knots)?;
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(EstimateError::invalid_domain(format!(
                "spline value #{i} is not finite"
            )));
        }

        let moments = solve_moments(knots, values)?;
        Ok(Self {
            knots: knots.to_vec(),
            values: values.to_vec(),
            moments,
        })
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Spline value at a single point.
    pub fn value_at(&self, t: f64) -> f64 {
        let i = self.segment(t);
        let (h, a, b) = self.local(i, t);
        a * self.values[i]
            + b * self.values[i + 1]
            + ((a * a * a - a) * self.moments[i] + (b * b * b - b) * self.moments[i + 1]) * h * h
                / 6.0
    }

    /// First derivative at a single point.
    pub fn derivative_at(&self, t: f64) -> f64 {
        let i = self.segment(t);
        let (h, a, b) = self.local(i, t);
        (self.values[i + 1] - self.values[i]) / h - (3.0 * a * a - 1.0) / 6.0 * h * self.moments[i]
            + (3.0 * b * b - 1.0) / 6.0 * h * self.moments[i + 1]
    }

    pub fn evaluate(&self, points: &[f64]) -> Vec<f64> {
        points.iter().map(|&t| self.value_at(t)).collect()
    }

    pub fn derivative(&self, points: &[f64]) -> Vec<f64> {
        points.iter().map(|&t| self.derivative_at(t)).collect()
    }

    /// Index `i` of the segment `[x_i, x_{i+1}]` used for `t`, clamped to the
    /// boundary segments outside the knot range.
    fn segment(&self, t: f64) -> usize {
        let upper = self.knots.partition_point(|&x| x <= t);
        upper.saturating_sub(1).min(self.knots.len() - 2)
    }

    fn local(&self, i: usize, t: f64) -> (f64, f64, f64) {
        let h = self.knots[i + 1] - self.knots[i];
        let a = (self.knots[i + 1] - t) / h;
        let b = (t - self.knots[i]) / h;
        (h, a, b)
    }
}

fn solve_moments(x: &[f64], y: &[f64]) -> Result<Vec<f64>, EstimateError> {
    let m = x.len();
    if m == 2 {
        return Ok(vec![0.0; 2]);
    }

    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let mut lhs = DMatrix::<f64>::zeros(m, m);
    let mut rhs = DVector::<f64>::zeros(m);

    for i in 1..m - 1 {
        lhs[(i, i - 1)] = h[i - 1];
        lhs[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        lhs[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
    }

    if m == 3 {
        lhs[(0, 0)] = 1.0;
        lhs[(0, 1)] = -1.0;
        lhs[(2, 1)] = 1.0;
        lhs[(2, 2)] = -1.0;
    } else {
        lhs[(0, 0)] = h[1];
        lhs[(0, 1)] = -(h[0] + h[1]);
        lhs[(0, 2)] = h[0];

        lhs[(m - 1, m - 3)] = h[m - 2];
        lhs[(m - 1, m - 2)] = -(h[m - 3] + h[m - 2]);
        lhs[(m - 1, m - 1)] = h[m - 3];
    }

    let moments = lhs
        .lu()
        .solve(&rhs)
        .ok_or_else(|| EstimateError::invalid_domain("spline moment system is singular"))?;
    if moments.iter().any(|v| !v.is_finite()) {
        return Err(EstimateError::invalid_domain(
            "spline moment system produced non-finite moments",
        ));
    }
    Ok(moments.iter().copied().collect())
}
