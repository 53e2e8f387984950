//! Layout of the joint parameter vector seen by the optimizer.
//!
//! ```text
//! [ a, b, c_0, c_1, ..., c_{M-1} ]
//! ```
//!
//! Every conversion between the flat vector and `(OdeParams, coefficients)`
//! goes through [`ParamLayout`], so the offsets live in exactly one place.

use crate::domain::OdeParams;
use crate::error::EstimateError;

const A_INDEX: usize = 0;
const B_INDEX: usize = 1;
const COEFFICIENT_OFFSET: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLayout {
    knot_count: usize,
}

/// Borrowed view of an unpacked joint vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointParams<'a> {
    pub ode: OdeParams,
    pub coefficients: &'a [f64],
}

impl ParamLayout {
    pub fn new(knot_count: usize) -> Self {
        Self { knot_count }
    }

    pub fn knot_count(&self) -> usize {
        self.knot_count
    }

    /// Length of the flat `[a, b, c_0..c_{M-1}]` vector.
    pub fn joint_len(&self) -> usize {
        COEFFICIENT_OFFSET + self.knot_count
    }

    pub fn pack(&self, ode: OdeParams, coefficients: &[f64]) -> Result<Vec<f64>, EstimateError> {
        if coefficients.len() != self.knot_count {
            return Err(EstimateError::invalid_domain(format!(
                "expected {} spline coefficients, got {}",
                self.knot_count,
                coefficients.len()
            )));
        }
        let mut flat = vec![0.0; self.joint_len()];
        flat[A_INDEX] = ode.a;
        flat[B_INDEX] = ode.b;
        flat[COEFFICIENT_OFFSET..].copy_from_slice(coefficients);
        Ok(flat)
    }

    pub fn unpack<'a>(&self, flat: &'a [f64]) -> Result<JointParams<'a>, EstimateError> {
        if flat.len() != self.joint_len() {
            return Err(EstimateError::invalid_domain(format!(
                "joint parameter vector must have length {} (2 + {} knots), got {}",
                self.joint_len(),
                self.knot_count,
                flat.len()
            )));
        }
        Ok(JointParams {
            ode: OdeParams::new(flat[A_INDEX], flat[B_INDEX]),
            coefficients: &flat[COEFFICIENT_OFFSET..],
        })
    }
}
