//! Knot grid generation.
//!
//! Knots are fixed configuration: they are placed once, before the optimizer
//! runs, and never move. The default placement is an evenly spaced grid over the
//! observation window.

use crate::domain::{KnotGrid, ObservationSet};
use crate::error::EstimateError;

/// Generate `count` evenly spaced points between `start` and `end` (inclusive).
pub fn lin_space(start: f64, end: f64, count: usize) -> Result<Vec<f64>, EstimateError> {
    if !(start.is_finite() && end.is_finite() && end > start) {
        return Err(EstimateError::invalid_domain(format!(
            "invalid knot range: start={start}, end={end} (must be finite with end>start)"
        )));
    }
    if count < 2 {
        return Err(EstimateError::invalid_domain(format!(
            "knot count must be >= 2, got {count}"
        )));
    }

    let step = (end - start) / (count as f64 - 1.0);
    let mut out: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
    // Pin the endpoint so the grid spans the window exactly.
    out[count - 1] = end;
    Ok(out)
}

/// Evenly spaced knot grid on `[start, end]`.
pub fn uniform_knots(start: f64, end: f64, count: usize) -> Result<KnotGrid, EstimateError> {
    KnotGrid::new(lin_space(start, end, count)?)
}

/// Evenly spaced knot grid spanning the observation times.
pub fn knots_for(observations: &ObservationSet, count: usize) -> Result<KnotGrid, EstimateError> {
    let (start, end) = observations.span();
    uniform_knots(start, end, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lin_space_includes_endpoints() {
        let v = lin_space(0.0, 10.0, 10).unwrap();
        assert_eq!(v.len(), 10);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[9], 10.0);
        assert!((v[1] - 10.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_grids_are_invalid_domain() {
        assert!(matches!(
            uniform_knots(0.0, 1.0, 1),
            Err(EstimateError::InvalidDomain(_))
        ));
        assert!(matches!(
            uniform_knots(1.0, 1.0, 5),
            Err(EstimateError::InvalidDomain(_))
        ));
        assert!(matches!(
            uniform_knots(2.0, 1.0, 5),
            Err(EstimateError::InvalidDomain(_))
        ));
    }

    #[test]
    fn knots_follow_observation_span() {
        let obs = ObservationSet::new(vec![1.0, 2.0, 4.0], vec![0.0, 0.0, 0.0]).unwrap();
        let grid = knots_for(&obs, 4).unwrap();
        assert_eq!(grid.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }
}
