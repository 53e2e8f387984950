//! Read/write estimate JSON files.
//!
//! An estimate file is the portable form of one run:
//! - the full `Estimate` (parameters, knots, coefficients, cost terms, status)
//! - the generating parameters when the data was synthetic
//! - the observations that were fitted
//! - a precomputed fitted grid for quick plotting
//!
//! The schema is defined by `domain::EstimateFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::{Estimate, EstimateFile, FittedGrid, ObservationRow, ObservationSet, OdeParams};
use crate::error::{AppError, EstimateError};
use crate::fit::knots::lin_space;
use crate::math::CubicSpline;

/// Number of samples in the saved fitted grid.
pub const GRID_POINTS: usize = 201;

/// Assemble the file contents for one run.
pub fn build_estimate_file(
    estimate: &Estimate,
    observations: &ObservationSet,
    truth: Option<OdeParams>,
) -> Result<EstimateFile, EstimateError> {
    let (t_start, t_end) = observations.span();
    let grid = build_grid(estimate, t_start, t_end, GRID_POINTS)?;

    let rows = observations
        .times()
        .iter()
        .zip(observations.values())
        .map(|(&t, &y)| ObservationRow { t, y })
        .collect();

    Ok(EstimateFile {
        tool: env!("CARGO_PKG_NAME").to_string(),
        estimate: estimate.clone(),
        truth,
        observations: rows,
        grid,
    })
}

/// Write an estimate JSON file.
pub fn write_estimate_json(path: &Path, file: &EstimateFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create estimate JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::new(2, format!("Failed to write estimate JSON: {e}")))?;
    Ok(())
}

/// Read an estimate JSON file.
pub fn read_estimate_json(path: &Path) -> Result<EstimateFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open estimate JSON '{}': {e}", path.display())))?;
    let parsed: EstimateFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid estimate JSON: {e}")))?;
    if parsed.estimate.coefficients.len() != parsed.estimate.knots.len() {
        return Err(AppError::new(
            2,
            format!(
                "Invalid estimate JSON: {} coefficients for {} knots",
                parsed.estimate.coefficients.len(),
                parsed.estimate.knots.len()
            ),
        ));
    }
    Ok(parsed)
}

/// Sample the fitted spline at `n` evenly spaced points on `[t_start, t_end]`.
pub fn build_grid(estimate: &Estimate, t_start: f64, t_end: f64, n: usize) -> Result<FittedGrid, EstimateError> {
    let spline = CubicSpline::new(estimate.knots.as_slice(), &estimate.coefficients)?;
    let t = if t_end > t_start {
        lin_space(t_start, t_end, n.max(2))?
    } else {
        // Single observation: fall back to the knot span.
        lin_space(estimate.knots.first(), estimate.knots.last(), n.max(2))?
    };
    let y = spline.evaluate(&t);
    Ok(FittedGrid { t, y })
}
