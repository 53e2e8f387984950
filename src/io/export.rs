//! Export per-observation fit results to CSV.
//!
//! Columns: `t,y_obs,y_fit,residual`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::FittedPoint;
use crate::error::AppError;

/// Write per-observation residuals to a CSV file.
pub fn write_residuals_csv(path: &Path, points: &[FittedPoint]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_residuals(file, points)
}

/// Write per-observation residuals as CSV to any writer.
pub fn write_residuals<W: Write>(writer: W, points: &[FittedPoint]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(writer);
    for p in points {
        writer
            .serialize(p)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
