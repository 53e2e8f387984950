//! CSV ingest for measured observations.
//!
//! Expected layout: a header row naming a time column (`t` or `time`) and a
//! value column (`y` or `value`), matched case-insensitively. Other columns are
//! ignored. Every data row must parse; a bad cell fails the whole load with the
//! offending line number (exit code 2).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::ObservationSet;
use crate::error::AppError;

const TIME_COLUMNS: [&str; 2] = ["t", "time"];
const VALUE_COLUMNS: [&str; 2] = ["y", "value"];

/// Load observations from a CSV file.
pub fn load_observations(path: &Path) -> Result<ObservationSet, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let observations = read_observations(file)?;
    log::info!(
        "loaded {} observations from '{}'",
        observations.len(),
        path.display()
    );
    Ok(observations)
}

/// Parse observations from any CSV reader.
pub fn read_observations<R: Read>(reader: R) -> Result<ObservationSet, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let t_idx = find_column(&header_map, &TIME_COLUMNS)?;
    let y_idx = find_column(&header_map, &VALUE_COLUMNS)?;

    let mut times = Vec::new();
    let mut values = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // Data starts on line 2, after the header.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error on line {line}: {e}")))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        times.push(parse_cell(&record, t_idx, line, "time")?);
        values.push(parse_cell(&record, y_idx, line, "value")?);
    }

    if times.is_empty() {
        return Err(AppError::new(2, "CSV contains no observation rows."));
    }

    Ok(ObservationSet::new(times, values)?)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Result<usize, AppError> {
    names
        .iter()
        .find_map(|name| header_map.get(*name).copied())
        .ok_or_else(|| {
            let wanted: Vec<String> = names.iter().map(|n| format!("`{n}`")).collect();
            AppError::new(2, format!("Missing required column: one of {}", wanted.join(", ")))
        })
}

fn parse_cell(record: &StringRecord, idx: usize, line: usize, label: &str) -> Result<f64, AppError> {
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::new(2, format!("Line {line}: missing {label}")))?;
    raw.parse::<f64>()
        .map_err(|_| AppError::new(2, format!("Line {line}: invalid {label} '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_columns_in_any_order_and_case() {
        let csv = "\u{feff}Value,extra,Time\n1.5,x,0.0\n2.5,y,0.5\n\n4.0,z,1.0\n";
        let obs = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(obs.times(), &[0.0, 0.5, 1.0]);
        assert_eq!(obs.values(), &[1.5, 2.5, 4.0]);
    }

    #[test]
    fn short_column_names_are_accepted() {
        let obs = read_observations("t,y\n0,1\n1,2\n".as_bytes()).unwrap();
        assert_eq!(obs.len(), 2);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = read_observations("time,signal\n0,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("`value`"), "{err}");
    }

    #[test]
    fn bad_cell_names_the_line() {
        let err = read_observations("t,y\n0,1\n1,abc\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Line 3"), "{err}");
    }

    #[test]
    fn unordered_times_fail_validation() {
        let err = read_observations("t,y\n1,1\n0,2\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("strictly increasing"), "{err}");
    }

    #[test]
    fn header_only_file_is_rejected() {
        assert!(read_observations("t,y\n".as_bytes()).is_err());
    }
}
