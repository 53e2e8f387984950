//! ASCII plotting for terminal output.
//!
//! A fixed-size character grid, kept simple on purpose:
//! - quick visual sanity checks in a terminal
//! - deterministic output (golden tests)
//!
//! Plot elements:
//! - observations: `o`
//! - fitted spline: `-` line

use crate::domain::{Estimate, EstimateFile, ObservationSet};
use crate::error::EstimateError;
use crate::fit::knots::lin_space;
use crate::math::CubicSpline;

/// Render observations and the fitted spline of an in-memory estimate.
pub fn render_ascii_plot(
    observations: &ObservationSet,
    estimate: &Estimate,
    width: usize,
    height: usize,
) -> Result<String, EstimateError> {
    let points: Vec<(f64, f64)> = observations
        .times()
        .iter()
        .copied()
        .zip(observations.values().iter().copied())
        .collect();
    let (t_min, t_max) = t_range(&points).unwrap_or((estimate.knots.first(), estimate.knots.last()));

    let spline = CubicSpline::new(estimate.knots.as_slice(), &estimate.coefficients)?;
    let ts = lin_space(t_min, t_max, width.max(10))?;
    let curve: Vec<(f64, f64)> = ts.iter().map(|&t| (t, spline.value_at(t))).collect();

    Ok(render_plot(&points, &curve, t_min, t_max, width, height))
}

/// Render a saved estimate file (stored grid plus stored observations).
pub fn render_ascii_plot_from_file(file: &EstimateFile, width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = file.observations.iter().map(|r| (r.t, r.y)).collect();
    let curve: Vec<(f64, f64)> = file
        .grid
        .t
        .iter()
        .copied()
        .zip(file.grid.y.iter().copied())
        .collect();
    let (t_min, t_max) = t_range(&curve)
        .or_else(|| t_range(&points))
        .unwrap_or((0.0, 1.0));

    render_plot(&points, &curve, t_min, t_max, width, height)
}

fn render_plot(
    points: &[(f64, f64)],
    curve: &[(f64, f64)],
    t_min: f64,
    t_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, curve).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so observations overlay it.
    draw_curve(&mut grid, curve, t_min, t_max, y_min, y_max);

    for &(t, y) in points {
        if !(t.is_finite() && y.is_finite()) {
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: t=[{t_min:.3}, {t_max:.3}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn t_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let (min_t, max_t) = points
        .iter()
        .map(|&(t, _)| t)
        .filter(|t| t.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
    if min_t.is_finite() && max_t.is_finite() && max_t > min_t {
        Some((min_t, max_t))
    } else {
        None
    }
}

fn y_range(points: &[(f64, f64)], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let (min_y, max_y) = points
        .iter()
        .chain(curve)
        .map(|&(_, y)| y)
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top (largest y).
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        if !(t.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, row, '-'),
            None => grid[row][x] = '-',
        }
        prev = Some((x, row));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        let (ux, uy) = (x0 as usize, y0 as usize);
        if uy < grid.len() && ux < grid[0].len() && grid[uy][ux] == ' ' {
            grid[uy][ux] = ch;
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KnotGrid, Method, OdeParams, Termination};
    use crate::io::build_estimate_file;

    fn line_fit() -> (ObservationSet, Estimate) {
        let obs = ObservationSet::new(vec![0.0, 1.0, 2.0], vec![1.0, 3.0, 5.0]).unwrap();
        let estimate = Estimate {
            params: OdeParams::new(0.0, 2.0),
            knots: KnotGrid::new(vec![0.0, 1.0, 2.0]).unwrap(),
            coefficients: vec![1.0, 3.0, 5.0],
            lambda_reg: 0.1,
            cost: 0.0,
            data_term: 0.0,
            ode_term: 0.0,
            converged: true,
            termination: Termination::GradientTolerance,
            method: Method::Bfgs,
            iterations: 1,
            evaluations: 10,
        };
        (obs, estimate)
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let (obs, estimate) = line_fit();
        let txt = render_ascii_plot(&obs, &estimate, 10, 5).unwrap();
        let expected = concat!(
            "Plot: t=[0.000, 2.000] | y=[0.80, 5.20]\n",
            "         o\n",
            "      --- \n",
            "    -o    \n",
            " ---      \n",
            "o         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn saved_file_renders_like_the_live_estimate_frame() {
        let (obs, estimate) = line_fit();
        let file = build_estimate_file(&estimate, &obs, None).unwrap();
        let txt = render_ascii_plot_from_file(&file, 40, 12);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 13);
        assert!(lines[0].starts_with("Plot: t=[0.000, 2.000]"));
        assert!(lines[1..].iter().all(|l| l.chars().count() == 40));
        let marks: usize = lines[1..].iter().map(|l| l.matches('o').count()).sum();
        assert_eq!(marks, 3);
    }

    #[test]
    fn output_is_deterministic() {
        let (obs, estimate) = line_fit();
        let a = render_ascii_plot(&obs, &estimate, 30, 8).unwrap();
        let b = render_ascii_plot(&obs, &estimate, 30, 8).unwrap();
        assert_eq!(a, b);
    }
}
