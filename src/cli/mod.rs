//! Command-line parsing for `odefit`.
//!
//! Argument parsing and command dispatch stay separate from the estimation code:
//! everything here is converted into a plain `FitConfig` or `SweepConfig` before any work starts.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Method;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "odefit",
    version,
    about = "Estimate (a, b) in dy/dt = a*y + b by spline collocation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate the ODE parameters, print a summary, and optionally plot/export.
    Fit(FitArgs),
    /// Re-estimate over several lambda values and print the trade-off table.
    Sweep(SweepArgs),
    /// Plot a previously exported estimate JSON.
    Plot(PlotArgs),
}

/// Where the observations come from.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Load `(t, y)` observations from CSV instead of generating them.
    #[arg(long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// True `a` for synthetic data.
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub a_true: f64,

    /// True `b` for synthetic data.
    #[arg(long, default_value_t = 2.0, allow_negative_numbers = true)]
    pub b_true: f64,

    /// Initial value `y(t_start)` for synthetic data.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub y0: f64,

    /// Start of the synthetic time window.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub t_start: f64,

    /// End of the synthetic time window.
    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub t_end: f64,

    /// Number of synthetic samples.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub samples: usize,

    /// Standard deviation of the synthetic measurement noise.
    #[arg(long, default_value_t = 0.5)]
    pub noise: f64,

    /// Random seed for synthetic noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Knot grid, optimizer and initial guess.
#[derive(Debug, Args, Clone)]
pub struct SolverArgs {
    /// Number of evenly spaced spline knots over the observation window.
    #[arg(short = 'k', long, default_value_t = 10)]
    pub knots: usize,

    /// Optimizer.
    #[arg(long, value_enum, default_value_t = Method::Bfgs)]
    pub method: Method,

    /// Iteration budget.
    #[arg(long, default_value_t = 2000)]
    pub max_iter: usize,

    /// Convergence tolerance.
    #[arg(long, default_value_t = 1e-5)]
    pub tol: f64,

    /// Starting value for `a`.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub initial_a: f64,

    /// Starting value for `b`.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub initial_b: f64,

    /// Starting value for every spline coefficient.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub initial_c: f64,
}

/// Options for a single estimation.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub solver: SolverArgs,

    /// Weight of the ODE residual term.
    #[arg(short = 'l', long = "lambda", default_value_t = 0.1)]
    pub lambda_reg: f64,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the estimate (parameters, spline, fitted grid) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Export per-observation residuals to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_residuals: Option<PathBuf>,
}

/// Options for a lambda sweep.
#[derive(Debug, Args, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub solver: SolverArgs,

    /// Comma-separated lambda values.
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [0.0, 0.01, 0.1, 1.0, 10.0]
    )]
    pub lambdas: Vec<f64>,
}

/// Options for plotting a saved estimate.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Estimate JSON file produced by `odefit fit --export`.
    #[arg(long, value_name = "JSON")]
    pub result: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fit_defaults_match_the_reference_scenario() {
        let cli = Cli::parse_from(["odefit", "fit"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.data.a_true, 0.5);
        assert_eq!(args.data.b_true, 2.0);
        assert_eq!(args.data.samples, 100);
        assert_eq!(args.data.noise, 0.5);
        assert_eq!(args.solver.knots, 10);
        assert_eq!(args.solver.method, Method::Bfgs);
        assert_eq!(args.lambda_reg, 0.1);
        assert!(args.data.data.is_none());
    }

    #[test]
    fn sweep_parses_comma_separated_lambdas() {
        let cli = Cli::parse_from([
            "odefit",
            "sweep",
            "--lambdas",
            "0,0.5,2",
            "--method",
            "nelder-mead",
            "--initial-a",
            "-0.5",
        ]);
        let Command::Sweep(args) = cli.command else {
            panic!("expected sweep");
        };
        assert_eq!(args.lambdas, vec![0.0, 0.5, 2.0]);
        assert_eq!(args.solver.method, Method::NelderMead);
        assert_eq!(args.solver.initial_a, -0.5);

        let Command::Sweep(default) = Cli::parse_from(["odefit", "sweep"]).command else {
            panic!("expected sweep");
        };
        assert_eq!(default.lambdas, vec![0.0, 0.01, 0.1, 1.0, 10.0]);
    }
}
