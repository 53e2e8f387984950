//! Top-level application orchestration.
//!
//! `src/main.rs` is kept tiny; this module is the real entry point that:
//! - parses CLI arguments
//! - generates or loads observations
//! - runs the estimation (or the lambda sweep)
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, DataArgs, FitArgs, PlotArgs, SolverArgs, SweepArgs};
use crate::data::SyntheticConfig;
use crate::domain::{DataSource, FitConfig, RunConfig, SweepConfig};
use crate::error::AppError;
use crate::report::{SummaryContext, rmse};

pub mod pipeline;

/// Entry point for the `odefit` binary.
pub fn run() -> Result<(), AppError> {
    // Clap requires a subcommand name; `odefit` and `odefit --lambda 1` mean `fit`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Sweep(args) => handle_sweep(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    let ctx = SummaryContext {
        source: &run.data.label,
        n_observations: run.data.observations.len(),
        truth: run.data.truth,
        rmse: rmse(&run.fitted),
    };
    println!("{}", crate::report::format_estimate_summary(&run.estimate, &ctx));

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.data.observations,
            &run.estimate,
            config.plot_width,
            config.plot_height,
        )?;
        println!("{plot}");
    }

    if let Some(path) = &config.export_estimate {
        let file = crate::io::build_estimate_file(&run.estimate, &run.data.observations, run.data.truth)?;
        crate::io::write_estimate_json(path, &file)?;
        log::info!("wrote estimate to '{}'", path.display());
    }
    if let Some(path) = &config.export_residuals {
        crate::io::write_residuals_csv(path, &run.fitted)?;
        log::info!("wrote residuals to '{}'", path.display());
    }

    Ok(())
}

fn handle_sweep(args: SweepArgs) -> Result<(), AppError> {
    let config = sweep_config_from_args(&args);
    let out = pipeline::run_sweep(&config)?;

    println!("Data: {} | n={}", out.data.label, out.data.observations.len());
    if let Some(truth) = out.data.truth {
        println!("True parameters: a={} b={}", truth.a, truth.b);
    }
    println!();
    println!("{}", crate::report::format_sweep_table(&out.points));
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::read_estimate_json(&args.result)?;
    let plot = crate::plot::render_ascii_plot_from_file(&file, args.width, args.height);
    println!("{plot}");
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        run: run_config(&args.data, &args.solver),
        lambda_reg: args.lambda_reg,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_estimate: args.export.clone(),
        export_residuals: args.export_residuals.clone(),
    }
}

pub fn sweep_config_from_args(args: &SweepArgs) -> SweepConfig {
    SweepConfig {
        run: run_config(&args.data, &args.solver),
        lambdas: args.lambdas.clone(),
    }
}

fn run_config(data: &DataArgs, solver: &SolverArgs) -> RunConfig {
    let source = match &data.data {
        Some(path) => DataSource::Csv(path.clone()),
        None => DataSource::Synthetic(SyntheticConfig {
            a: data.a_true,
            b: data.b_true,
            y0: data.y0,
            t_start: data.t_start,
            t_end: data.t_end,
            samples: data.samples,
            noise_sigma: data.noise,
            seed: data.seed,
        }),
    };

    RunConfig {
        source,
        knot_count: solver.knots,
        method: solver.method,
        max_iterations: solver.max_iter,
        tolerance: solver.tol,
        initial_a: solver.initial_a,
        initial_b: solver.initial_b,
        initial_coefficient: solver.initial_c,
    }
}

/// Rewrite argv so `odefit` defaults to `odefit fit`.
///
/// Rules:
/// - `odefit`                          -> `odefit fit`
/// - `odefit --lambda 1 ...`           -> `odefit fit --lambda 1 ...`
/// - `odefit --help/--version/-h`      -> unchanged (top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
    }
    argv
}
