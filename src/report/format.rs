//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation and
//! output changes are localized.

use crate::domain::{Estimate, OdeParams, SweepPoint};

/// Context printed above the estimate.
#[derive(Debug, Clone)]
pub struct SummaryContext<'a> {
    /// Where the observations came from, e.g. `synthetic (seed 42)`.
    pub source: &'a str,
    pub n_observations: usize,
    /// Generating parameters, when known.
    pub truth: Option<OdeParams>,
    /// RMSE of the fit at the observation times.
    pub rmse: f64,
}

/// Format the full run summary.
pub fn format_estimate_summary(estimate: &Estimate, ctx: &SummaryContext<'_>) -> String {
    let mut out = String::new();

    out.push_str("=== odefit - ODE parameter estimation (spline collocation) ===\n");
    out.push_str("Model: dy/dt = a*y + b\n");
    out.push_str(&format!("Data: {} | n={}\n", ctx.source, ctx.n_observations));
    out.push_str(&format!(
        "Knots: {} on [{:.3}, {:.3}] | lambda_reg={}\n",
        estimate.knots.len(),
        estimate.knots.first(),
        estimate.knots.last(),
        estimate.lambda_reg
    ));

    out.push_str("\nOptimizer:\n");
    out.push_str(&format!(
        "- method: {} | iterations={} | evaluations={}\n",
        estimate.method.display_name(),
        estimate.iterations,
        estimate.evaluations
    ));
    let status = if estimate.converged { "converged" } else { "NOT converged" };
    out.push_str(&format!("- status: {status} ({})\n", estimate.termination.describe()));

    out.push_str("\nCost:\n");
    out.push_str(&format!("- data term (MSE): {:.6e}\n", estimate.data_term));
    out.push_str(&format!("- ODE term       : {:.6e}\n", estimate.ode_term));
    out.push_str(&format!("- total          : {:.6e}\n", estimate.cost));
    out.push_str(&format!("- RMSE           : {:.6}\n", ctx.rmse));

    out.push_str("\nEstimated parameters:\n");
    match ctx.truth {
        Some(truth) => {
            out.push_str(&format!(
                "- a = {:.6} (true {:.6}, error {:+.6})\n",
                estimate.params.a,
                truth.a,
                estimate.params.a - truth.a
            ));
            out.push_str(&format!(
                "- b = {:.6} (true {:.6}, error {:+.6})\n",
                estimate.params.b,
                truth.b,
                estimate.params.b - truth.b
            ));
        }
        None => {
            out.push_str(&format!("- a = {:.6}\n", estimate.params.a));
            out.push_str(&format!("- b = {:.6}\n", estimate.params.b));
        }
    }
    out.push_str(&format!("- coefficients: {}\n", fmt_vec(&estimate.coefficients)));
    out.push('\n');

    out
}

/// Format the lambda trade-off table.
pub fn format_sweep_table(points: &[SweepPoint]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>10} {:>12} {:>12} {:>14} {:>14} {:<9}",
            "lambda", "a", "b", "data_term", "ode_term", "converged"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<10} {:-<12} {:-<12} {:-<14} {:-<14} {:-<9}",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for p in points {
        out.push_str(
            format!(
                "{:>10} {:>12.6} {:>12.6} {:>14.6e} {:>14.6e} {:<9}",
                fmt_lambda(p.lambda_reg),
                p.params.a,
                p.params.b,
                p.data_term,
                p.ode_term,
                if p.converged { "yes" } else { "no" }
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_lambda(v: f64) -> String {
    if v == 0.0 || (1e-3..1e4).contains(&v.abs()) {
        format!("{v}")
    } else {
        format!("{v:e}")
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
