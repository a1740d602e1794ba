use std::path::PathBuf;

use clap::Args;

use crate::cli::solve::{parse_tolerance, SolverOptions};
use crate::cli::{load_input, OutputFormat};
use crate::matching::engine::MatchReport;

#[derive(Args)]
pub struct SweepArgs {
    /// Input dataset (JSON file, CSV file, or directory of per-role CSV files)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Comma-separated geofence tolerances in kilometres
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "0.5,1,2",
        value_parser = parse_tolerance
    )]
    pub tolerances: Vec<f64>,

    #[command(flatten)]
    pub solver: SolverOptions,
}

/// Execute sweep subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be loaded or any run fails validation.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: SweepArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let dataset = load_input(&args.input, verbose)?;
    // The tolerance given here is replaced per run
    let engine = args.solver.engine(0.0);
    let reports = engine.sweep(&dataset, &args.tolerances)?;

    match format {
        OutputFormat::Text => print_text(&reports),
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Tsv => print_tsv(&reports),
    }

    Ok(())
}

fn print_text(reports: &[MatchReport]) {
    println!("Tolerance Sweep");
    println!("{}", "=".repeat(60));
    println!(
        "{:>10} {:>10} {:>8} {:>10} {:>10}  Status",
        "Tol (km)", "Objective", "Open", "Nodes", "Total (s)"
    );
    for report in reports {
        println!(
            "{:>10} {:>10} {:>8} {:>10} {:>10.3}  {}",
            report.tolerance_km,
            report.objective,
            report.model.open_variables,
            report.nodes_explored,
            report.timings.total.as_secs_f64(),
            report.status_line()
        );
    }
}

fn print_json(reports: &[MatchReport]) -> anyhow::Result<()> {
    let runs: Vec<_> = reports
        .iter()
        .map(|report| {
            serde_json::json!({
                "tolerance_km": report.tolerance_km,
                "status": report.status,
                "objective": report.objective,
                "nodes_explored": report.nodes_explored,
                "model": report.model,
                "timings": report.timings,
                "matches": report.matches.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&runs)?);
    Ok(())
}

fn print_tsv(reports: &[MatchReport]) {
    println!("tolerance_km\tstatus\tobjective\topen_variables\tnodes_explored\tbuild_secs\tsolve_secs\ttotal_secs");
    for report in reports {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{:.6}\t{:.6}\t{:.6}",
            report.tolerance_km,
            report.status,
            report.objective,
            report.model.open_variables,
            report.nodes_explored,
            report.timings.build.as_secs_f64(),
            report.timings.solve.as_secs_f64(),
            report.timings.total.as_secs_f64()
        );
    }
}
