use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::cli::{load_input, OutputFormat};
use crate::matching::backend::SolverConfig;
use crate::matching::engine::{MatchReport, MatchingConfig, MatchingEngine, DEFAULT_TOLERANCE_KM};

#[derive(Args)]
pub struct SolveArgs {
    /// Input dataset (JSON file, CSV file, or directory of per-role CSV files)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Maximum start and end distance of a pairing, in kilometres
    #[arg(short, long, default_value_t = DEFAULT_TOLERANCE_KM, value_parser = parse_tolerance)]
    pub tolerance: f64,

    #[command(flatten)]
    pub solver: SolverOptions,
}

/// Search budget when `--time-limit-secs` is not given
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 60;

/// Options shared by every subcommand that solves
#[derive(Args)]
pub struct SolverOptions {
    /// Stop searching after this many seconds and report the best matching
    /// found; 0 searches until optimality is proven
    #[arg(long, default_value_t = DEFAULT_TIME_LIMIT_SECS)]
    pub time_limit_secs: u64,

    /// Stop searching after this many search nodes
    #[arg(long)]
    pub node_limit: Option<u64>,

    /// Solve the full dataset without the candidate filter
    #[arg(long)]
    pub no_filter: bool,

    /// Allow a shifter to drive another shifter while also riding with someone else
    #[arg(long)]
    pub allow_dual_shifter_roles: bool,
}

impl SolverOptions {
    /// Engine for these options at the given tolerance
    #[must_use]
    pub fn engine(&self, tolerance_km: f64) -> MatchingEngine {
        let config = MatchingConfig {
            tolerance_km,
            prefilter: !self.no_filter,
            exclusive_shifter_roles: !self.allow_dual_shifter_roles,
        };
        let solver = SolverConfig {
            time_limit: (self.time_limit_secs > 0)
                .then(|| Duration::from_secs(self.time_limit_secs)),
            node_limit: self.node_limit,
        };
        MatchingEngine::with_config(config, solver)
    }
}

/// Parse a geofence tolerance: a finite, non-negative number of kilometres
pub(crate) fn parse_tolerance(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!(
            "tolerance must be a non-negative distance in km, got {s}"
        ));
    }
    Ok(value)
}

/// Execute solve subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be loaded or the solver output fails validation.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: SolveArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let dataset = load_input(&args.input, verbose)?;
    let report = args.solver.engine(args.tolerance).run(&dataset)?;

    if !report.status.has_assignment() {
        eprintln!("Warning: {}", report.status_line());
    }

    match format {
        OutputFormat::Text => print_text(&report, verbose),
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Tsv => print_tsv(&report),
    }

    Ok(())
}

fn print_text(report: &MatchReport, verbose: bool) {
    println!("Matching Results");
    println!("{}", "=".repeat(60));
    println!("{}", report.status_line());
    println!(
        "Objective: {}  Matches: {}  Nodes explored: {}",
        report.objective,
        report.matches.len(),
        report.nodes_explored
    );
    println!(
        "Tolerance: {} km  Backend: {}",
        report.tolerance_km, report.backend
    );

    let pools = report.pools;
    print!(
        "Pools: {} drivers, {} riders, {} shifters",
        pools.drivers, pools.riders, pools.shifters
    );
    match &report.filter {
        Some(summary) => println!(" ({} removed by the candidate filter)", summary.removed()),
        None => println!(" (candidate filter off)"),
    }
    println!(
        "Model: {} variables ({} open, {} fixed), {} constraints",
        report.model.variables,
        report.model.open_variables,
        report.model.fixed_variables,
        report.model.constraints
    );

    if report.matches.is_empty() {
        println!("\nNo pairings selected.");
    } else {
        println!("\nMatches:");
        for m in &report.matches {
            println!(
                "  {}  ({} min apart, start {:.2} km, end {:.2} km)",
                m, m.edge.delta_minutes, m.edge.start_km, m.edge.end_km
            );
            if verbose && !m.offering.route_start.is_empty() {
                println!(
                    "      route {} -> {}",
                    m.offering.route_start, m.offering.route_end
                );
            }
        }
    }

    println!(
        "\nTimings: build {:.3}s, solve {:.3}s, total {:.3}s",
        report.timings.build.as_secs_f64(),
        report.timings.solve.as_secs_f64(),
        report.timings.total.as_secs_f64()
    );
}

fn print_json(report: &MatchReport) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "status_line": report.status_line(),
        "report": report,
        "descriptions": report.matches.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(report: &MatchReport) {
    println!(
        "kind\toffering_role\toffering_id\ttaken_role\ttaken_id\tdelta_minutes\tstart_km\tend_km"
    );
    for m in &report.matches {
        println!(
            "{:?}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}",
            m.kind,
            m.offering.role.as_type_str(),
            m.offering.id,
            m.taken.role.as_type_str(),
            m.taken.id,
            m.edge.delta_minutes,
            m.edge.start_km,
            m.edge.end_km
        );
    }
}
