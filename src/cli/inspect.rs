use std::path::PathBuf;

use clap::Args;

use crate::cli::solve::parse_tolerance;
use crate::cli::{load_input, OutputFormat};
use crate::core::dataset::Dataset;
use crate::core::types::Role;
use crate::matching::engine::{MatchingConfig, DEFAULT_TOLERANCE_KM};
use crate::matching::filter::filter_candidates;
use crate::matching::model::{build_model, ModelStats};
use crate::utils::validation::OUTPUT_TIMESTAMP_FORMAT;

#[derive(Args)]
pub struct InspectArgs {
    /// Input dataset (JSON file, CSV file, or directory of per-role CSV files)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Geofence tolerance used to size the model, in kilometres
    #[arg(short, long, default_value_t = DEFAULT_TOLERANCE_KM, value_parser = parse_tolerance)]
    pub tolerance: f64,

    /// Size the model over the full dataset instead of the filtered pools
    #[arg(long)]
    pub no_filter: bool,

    /// Size the model without the shifter role exclusivity constraints, as
    /// `solve --allow-dual-shifter-roles` builds it
    #[arg(long)]
    pub allow_dual_shifter_roles: bool,
}

/// Execute inspect subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be loaded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: InspectArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let dataset = load_input(&args.input, verbose)?;

    let pools = if args.no_filter {
        dataset.clone()
    } else {
        filter_candidates(&dataset).dataset
    };
    let config = MatchingConfig {
        tolerance_km: args.tolerance,
        prefilter: !args.no_filter,
        exclusive_shifter_roles: !args.allow_dual_shifter_roles,
    };
    let stats = build_model(&pools, &config).stats();

    match format {
        OutputFormat::Text => print_text(&dataset, &pools, &stats, args.tolerance),
        OutputFormat::Json => print_json(&dataset, &pools, &stats, args.tolerance)?,
        OutputFormat::Tsv => print_tsv(&dataset, &pools),
    }

    Ok(())
}

fn span_text(dataset: &Dataset) -> String {
    match dataset.departure_span() {
        Some((first, last)) => format!(
            "{} to {}",
            first.format(OUTPUT_TIMESTAMP_FORMAT),
            last.format(OUTPUT_TIMESTAMP_FORMAT)
        ),
        None => "none".to_string(),
    }
}

fn print_text(dataset: &Dataset, pools: &Dataset, stats: &ModelStats, tolerance: f64) {
    println!("Dataset Summary");
    println!("{}", "=".repeat(60));
    for role in Role::ALL {
        println!(
            "  {:<10} {:>6} loaded, {:>6} in pools",
            format!("{role}s:"),
            dataset.counts().get(role),
            pools.counts().get(role)
        );
    }
    println!("  Seats offered: {}", dataset.total_seats());
    println!("  Departures: {}", span_text(dataset));

    println!("\nModel at {tolerance} km");
    println!(
        "  Variables: {} ({} open, {} fixed to zero)",
        stats.variables, stats.open_variables, stats.fixed_variables
    );
    println!("  Constraints: {}", stats.constraints);
}

fn print_json(
    dataset: &Dataset,
    pools: &Dataset,
    stats: &ModelStats,
    tolerance: f64,
) -> anyhow::Result<()> {
    let span = dataset.departure_span().map(|(first, last)| {
        serde_json::json!({
            "first": first.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
            "last": last.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
        })
    });
    let output = serde_json::json!({
        "loaded": dataset.counts(),
        "pools": pools.counts(),
        "total_seats": dataset.total_seats(),
        "departure_span": span,
        "tolerance_km": tolerance,
        "model": stats,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(dataset: &Dataset, pools: &Dataset) {
    println!("role\tloaded\tin_pools");
    for role in Role::ALL {
        println!(
            "{}\t{}\t{}",
            role.as_type_str(),
            dataset.counts().get(role),
            pools.counts().get(role)
        );
    }
}
