use std::path::PathBuf;

use clap::Args;

use crate::cli::{load_input, OutputFormat};
use crate::core::geo::TIME_WINDOW_MINUTES;
use crate::core::types::Role;
use crate::matching::filter::{filter_candidates, FilterSummary, PRUNING_RADIUS_KM};
use crate::parsing;

#[derive(Args)]
pub struct FilterArgs {
    /// Input dataset (JSON file, CSV file, or directory of per-role CSV files)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Where to write the verified dataset (`.json` for a JSON file, otherwise
    /// a directory of per-role CSV files)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute filter subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be loaded or the output cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: FilterArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let dataset = load_input(&args.input, verbose)?;
    let filtered = filter_candidates(&dataset);

    if let Some(output) = &args.output {
        parsing::save_dataset(&filtered.dataset, output)?;
        if verbose {
            eprintln!("Wrote verified dataset to {}", output.display());
        }
    }

    match format {
        OutputFormat::Text => print_text(&filtered.summary, args.output.as_deref()),
        OutputFormat::Json => print_json(&filtered.summary, args.output.as_deref())?,
        OutputFormat::Tsv => print_tsv(&filtered.summary),
    }

    Ok(())
}

fn print_text(summary: &FilterSummary, output: Option<&std::path::Path>) {
    println!("Candidate Filter");
    println!("{}", "=".repeat(60));
    println!("Time window: {TIME_WINDOW_MINUTES} minutes, start radius: {PRUNING_RADIUS_KM} km");
    println!();
    println!("{:<10} {:>8} {:>12} {:>12}", "Role", "Input", "After time", "After radius");
    for role in Role::ALL {
        println!(
            "{:<10} {:>8} {:>12} {:>12}",
            role.to_string(),
            summary.input.get(role),
            summary.after_time.get(role),
            summary.after_geofence.get(role)
        );
    }
    println!(
        "\nKept {} of {} participants ({} removed)",
        summary.after_geofence.total(),
        summary.input.total(),
        summary.removed()
    );
    if let Some(path) = output {
        println!("Verified dataset: {}", path.display());
    }
}

fn print_json(summary: &FilterSummary, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "summary": summary,
        "removed": summary.removed(),
        "output": output.map(|p| p.display().to_string()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(summary: &FilterSummary) {
    println!("role\tinput\tafter_time\tafter_geofence");
    for role in Role::ALL {
        println!(
            "{}\t{}\t{}\t{}",
            role.as_type_str(),
            summary.input.get(role),
            summary.after_time.get(role),
            summary.after_geofence.get(role)
        );
    }
}
