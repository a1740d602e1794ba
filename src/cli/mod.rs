//! Command-line interface for rideshare-solver.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **filter**: Prune a dataset with the candidate filter and write the verified pools
//! - **solve**: Compute an optimal matching for a dataset
//! - **sweep**: Solve the same dataset at several geofence tolerances
//! - **inspect**: Summarize a dataset and the size of its model
//!
//! ## Usage
//!
//! ```text
//! # Match a JSON dataset
//! rideshare-solver solve participants.json
//!
//! # Keep only plausible participants, as a CSV directory
//! rideshare-solver filter participants.json --output verified/
//!
//! # Compare tolerances, JSON output for scripting
//! rideshare-solver sweep verified/ --tolerances 0.5,1,2 --format json
//! ```

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::core::dataset::Dataset;
use crate::parsing;

pub mod filter;
pub mod inspect;
pub mod solve;
pub mod sweep;

#[derive(Parser)]
#[command(name = "rideshare-solver")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Optimal batch matching of drivers, riders and shifters")]
#[command(
    long_about = "rideshare-solver pairs trip participants into shared rides.\n\nDrivers offer seats, riders need one, and shifters may either drive or ride. Pairings must depart within 30 minutes of each other, start and end within a distance tolerance, and respect pet, smoker and accessibility answers. The solver maximizes the number of pairings and reports:\n- Every selected pairing with its time gap and distances\n- Whether the result is proven optimal\n- How long each stage took"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove participants with no plausible counterpart
    Filter(filter::FilterArgs),

    /// Find an optimal matching
    Solve(solve::SolveArgs),

    /// Solve at several geofence tolerances
    Sweep(sweep::SweepArgs),

    /// Summarize a dataset without solving
    Inspect(inspect::InspectArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Load a dataset for a subcommand, attaching the path to any error
fn load_input(path: &Path, verbose: bool) -> anyhow::Result<Dataset> {
    let dataset = parsing::load_dataset(path)
        .with_context(|| format!("Failed to load dataset from {}", path.display()))?;

    if verbose {
        let counts = dataset.counts();
        eprintln!(
            "Loaded {} drivers, {} riders, {} shifters from {}",
            counts.drivers,
            counts.riders,
            counts.shifters,
            path.display()
        );
    }
    Ok(dataset)
}
