#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CLI for the risk density model.
//!
//! `train` fits the model from a CSV of historical incidents and writes
//! the artifact, `score` answers a single point query against a saved
//! artifact, and `info` prints the artifact's summary statistics (the
//! same data a health/info endpoint would expose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hotspot_map_density::{DEFAULT_GRID_RESOLUTION, HotspotModel, QueryContext, persist};
use hotspot_map_density_models::{Bandwidth, RiskLevel};

#[derive(Parser)]
#[command(name = "hotspot_map_cli", about = "Risk density model tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the density model from a CSV of incidents
    Train {
        /// Input CSV with latitude, longitude, hour, day_of_week columns
        input: PathBuf,
        /// Output artifact path
        #[arg(long, default_value = "models/density_hotspot_model.json")]
        output: PathBuf,
        /// Grid spacing in degrees
        #[arg(long, default_value_t = DEFAULT_GRID_RESOLUTION)]
        resolution: f64,
        /// Fixed bandwidth factor; Scott's rule when omitted
        #[arg(long)]
        bandwidth: Option<f64>,
    },
    /// Score a point against a saved artifact
    #[command(allow_negative_numbers = true)]
    Score {
        /// Artifact path
        model: PathBuf,
        /// Query latitude
        lat: f64,
        /// Query longitude
        lon: f64,
        /// Hour of day (with --day-of-week, selects the period surface)
        #[arg(long)]
        hour: Option<u8>,
        /// Day of week, 0 = Monday .. 6 = Sunday
        #[arg(long)]
        day_of_week: Option<u8>,
        /// Override the derived weekend flag
        #[arg(long)]
        weekend: Option<bool>,
        /// Comuna qualifier
        #[arg(long)]
        comuna: Option<u32>,
        /// Barrio qualifier
        #[arg(long)]
        barrio: Option<u32>,
    },
    /// Print a saved artifact's summary statistics
    Info {
        /// Artifact path
        model: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            input,
            output,
            resolution,
            bandwidth,
        } => train(&input, &output, resolution, bandwidth)?,
        Commands::Score {
            model,
            lat,
            lon,
            hour,
            day_of_week,
            weekend,
            comuna,
            barrio,
        } => {
            let context = QueryContext {
                hour,
                day_of_week,
                is_weekend: weekend,
                comuna,
                barrio,
            };
            score(&model, lat, lon, &context)?;
        }
        Commands::Info { model } => info(&model)?,
    }

    Ok(())
}

/// Loads the dataset, fits the model, saves the artifact, and logs a
/// smoke prediction at the dataset's median coordinate.
fn train(
    input: &std::path::Path,
    output: &std::path::Path,
    resolution: f64,
    bandwidth: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let incidents = hotspot_map_dataset::load_incidents(input)?;

    let bandwidth = bandwidth.map_or(Bandwidth::Scott, Bandwidth::Factor);
    let model = HotspotModel::fit(&incidents, resolution, bandwidth)?;
    persist::save(&model, output)?;

    // Smoke prediction at the median coordinate, weekday afternoon.
    let median_lat = median(incidents.iter().map(|i| i.latitude).collect());
    let median_lon = median(incidents.iter().map(|i| i.longitude).collect());
    let probability = model.score(median_lat, median_lon, &QueryContext::at(14, 1));
    log::info!(
        "Test prediction at ({median_lat:.4}, {median_lon:.4}), weekday afternoon: {probability:.4}"
    );

    Ok(())
}

/// Scores one point and prints the result as JSON.
fn score(
    model_path: &std::path::Path,
    lat: f64,
    lon: f64,
    context: &QueryContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = persist::load(model_path)?;
    let probability = model.score(lat, lon, context);
    let level = RiskLevel::from_score(probability);

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "latitude": lat,
            "longitude": lon,
            "probability": probability,
            "risk": level,
        }))?
    );

    Ok(())
}

/// Prints the artifact's stats and geometry summary as JSON.
fn info(model_path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let model = persist::load(model_path)?;
    let keys: Vec<&str> = model.surface_keys().collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "grid_resolution": model.grid_resolution(),
            "grid_size": model.grid_size(),
            "surface_count": model.surface_count(),
            "surface_keys": keys,
            "bounds": model.bounds(),
            "stats": model.stats(),
        }))?
    );

    Ok(())
}

/// Median of a list of values, averaging the two middle elements for
/// even-length input. The training CLI never calls this with an empty
/// list: training fails earlier on an empty dataset.
fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        f64::midpoint(values[mid - 1], values[mid])
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_length_is_middle_element() {
        assert!((median(vec![6.3, 6.1, 6.2]) - 6.2).abs() < f64::EPSILON);
    }

    #[test]
    fn median_of_even_length_averages_middle_pair() {
        assert!((median(vec![4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn median_of_empty_input_is_zero() {
        assert!(median(Vec::new()).abs() < f64::EPSILON);
    }
}
