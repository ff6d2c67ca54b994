#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the hotspot toolchain.
//!
//! `train` reads the report and feature CSVs, runs the training pipeline,
//! and writes the artifact bundle. `predict` scores one JSON query against a
//! bundle and prints the response. `inspect` prints a bundle's metadata.
//!
//! Uses `indicatif-log-bridge` (via [`hotspot_map_cli_utils::init_logger`])
//! so log lines and the labeling progress bar share the terminal.

mod inspect;
mod table;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hotspot_map_cli_utils::{IndicatifProgress, MultiProgress};
use hotspot_map_config::HotspotMapConfig;
use hotspot_map_feature_models::{FeatureSchemaDefinition, RawRecord};
use hotspot_map_inference::{InferenceService, RiskBucketer};
use hotspot_map_inference_models::PredictionResponse;
use hotspot_map_pipeline::{FeatureTable, TrainingInput, TrainingPipeline};

use crate::inspect::BundleSummary;

#[derive(Parser)]
#[command(name = "hotspot_map", about = "Hotspot training and risk prediction")]
struct Cli {
    /// TOML config file (defaults to `$HOTSPOT_MAP_CONFIG`, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a hotspot model and write the artifact bundle
    Train {
        /// Incident report CSV (`latitude`, `longitude`, optional `timestamp`)
        #[arg(long)]
        reports: PathBuf,
        /// Feature CSV; derived from the reports when omitted
        #[arg(long)]
        features: Option<PathBuf>,
        /// Where to write the bundle (defaults to `[artifacts] path`)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Score one JSON query against a bundle
    Predict {
        /// Bundle to load (defaults to `[artifacts] path`)
        #[arg(long)]
        bundle: Option<PathBuf>,
        /// JSON object, e.g. `{"latitude": 40.08, "longitude": -75.7, "hour": 18, "dayofweek": 2, "month": 6}`
        #[arg(long)]
        query: String,
    },
    /// Print a bundle's metadata as JSON
    Inspect {
        /// Bundle to read (defaults to `[artifacts] path`)
        #[arg(long)]
        bundle: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = hotspot_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = HotspotMapConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Train {
            reports,
            features,
            out,
        } => {
            let out = out.unwrap_or_else(|| config.artifacts.path.clone());
            train(&multi, config, &reports, features.as_deref(), &out)?;
        }
        Commands::Predict { bundle, query } => {
            let bundle = bundle.unwrap_or_else(|| config.artifacts.path.clone());
            let response = predict(&config, &bundle, &query)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if matches!(response, PredictionResponse::Error(_)) {
                std::process::exit(1);
            }
        }
        Commands::Inspect { bundle } => {
            let bundle = bundle.unwrap_or_else(|| config.artifacts.path.clone());
            let artifacts = hotspot_map_artifacts::load(&bundle)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&BundleSummary::new(&artifacts))?
            );
        }
    }

    Ok(())
}

fn train(
    multi: &MultiProgress,
    config: HotspotMapConfig,
    reports_path: &Path,
    features_path: Option<&Path>,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let reports = table::read_reports(reports_path)?;
    let features = match features_path {
        Some(path) => table::read_features(path)?,
        None => {
            log::info!("No feature table given; deriving feature rows from the reports");
            FeatureTable::from_reports(&reports)
        }
    };

    let pipeline = TrainingPipeline::new(config)?;
    let progress = IndicatifProgress::rows_bar(multi, "Labeling feature rows");
    let outcome = pipeline.run(&TrainingInput { reports, features }, &progress)?;

    let checksum = hotspot_map_artifacts::save(&outcome.artifacts, out)?;

    println!(
        "Wrote bundle {} to {} (sha256 {checksum})",
        outcome.artifacts.version,
        out.display()
    );
    println!(
        "  {} hotspot centers, {} positive / {} negative rows, {} train / {} test",
        outcome.artifacts.hotspots.centers.len(),
        outcome.label_counts.positive,
        outcome.label_counts.negative,
        outcome.train_rows,
        outcome.test_rows
    );
    if let Some(report) = &outcome.artifacts.evaluation {
        println!("{report}");
    }

    Ok(())
}

fn predict(
    config: &HotspotMapConfig,
    bundle: &Path,
    query: &str,
) -> Result<PredictionResponse, Box<dyn std::error::Error>> {
    let raw: RawRecord = serde_json::from_str(query)?;
    let bucketer = RiskBucketer::from_config(&config.risk).ok_or_else(|| {
        format!(
            "invalid risk thresholds: high={} medium={}",
            config.risk.high, config.risk.medium
        )
    })?;

    let service =
        InferenceService::from_path(bundle, FeatureSchemaDefinition::hotspot_v1(), bucketer)?;

    Ok(service.respond(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hotspot_map_cli_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn train_then_predict_and_inspect() {
        let dir = temp_dir();
        let reports_path = dir.join("reports.csv");
        let mut reports = String::from("latitude,longitude,timestamp\n");
        for i in 0..8 {
            reports.push_str(&format!("40.0868,-75.7005,2024-06-0{}T18:00:00Z\n", i % 7 + 1));
        }
        for i in 0..30 {
            reports.push_str(&format!(
                "{},{},2024-0{}-10T0{}:00:00Z\n",
                39.0 + f64::from(i) * 0.02,
                -74.0 - f64::from(i) * 0.01,
                i % 9 + 1,
                i % 10
            ));
        }
        std::fs::write(&reports_path, reports).unwrap();

        let bundle = dir.join("bundle.json");
        let multi = MultiProgress::with_draw_target(
            hotspot_map_cli_utils::ProgressDrawTarget::hidden(),
        );
        train(
            &multi,
            HotspotMapConfig::default(),
            &reports_path,
            None,
            &bundle,
        )
        .unwrap();

        let response = predict(
            &HotspotMapConfig::default(),
            &bundle,
            r#"{"latitude": 40.0868, "longitude": -75.7005, "hour": 18, "dayofweek": 2, "month": 6}"#,
        )
        .unwrap();
        match response {
            PredictionResponse::Prediction(p) => assert_eq!(p.hotspot_prediction, 1, "{p:?}"),
            PredictionResponse::Error(e) => panic!("unexpected error: {e:?}"),
        }

        let response = predict(
            &HotspotMapConfig::default(),
            &bundle,
            r#"{"latitude": 40.0868, "longitude": -75.7005, "hour": 18}"#,
        )
        .unwrap();
        match response {
            PredictionResponse::Error(e) => assert_eq!(e.kind, "missing_feature"),
            PredictionResponse::Prediction(p) => panic!("expected an error, got {p:?}"),
        }

        let artifacts = hotspot_map_artifacts::load(&bundle).unwrap();
        let summary = serde_json::to_value(BundleSummary::new(&artifacts)).unwrap();
        assert_eq!(summary["hotspot_centers"], 1);
        assert_eq!(summary["hotspot_reports"], 8);

        std::fs::remove_dir_all(&dir).ok();
    }
}
