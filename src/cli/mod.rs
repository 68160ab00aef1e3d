//! Command-line interface
//!
//! Two subcommands: `train` runs the full preprocess / select / persist
//! pipeline on a CSV, `predict` scores one student record against a saved
//! artifact pair.

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::data::{load_csv, target_array, train_test_split, StudentRecord};
use crate::error::{Result, ScorecastError};
use crate::inference::{save_artifacts, PredictionService};
use crate::preprocessing::FeaturePipeline;
use crate::training::{default_candidates, select_best, SelectionConfig};

#[derive(Parser)]
#[command(name = "scorecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Exam score prediction: preprocessing, model selection, inference")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train on a CSV and persist the winning preprocessor/model pair
    Train {
        /// Input CSV with the full student schema
        #[arg(short, long)]
        data: PathBuf,

        /// Directory to write the artifact pair into
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Fraction of rows held out for the final test score
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Cross-validation folds for the grid search
        #[arg(long, default_value = "3")]
        folds: usize,

        /// Minimum test R² the winner must reach
        #[arg(long, default_value = "0.6")]
        threshold: f64,

        /// Seed for the split, folds, and stochastic estimators
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Score one student record against a saved artifact pair
    Predict {
        /// Directory holding the artifact pair
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// JSON file with one student record; reads stdin when omitted
        #[arg(short, long)]
        record: Option<PathBuf>,
    },
}

pub fn cmd_train(
    data: &Path,
    artifacts: &Path,
    test_fraction: f64,
    folds: usize,
    threshold: f64,
    seed: u64,
) -> Result<()> {
    let started = Instant::now();

    let df = load_csv(data)?;
    info!(rows = df.height(), cols = df.width(), "loaded dataset");

    let (train_df, test_df) = train_test_split(&df, test_fraction, seed)?;
    let y_train = target_array(&train_df)?;
    let y_test = target_array(&test_df)?;

    let mut pipeline = FeaturePipeline::new();
    let x_train = pipeline.fit_transform(&train_df)?;
    let x_test = pipeline.transform(&test_df)?;
    info!(features = pipeline.n_features(), "features prepared");

    let config = SelectionConfig {
        n_folds: folds,
        acceptance_threshold: threshold,
        seed,
    };
    let candidates = default_candidates();
    let (model, report) = select_best(&x_train, &y_train, &x_test, &y_test, &candidates, &config)?;

    println!("candidate scores (test R²):");
    for score in &report.scores {
        let marker = if score.name == report.winner { "*" } else { " " };
        println!(
            "  {} {:<24} cv={:.4}  test={:.4}  [{}]",
            marker, score.name, score.cv_score, score.test_r2, score.best_params
        );
    }

    let pair_tag = save_artifacts(artifacts, &pipeline, &model, report.winner_test_r2)?;
    println!(
        "selected '{}' (test R² = {:.4}), artifacts '{}' written to {} in {:.1}s",
        report.winner,
        report.winner_test_r2,
        pair_tag,
        artifacts.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

pub fn cmd_predict(artifacts: &Path, record_path: Option<&Path>) -> Result<()> {
    let raw = match record_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let record: StudentRecord = serde_json::from_str(&raw)
        .map_err(|e| ScorecastError::Schema(format!("cannot parse record: {}", e)))?;

    let service = PredictionService::load(artifacts)?;
    let score = service.predict(&record)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "predicted_math_score": score,
            "model_family": service.model_family(),
            "pair_tag": service.pair_tag(),
        }))?
    );
    Ok(())
}
