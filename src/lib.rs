//! Scorecast - exam score prediction
//!
//! Predicts a student's math score from demographic fields and the two other
//! exam scores. The crate is organized around three stages:
//!
//! - [`preprocessing`] - imputation, one-hot encoding, scaling
//! - [`training`] - native regressors, grid search, cross-validated selection
//! - [`inference`] - artifact persistence and the prediction service
//!
//! [`data`] holds the dataset schema, record type, and the train/test split;
//! [`cli`] exposes the `train` and `predict` subcommands.

pub mod cli;
pub mod data;
pub mod error;
pub mod inference;
pub mod preprocessing;
pub mod training;

pub use data::StudentRecord;
pub use error::{Result, ScorecastError};
pub use inference::PredictionService;
pub use preprocessing::FeaturePipeline;
pub use training::{default_candidates, select_best, SelectionConfig, SelectionReport};
