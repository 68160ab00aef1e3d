//! Error types for the scorecast crate

use thiserror::Error;

/// Result type alias for scorecast operations
pub type Result<T> = std::result::Result<T, ScorecastError>;

/// Main error type for the scorecast crate
#[derive(Error, Debug)]
pub enum ScorecastError {
    /// A required column or record field is missing or malformed.
    #[error("schema error: {0}")]
    Schema(String),

    /// Degenerate training input (e.g. fitting on zero rows).
    #[error("fit error: {0}")]
    Fit(String),

    /// Every candidate scored below the acceptance threshold.
    #[error("no acceptable model: best candidate '{best_name}' scored R² = {best_score:.4}, threshold is {threshold}")]
    NoAcceptableModel {
        best_name: String,
        best_score: f64,
        threshold: f64,
    },

    /// Persisted preprocessor/model state is missing, corrupt, or mismatched.
    #[error("artifact load error: {0}")]
    ArtifactLoad(String),

    /// Single-record inference failed; the original cause is preserved.
    #[error("prediction failed")]
    Prediction(#[source] Box<ScorecastError>),

    #[error("data error: {0}")]
    Data(String),

    #[error("invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("model not fitted")]
    ModelNotFitted,

    #[error("invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ScorecastError {
    /// Wrap any error as a per-request prediction failure, keeping the cause.
    pub fn prediction(cause: ScorecastError) -> Self {
        ScorecastError::Prediction(Box::new(cause))
    }
}

impl From<polars::error::PolarsError> for ScorecastError {
    fn from(err: polars::error::PolarsError) -> Self {
        ScorecastError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for ScorecastError {
    fn from(err: serde_json::Error) -> Self {
        ScorecastError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ScorecastError {
    fn from(err: ndarray::ShapeError) -> Self {
        ScorecastError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
