//! Inference module
//!
//! Persistence of the preprocessor/model artifact pair and the prediction
//! service that serves scores from a loaded pair.

pub mod artifacts;
pub mod service;

pub use artifacts::{load_artifacts, save_artifacts, LoadedArtifacts, MODEL_FILE, PREPROCESSOR_FILE};
pub use service::PredictionService;
