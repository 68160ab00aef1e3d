//! Prediction service
//!
//! Wraps a loaded artifact pair behind a read/write lock so concurrent
//! predictions share one immutable snapshot while `reload` swaps in a new
//! pair atomically. In-flight requests finish against the snapshot they
//! started with.

use super::artifacts::{load_artifacts, LoadedArtifacts};
use crate::data::StudentRecord;
use crate::error::{Result, ScorecastError};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct PredictionService {
    artifacts: RwLock<Arc<LoadedArtifacts>>,
    artifact_dir: PathBuf,
}

impl PredictionService {
    /// Load the artifact pair from `dir` and stand up the service.
    pub fn load(dir: &Path) -> Result<Self> {
        let artifacts = load_artifacts(dir)?;
        info!(
            pair_tag = %artifacts.pair_tag,
            family = %artifacts.family,
            test_r2 = artifacts.test_r2,
            "prediction service ready"
        );
        Ok(Self {
            artifacts: RwLock::new(Arc::new(artifacts)),
            artifact_dir: dir.to_path_buf(),
        })
    }

    /// Re-read the artifact pair from the service's directory and swap it in.
    /// On any load failure the previous pair stays active.
    pub fn reload(&self) -> Result<String> {
        let fresh = load_artifacts(&self.artifact_dir)?;
        let tag = fresh.pair_tag.clone();
        *self.artifacts.write() = Arc::new(fresh);
        info!(pair_tag = %tag, "artifact pair reloaded");
        Ok(tag)
    }

    /// Predict the math score for one student record.
    ///
    /// Validation failures surface as `Schema` errors before the model is
    /// consulted; anything that fails after validation is wrapped as a
    /// `Prediction` error.
    pub fn predict(&self, record: &StudentRecord) -> Result<f64> {
        record.validate()?;

        let snapshot = Arc::clone(&self.artifacts.read());
        let frame = record.to_dataframe()?;
        let features = snapshot
            .pipeline
            .transform(&frame)
            .map_err(ScorecastError::prediction)?;
        let predictions = snapshot
            .model
            .predict(&features)
            .map_err(ScorecastError::prediction)?;

        let score = predictions[0];
        debug!(score, pair_tag = %snapshot.pair_tag, "scored record");
        Ok(score)
    }

    /// Tag of the currently active artifact pair.
    pub fn pair_tag(&self) -> String {
        self.artifacts.read().pair_tag.clone()
    }

    /// Family name of the currently active model.
    pub fn model_family(&self) -> String {
        self.artifacts.read().family.clone()
    }
}
