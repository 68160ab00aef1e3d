//! Artifact persistence
//!
//! The preprocessor and the winning model are saved as a pair of JSON blobs
//! stamped with a shared `pair_tag`. The tag exists so a loader can refuse a
//! preprocessor from one training run combined with a model from another.

use crate::error::{Result, ScorecastError};
use crate::preprocessing::FeaturePipeline;
use crate::training::FittedModel;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const MODEL_FILE: &str = "model.json";

#[derive(Debug, Serialize, Deserialize)]
struct PreprocessorArtifact {
    pair_tag: String,
    pipeline: FeaturePipeline,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    pair_tag: String,
    family: String,
    test_r2: f64,
    model: FittedModel,
}

/// A matched preprocessor/model pair as loaded from disk.
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub pair_tag: String,
    pub family: String,
    pub test_r2: f64,
    pub pipeline: FeaturePipeline,
    pub model: FittedModel,
}

/// Write both artifacts under `dir` with a fresh shared tag; returns the tag.
pub fn save_artifacts(
    dir: &Path,
    pipeline: &FeaturePipeline,
    model: &FittedModel,
    test_r2: f64,
) -> Result<String> {
    fs::create_dir_all(dir)?;
    let pair_tag = Utc::now().to_rfc3339();

    let preprocessor = PreprocessorArtifact {
        pair_tag: pair_tag.clone(),
        pipeline: pipeline.clone(),
    };
    let model_artifact = ModelArtifact {
        pair_tag: pair_tag.clone(),
        family: model.family().to_string(),
        test_r2,
        model: model.clone(),
    };

    fs::write(
        dir.join(PREPROCESSOR_FILE),
        serde_json::to_vec_pretty(&preprocessor)?,
    )?;
    fs::write(
        dir.join(MODEL_FILE),
        serde_json::to_vec_pretty(&model_artifact)?,
    )?;

    info!(dir = %dir.display(), pair_tag = %pair_tag, "saved artifact pair");
    Ok(pair_tag)
}

/// Load both artifacts from `dir`, refusing a mismatched pair.
pub fn load_artifacts(dir: &Path) -> Result<LoadedArtifacts> {
    let preprocessor: PreprocessorArtifact = read_json(&dir.join(PREPROCESSOR_FILE))?;
    let model: ModelArtifact = read_json(&dir.join(MODEL_FILE))?;

    if preprocessor.pair_tag != model.pair_tag {
        return Err(ScorecastError::ArtifactLoad(format!(
            "artifact pair mismatch: preprocessor tagged '{}', model tagged '{}'",
            preprocessor.pair_tag, model.pair_tag
        )));
    }
    if !preprocessor.pipeline.is_fitted() {
        return Err(ScorecastError::ArtifactLoad(
            "persisted preprocessor is not fitted".to_string(),
        ));
    }

    Ok(LoadedArtifacts {
        pair_tag: model.pair_tag,
        family: model.family,
        test_r2: model.test_r2,
        pipeline: preprocessor.pipeline,
        model: model.model,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| {
        ScorecastError::ArtifactLoad(format!("cannot read '{}': {}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ScorecastError::ArtifactLoad(format!("cannot parse '{}': {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ParamSet;
    use polars::prelude::*;

    fn fitted_pair() -> (FeaturePipeline, FittedModel) {
        let df = df!(
            "gender" => ["female", "male", "female", "male"],
            "race_ethnicity" => ["group A", "group B", "group B", "group C"],
            "parental_level_of_education" => ["some college", "high school", "high school", "master's degree"],
            "lunch" => ["standard", "free/reduced", "standard", "standard"],
            "test_preparation_course" => ["none", "completed", "none", "none"],
            "reading_score" => [72.0, 90.0, 47.0, 76.0],
            "writing_score" => [74.0, 88.0, 44.0, 78.0],
        )
        .unwrap();

        let mut pipeline = FeaturePipeline::new();
        let x = pipeline.fit_transform(&df).unwrap();
        let y = ndarray::array![70.0, 85.0, 45.0, 72.0];
        let model = ParamSet::Linear.fit(&x, &y, 0).unwrap();
        (pipeline, model)
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, model) = fitted_pair();

        let tag = save_artifacts(dir.path(), &pipeline, &model, 0.9).unwrap();
        let loaded = load_artifacts(dir.path()).unwrap();

        assert_eq!(loaded.pair_tag, tag);
        assert_eq!(loaded.family, "linear_regression");
        assert_eq!(loaded.test_r2, 0.9);
    }

    #[test]
    fn test_missing_file_is_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_artifacts(dir.path()),
            Err(ScorecastError::ArtifactLoad(_))
        ));
    }

    #[test]
    fn test_mismatched_pair_rejected() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let (pipeline, model) = fitted_pair();

        save_artifacts(dir_a.path(), &pipeline, &model, 0.9).unwrap();
        // A second save gets a different timestamp tag.
        std::thread::sleep(std::time::Duration::from_millis(5));
        save_artifacts(dir_b.path(), &pipeline, &model, 0.9).unwrap();

        // Pair one run's preprocessor with the other run's model.
        std::fs::copy(
            dir_b.path().join(MODEL_FILE),
            dir_a.path().join(MODEL_FILE),
        )
        .unwrap();

        let err = load_artifacts(dir_a.path()).unwrap_err();
        assert!(matches!(err, ScorecastError::ArtifactLoad(_)));
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn test_corrupt_blob_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, model) = fitted_pair();
        save_artifacts(dir.path(), &pipeline, &model, 0.9).unwrap();
        std::fs::write(dir.path().join(MODEL_FILE), b"not json").unwrap();

        assert!(matches!(
            load_artifacts(dir.path()),
            Err(ScorecastError::ArtifactLoad(_))
        ));
    }
}
