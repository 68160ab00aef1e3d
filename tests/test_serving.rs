//! Integration test: prediction service and artifact handling

use polars::prelude::*;
use scorecast::inference::{load_artifacts, save_artifacts, PredictionService};
use scorecast::training::ParamSet;
use scorecast::{FeaturePipeline, ScorecastError, StudentRecord};

fn train_into(dir: &std::path::Path) {
    let df = df!(
        "gender" => ["female", "male", "female", "male", "female", "male"],
        "race_ethnicity" => ["group A", "group B", "group C", "group A", "group B", "group C"],
        "parental_level_of_education" => [
            "high school", "some college", "master's degree",
            "high school", "some college", "master's degree",
        ],
        "lunch" => ["standard", "free/reduced", "standard", "standard", "free/reduced", "standard"],
        "test_preparation_course" => ["none", "completed", "none", "completed", "none", "completed"],
        "reading_score" => [72.0, 90.0, 47.0, 76.0, 64.0, 88.0],
        "writing_score" => [74.0, 88.0, 44.0, 78.0, 60.0, 92.0],
    )
    .unwrap();

    let mut pipeline = FeaturePipeline::new();
    let x = pipeline.fit_transform(&df).unwrap();
    let y = ndarray::array![70.0, 86.0, 42.0, 75.0, 61.0, 90.0];
    let model = ParamSet::Linear.fit(&x, &y, 0).unwrap();
    save_artifacts(dir, &pipeline, &model, 0.95).unwrap();
}

fn valid_record() -> StudentRecord {
    StudentRecord {
        gender: "female".to_string(),
        race_ethnicity: "group B".to_string(),
        parental_level_of_education: "some college".to_string(),
        lunch: "standard".to_string(),
        test_preparation_course: "completed".to_string(),
        reading_score: 80.0,
        writing_score: 82.0,
    }
}

#[test]
fn test_service_predicts_from_saved_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    train_into(dir.path());

    let service = PredictionService::load(dir.path()).unwrap();
    assert_eq!(service.model_family(), "linear_regression");
    assert!(service.predict(&valid_record()).unwrap().is_finite());
}

#[test]
fn test_empty_field_fails_before_the_model_runs() {
    let dir = tempfile::tempdir().unwrap();
    train_into(dir.path());
    let service = PredictionService::load(dir.path()).unwrap();

    let mut record = valid_record();
    record.test_preparation_course = "  ".to_string();
    let err = service.predict(&record).unwrap_err();
    assert!(matches!(err, ScorecastError::Schema(_)));
}

#[test]
fn test_record_json_requires_every_field() {
    // Serving accepts records as JSON; a missing field is a parse failure,
    // not a silent default.
    let partial = r#"{
        "gender": "female",
        "race_ethnicity": "group B",
        "parental_level_of_education": "some college",
        "lunch": "standard",
        "test_preparation_course": "completed",
        "reading_score": 80.0
    }"#;
    assert!(serde_json::from_str::<StudentRecord>(partial).is_err());
}

#[test]
fn test_reload_swaps_to_newer_pair() {
    let dir = tempfile::tempdir().unwrap();
    train_into(dir.path());
    let service = PredictionService::load(dir.path()).unwrap();
    let first_tag = service.pair_tag();

    // Retrain into the same directory; the running service only picks the
    // new pair up on reload.
    std::thread::sleep(std::time::Duration::from_millis(5));
    train_into(dir.path());
    assert_eq!(service.pair_tag(), first_tag);

    let new_tag = service.reload().unwrap();
    assert_ne!(new_tag, first_tag);
    assert!(service.predict(&valid_record()).unwrap().is_finite());
}

#[test]
fn test_loaded_pair_reports_metadata() {
    let dir = tempfile::tempdir().unwrap();
    train_into(dir.path());

    let loaded = load_artifacts(dir.path()).unwrap();
    assert_eq!(loaded.family, "linear_regression");
    assert_eq!(loaded.test_r2, 0.95);
    assert!(loaded.pipeline.is_fitted());
}
