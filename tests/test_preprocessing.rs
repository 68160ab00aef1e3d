//! Integration test: feature pipeline contract

use polars::prelude::*;
use scorecast::{FeaturePipeline, ScorecastError};

fn sample_df() -> DataFrame {
    df!(
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
    .unwrap()
}

#[test]
fn test_fit_transform_shape_and_names() {
    let mut pipeline = FeaturePipeline::new();
    let x = pipeline.fit_transform(&sample_df()).unwrap();

    // 2 numeric + (2 + 3 + 3 + 2 + 2) one-hot indicators.
    assert_eq!(x.dim(), (6, 14));
    assert_eq!(pipeline.n_features(), 14);

    let names = pipeline.feature_names();
    assert_eq!(names[0], "reading_score");
    assert_eq!(names[1], "writing_score");
    assert!(names[2..].iter().all(|n| n.contains('_')));
}

#[test]
fn test_transform_uses_frozen_statistics() {
    let mut pipeline = FeaturePipeline::new();
    let fitted = pipeline.fit_transform(&sample_df()).unwrap();

    // Transforming the same frame twice must reproduce the fit output exactly.
    let again = pipeline.transform(&sample_df()).unwrap();
    assert_eq!(fitted, again);

    // A single row transforms against the training statistics, not its own.
    let one = sample_df().head(Some(1));
    let row = pipeline.transform(&one).unwrap();
    assert_eq!(row.nrows(), 1);
    for j in 0..row.ncols() {
        assert!((row[[0, j]] - fitted[[0, j]]).abs() < 1e-12);
    }
}

#[test]
fn test_numeric_columns_are_centered() {
    let mut pipeline = FeaturePipeline::new();
    let x = pipeline.fit_transform(&sample_df()).unwrap();

    for j in 0..2 {
        let mean: f64 = x.column(j).sum() / x.nrows() as f64;
        assert!(mean.abs() < 1e-9, "column {} mean is {}", j, mean);
    }
}

#[test]
fn test_unseen_category_maps_to_zero_block() {
    let mut pipeline = FeaturePipeline::new();
    pipeline.fit_transform(&sample_df()).unwrap();

    let unseen = df!(
        "gender" => ["female"],
        "race_ethnicity" => ["group Z"],
        "parental_level_of_education" => ["high school"],
        "lunch" => ["standard"],
        "test_preparation_course" => ["none"],
        "reading_score" => [70.0],
        "writing_score" => [70.0],
    )
    .unwrap();

    let x = pipeline.transform(&unseen).unwrap();
    let names = pipeline.feature_names();
    for (j, name) in names.iter().enumerate() {
        if name.starts_with("race_ethnicity_") {
            assert_eq!(x[[0, j]], 0.0, "{} should be zero", name);
        }
    }
}

#[test]
fn test_missing_column_is_schema_error() {
    let mut pipeline = FeaturePipeline::new();
    let df = sample_df().drop("lunch").unwrap();
    assert!(matches!(
        pipeline.fit_transform(&df),
        Err(ScorecastError::Schema(_))
    ));
}

#[test]
fn test_serialized_pipeline_transforms_identically() {
    let mut pipeline = FeaturePipeline::new();
    let x = pipeline.fit_transform(&sample_df()).unwrap();

    let json = serde_json::to_string(&pipeline).unwrap();
    let restored: FeaturePipeline = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.transform(&sample_df()).unwrap(), x);
}
