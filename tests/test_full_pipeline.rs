//! Integration test: train, persist, and serve end to end

use polars::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use scorecast::data::{target_array, train_test_split};
use scorecast::inference::{save_artifacts, PredictionService};
use scorecast::training::{select_best, Candidate, ParamSet, SelectionConfig};
use scorecast::{FeaturePipeline, ScorecastError, StudentRecord};

const GENDERS: [&str; 2] = ["female", "male"];
const GROUPS: [&str; 4] = ["group A", "group B", "group C", "group D"];
const EDUCATION: [&str; 4] = [
    "high school",
    "some college",
    "bachelor's degree",
    "master's degree",
];
const LUNCH: [&str; 2] = ["standard", "free/reduced"];
const PREP: [&str; 2] = ["none", "completed"];

/// Synthetic student rows with a mostly linear math score so a reasonable
/// model clears the acceptance threshold.
fn synthetic_students(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut genders = Vec::with_capacity(n);
    let mut groups = Vec::with_capacity(n);
    let mut education = Vec::with_capacity(n);
    let mut lunch = Vec::with_capacity(n);
    let mut prep = Vec::with_capacity(n);
    let mut reading = Vec::with_capacity(n);
    let mut writing = Vec::with_capacity(n);
    let mut math = Vec::with_capacity(n);

    for i in 0..n {
        let r: f64 = rng.gen_range(40.0..100.0);
        let w = (r + rng.gen_range(-8.0..8.0)).clamp(0.0, 100.0);
        let prep_bonus = if i % 2 == 0 { 3.0 } else { 0.0 };
        let m = 0.5 * r + 0.4 * w + prep_bonus + rng.gen_range(-2.0..2.0);

        genders.push(GENDERS[i % 2]);
        groups.push(GROUPS[i % 4]);
        education.push(EDUCATION[i % 4]);
        lunch.push(LUNCH[i % 2]);
        prep.push(PREP[i % 2]);
        reading.push(r);
        writing.push(w);
        math.push(m);
    }

    df!(
        "gender" => genders,
        "race_ethnicity" => groups,
        "parental_level_of_education" => education,
        "lunch" => lunch,
        "test_preparation_course" => prep,
        "reading_score" => reading,
        "writing_score" => writing,
        "math_score" => math,
    )
    .unwrap()
}

/// A small candidate list that keeps the test quick.
fn fast_candidates() -> Vec<Candidate> {
    vec![
        Candidate::new("linear_regression", vec![ParamSet::Linear]),
        Candidate::new(
            "random_forest",
            vec![ParamSet::RandomForest {
                n_estimators: 20,
                max_depth: 8,
            }],
        ),
    ]
}

#[test]
fn test_train_persist_predict_round_trip() {
    let df = synthetic_students(160, 11);
    let (train_df, test_df) = train_test_split(&df, 0.2, 42).unwrap();
    let y_train = target_array(&train_df).unwrap();
    let y_test = target_array(&test_df).unwrap();

    let mut pipeline = FeaturePipeline::new();
    let x_train = pipeline.fit_transform(&train_df).unwrap();
    let x_test = pipeline.transform(&test_df).unwrap();

    let (model, report) = select_best(
        &x_train,
        &y_train,
        &x_test,
        &y_test,
        &fast_candidates(),
        &SelectionConfig::default(),
    )
    .unwrap();
    assert!(report.winner_test_r2 >= 0.6);

    let dir = tempfile::tempdir().unwrap();
    save_artifacts(dir.path(), &pipeline, &model, report.winner_test_r2).unwrap();

    let service = PredictionService::load(dir.path()).unwrap();
    // "group E" never appears in training; the unseen category must not
    // block the prediction.
    let record = StudentRecord {
        gender: "female".to_string(),
        race_ethnicity: "group E".to_string(),
        parental_level_of_education: "master's degree".to_string(),
        lunch: "standard".to_string(),
        test_preparation_course: "completed".to_string(),
        reading_score: 95.0,
        writing_score: 93.0,
    };
    let score = service.predict(&record).unwrap();
    assert!(score.is_finite());
    // Strong reading and writing scores should land in the upper range.
    assert!(score > 60.0, "expected a high prediction, got {}", score);
}

#[test]
fn test_out_of_range_score_still_predicts() {
    let df = synthetic_students(120, 3);
    let (train_df, test_df) = train_test_split(&df, 0.2, 0).unwrap();
    let y_train = target_array(&train_df).unwrap();
    let y_test = target_array(&test_df).unwrap();

    let mut pipeline = FeaturePipeline::new();
    let x_train = pipeline.fit_transform(&train_df).unwrap();
    let x_test = pipeline.transform(&test_df).unwrap();

    let (model, report) = select_best(
        &x_train,
        &y_train,
        &x_test,
        &y_test,
        &fast_candidates(),
        &SelectionConfig::default(),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    save_artifacts(dir.path(), &pipeline, &model, report.winner_test_r2).unwrap();
    let service = PredictionService::load(dir.path()).unwrap();

    // 150 is outside the nominal 0..100 range; ranges are not enforced.
    let record = StudentRecord {
        gender: "male".to_string(),
        race_ethnicity: "group B".to_string(),
        parental_level_of_education: "high school".to_string(),
        lunch: "standard".to_string(),
        test_preparation_course: "none".to_string(),
        reading_score: 150.0,
        writing_score: 80.0,
    };
    assert!(service.predict(&record).unwrap().is_finite());
}

#[test]
fn test_missing_column_rejected_before_model() {
    let df = synthetic_students(60, 5);
    let mut pipeline = FeaturePipeline::new();
    pipeline.fit_transform(&df).unwrap();

    let incomplete = df.drop("writing_score").unwrap();
    let err = pipeline.transform(&incomplete).unwrap_err();
    assert!(matches!(err, ScorecastError::Schema(_)));
    assert!(err.to_string().contains("writing_score"));
}

#[test]
fn test_selection_is_deterministic_end_to_end() {
    let df = synthetic_students(100, 9);

    let run = || {
        let (train_df, test_df) = train_test_split(&df, 0.2, 42).unwrap();
        let y_train = target_array(&train_df).unwrap();
        let y_test = target_array(&test_df).unwrap();

        let mut pipeline = FeaturePipeline::new();
        let x_train = pipeline.fit_transform(&train_df).unwrap();
        let x_test = pipeline.transform(&test_df).unwrap();

        let (_, report) = select_best(
            &x_train,
            &y_train,
            &x_test,
            &y_test,
            &fast_candidates(),
            &SelectionConfig::default(),
        )
        .unwrap();
        (report.winner, report.winner_test_r2)
    };

    let (winner_a, r2_a) = run();
    let (winner_b, r2_b) = run();
    assert_eq!(winner_a, winner_b);
    assert!((r2_a - r2_b).abs() < 1e-12);
}
