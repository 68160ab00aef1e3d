//! Dataset schema, record type, CSV loading and the train/test split

use crate::error::{Result, ScorecastError};
use ndarray::Array1;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Categorical input columns, in schema order.
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "gender",
    "race_ethnicity",
    "parental_level_of_education",
    "lunch",
    "test_preparation_course",
];

/// Numeric input columns, in schema order.
pub const NUMERIC_COLUMNS: [&str; 2] = ["reading_score", "writing_score"];

/// Label column.
pub const TARGET_COLUMN: &str = "math_score";

/// One student observation as supplied by the serving layer.
///
/// All 7 fields are required; the declared 0–100 range for the score fields
/// is a UI concern and is not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub gender: String,
    pub race_ethnicity: String,
    pub parental_level_of_education: String,
    pub lunch: String,
    pub test_preparation_course: String,
    pub reading_score: f64,
    pub writing_score: f64,
}

impl StudentRecord {
    /// Check that every field is present and of the right type: categorical
    /// fields non-empty, numeric fields finite.
    pub fn validate(&self) -> Result<()> {
        let categoricals = [
            ("gender", &self.gender),
            ("race_ethnicity", &self.race_ethnicity),
            ("parental_level_of_education", &self.parental_level_of_education),
            ("lunch", &self.lunch),
            ("test_preparation_course", &self.test_preparation_course),
        ];
        for (name, value) in categoricals {
            if value.trim().is_empty() {
                return Err(ScorecastError::Schema(format!(
                    "field '{}' is empty",
                    name
                )));
            }
        }
        for (name, value) in [
            ("reading_score", self.reading_score),
            ("writing_score", self.writing_score),
        ] {
            if !value.is_finite() {
                return Err(ScorecastError::Schema(format!(
                    "field '{}' is not a finite number",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Convert into a single-row DataFrame matching the training schema.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = df!(
            "gender" => [self.gender.as_str()],
            "race_ethnicity" => [self.race_ethnicity.as_str()],
            "parental_level_of_education" => [self.parental_level_of_education.as_str()],
            "lunch" => [self.lunch.as_str()],
            "test_preparation_course" => [self.test_preparation_course.as_str()],
            "reading_score" => [self.reading_score],
            "writing_score" => [self.writing_score],
        )?;
        Ok(df)
    }
}

/// Load the raw dataset from a CSV file.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| ScorecastError::Data(e.to_string()))?
        .finish()
        .map_err(|e| ScorecastError::Data(e.to_string()))?;
    Ok(df)
}

/// Extract the label column as a float array.
pub fn target_array(df: &DataFrame) -> Result<Array1<f64>> {
    let series = df
        .column(TARGET_COLUMN)
        .map_err(|_| ScorecastError::Schema(format!("missing column '{}'", TARGET_COLUMN)))?;
    let casted = series.cast(&DataType::Float64)?;
    let values: Array1<f64> = casted
        .f64()
        .map_err(|e| ScorecastError::Data(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    if values.iter().any(|v| v.is_nan()) {
        return Err(ScorecastError::Data(format!(
            "column '{}' contains missing values",
            TARGET_COLUMN
        )));
    }
    Ok(values)
}

/// Shuffle and partition rows into train/test sets. The split happens once
/// per training run; both halves are immutable afterwards.
pub fn train_test_split(
    df: &DataFrame,
    test_fraction: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    let n = df.height();
    if n < 2 {
        return Err(ScorecastError::Fit(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }
    if !(0.0..1.0).contains(&test_fraction) || test_fraction <= 0.0 {
        return Err(ScorecastError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let mut indices: Vec<u32> = (0..n as u32).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = ((n as f64) * test_fraction).round() as usize;
    let test_size = test_size.clamp(1, n - 1);

    let test_idx = IdxCa::from_vec("idx".into(), indices[..test_size].to_vec());
    let train_idx = IdxCa::from_vec("idx".into(), indices[test_size..].to_vec());

    let test = df.take(&test_idx)?;
    let train = df.take(&train_idx)?;
    Ok((train, test))
}
