//! Feature preprocessing pipeline

use super::{
    encoder::OneHotEncoder,
    imputer::{ImputeStrategy, Imputer},
    scaler::StandardScaler,
};
use crate::data::{CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};
use crate::error::{Result, ScorecastError};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Column-wise preprocessor that turns the raw student table into a dense
/// feature matrix with a fixed column order.
///
/// Numeric columns are median-imputed and z-scored; categorical columns are
/// most-frequent-imputed, one-hot encoded against the fit-time category set,
/// and the resulting indicators are rescaled to unit variance without
/// centering. All statistics come from the fit data and are frozen for every
/// later transform.
///
/// Output column order is numeric columns in schema order followed by the
/// indicator blocks of each categorical column in schema order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePipeline {
    numeric_imputer: Imputer,
    numeric_scaler: StandardScaler,
    categorical_imputer: Imputer,
    encoder: OneHotEncoder,
    indicator_scaler: StandardScaler,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self {
            numeric_imputer: Imputer::new(ImputeStrategy::Median),
            numeric_scaler: StandardScaler::new(true),
            categorical_imputer: Imputer::new(ImputeStrategy::MostFrequent),
            encoder: OneHotEncoder::new(),
            indicator_scaler: StandardScaler::new(false),
            feature_names: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn all column statistics from the training rows.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        Self::check_schema(df)?;
        if df.height() == 0 {
            return Err(ScorecastError::Fit(
                "cannot fit preprocessor on zero rows".to_string(),
            ));
        }

        let df = self.numeric_imputer.fit(df, &NUMERIC_COLUMNS)?.transform(df)?;
        self.numeric_scaler.fit(&df, &NUMERIC_COLUMNS)?;

        let df = self
            .categorical_imputer
            .fit(&df, &CATEGORICAL_COLUMNS)?
            .transform(&df)?;
        let encoded = self.encoder.fit(&df, &CATEGORICAL_COLUMNS)?.transform(&df)?;

        let indicator_names = self.encoder.output_columns();
        let indicator_refs: Vec<&str> = indicator_names.iter().map(|s| s.as_str()).collect();
        self.indicator_scaler.fit(&encoded, &indicator_refs)?;

        self.feature_names = NUMERIC_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(indicator_names)
            .collect();
        self.is_fitted = true;

        debug!(
            rows = df.height(),
            features = self.feature_names.len(),
            "fitted feature pipeline"
        );
        Ok(self)
    }

    /// Apply the fitted transforms and assemble the feature matrix.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ScorecastError::ModelNotFitted);
        }
        Self::check_schema(df)?;

        let df = self.numeric_imputer.transform(df)?;
        let df = self.numeric_scaler.transform(&df)?;
        let df = self.categorical_imputer.transform(&df)?;
        let df = self.encoder.transform(&df)?;
        let df = self.indicator_scaler.transform(&df)?;

        let n_rows = df.height();
        let n_features = self.feature_names.len();
        let mut matrix = Array2::zeros((n_rows, n_features));

        for (j, name) in self.feature_names.iter().enumerate() {
            let column = df
                .column(name)
                .map_err(|_| ScorecastError::Schema(format!("missing column '{}'", name)))?;
            let ca = column
                .as_materialized_series()
                .f64()
                .map_err(|e| ScorecastError::Data(e.to_string()))?;
            for (i, value) in ca.into_iter().enumerate() {
                matrix[[i, j]] = value.ok_or_else(|| {
                    ScorecastError::Data(format!("null survived imputation in '{}'", name))
                })?;
            }
        }

        Ok(matrix)
    }

    /// Fit on the rows and return their feature matrix.
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Output feature names in matrix column order. Empty before fit.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn check_schema(df: &DataFrame) -> Result<()> {
        for col in NUMERIC_COLUMNS.iter().chain(CATEGORICAL_COLUMNS.iter()) {
            if df.column(col).is_err() {
                return Err(ScorecastError::Schema(format!("missing column '{}'", col)));
            }
        }
        Ok(())
    }
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        df!(
            "gender" => ["female", "male", "female", "male"],
            "race_ethnicity" => ["group A", "group B", "group B", "group C"],
            "parental_level_of_education" => ["some college", "high school", "high school", "master's degree"],
            "lunch" => ["standard", "free/reduced", "standard", "standard"],
            "test_preparation_course" => ["none", "completed", "none", "none"],
            "reading_score" => [72.0, 90.0, 47.0, 76.0],
            "writing_score" => [74.0, 88.0, 44.0, 78.0],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_transform_shape_and_order() {
        let df = sample_frame();
        let mut pipeline = FeaturePipeline::new();
        let matrix = pipeline.fit_transform(&df).unwrap();

        // 2 numeric + (2 + 3 + 3 + 2 + 2) indicators.
        assert_eq!(matrix.nrows(), 4);
        assert_eq!(matrix.ncols(), 14);
        assert_eq!(pipeline.feature_names()[0], "reading_score");
        assert_eq!(pipeline.feature_names()[1], "writing_score");
        assert_eq!(pipeline.feature_names()[2], "gender_female");
        assert!(pipeline
            .feature_names()
            .last()
            .unwrap()
            .starts_with("test_preparation_course_"));
    }

    #[test]
    fn test_numeric_columns_are_centered() {
        let df = sample_frame();
        let mut pipeline = FeaturePipeline::new();
        let matrix = pipeline.fit_transform(&df).unwrap();

        let mean: f64 = matrix.column(0).sum() / matrix.nrows() as f64;
        assert!(mean.abs() < 1e-10);
    }

    #[test]
    fn test_indicator_columns_not_centered() {
        let df = sample_frame();
        let mut pipeline = FeaturePipeline::new();
        let matrix = pipeline.fit_transform(&df).unwrap();

        // Indicator columns stay non-negative after scale-only treatment.
        for j in 2..matrix.ncols() {
            assert!(matrix.column(j).iter().all(|v| *v >= 0.0));
        }
    }

    #[test]
    fn test_transform_uses_frozen_stats() {
        let df = sample_frame();
        let mut pipeline = FeaturePipeline::new();
        pipeline.fit(&df).unwrap();

        let single = df!(
            "gender" => ["female"],
            "race_ethnicity" => ["group A"],
            "parental_level_of_education" => ["some college"],
            "lunch" => ["standard"],
            "test_preparation_course" => ["none"],
            "reading_score" => [72.0],
            "writing_score" => [74.0],
        )
        .unwrap();

        let full = pipeline.transform(&df).unwrap();
        let one = pipeline.transform(&single).unwrap();
        assert_eq!(one.nrows(), 1);
        for j in 0..full.ncols() {
            assert!((full[[0, j]] - one[[0, j]]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unseen_category_is_zero_block() {
        let df = sample_frame();
        let mut pipeline = FeaturePipeline::new();
        pipeline.fit(&df).unwrap();

        let unseen = df!(
            "gender" => ["female"],
            "race_ethnicity" => ["group Z"],
            "parental_level_of_education" => ["some college"],
            "lunch" => ["standard"],
            "test_preparation_course" => ["none"],
            "reading_score" => [70.0],
            "writing_score" => [70.0],
        )
        .unwrap();

        let matrix = pipeline.transform(&unseen).unwrap();
        let race_cols: Vec<usize> = pipeline
            .feature_names()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.starts_with("race_ethnicity_"))
            .map(|(j, _)| j)
            .collect();
        assert!(!race_cols.is_empty());
        for j in race_cols {
            assert_eq!(matrix[[0, j]], 0.0);
        }
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let df = sample_frame().drop("lunch").unwrap();
        let mut pipeline = FeaturePipeline::new();
        assert!(matches!(
            pipeline.fit(&df),
            Err(ScorecastError::Schema(_))
        ));
    }

    #[test]
    fn test_fit_zero_rows() {
        let df = sample_frame().head(Some(0));
        let mut pipeline = FeaturePipeline::new();
        assert!(matches!(pipeline.fit(&df), Err(ScorecastError::Fit(_))));
    }

    #[test]
    fn test_transform_before_fit() {
        let pipeline = FeaturePipeline::new();
        assert!(matches!(
            pipeline.transform(&sample_frame()),
            Err(ScorecastError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_serde_round_trip_preserves_output() {
        let df = sample_frame();
        let mut pipeline = FeaturePipeline::new();
        let before = pipeline.fit_transform(&df).unwrap();

        let json = serde_json::to_string(&pipeline).unwrap();
        let restored: FeaturePipeline = serde_json::from_str(&json).unwrap();
        let after = restored.transform(&df).unwrap();
        assert_eq!(before, after);
    }
}
