//! Missing value imputation

use crate::error::{Result, ScorecastError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the column median (numeric columns)
    Median,
    /// Replace with the most frequent value (categorical columns)
    MostFrequent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum FillValue {
    Numeric(f64),
    Text(String),
}

/// Imputer for handling missing values; fill values are learned at fit time
/// and reused unchanged for every later transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, FillValue>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Learn a fill value for each column.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| ScorecastError::Schema(format!("missing column '{}'", col_name)))?;
            let series = column.as_materialized_series();

            let fill_value = match self.strategy {
                ImputeStrategy::Median => {
                    let ca = series
                        .cast(&DataType::Float64)?
                        .f64()
                        .map_err(|e| ScorecastError::Data(e.to_string()))?
                        .clone();
                    let median = ca.median().ok_or_else(|| {
                        ScorecastError::Fit(format!("column '{}' has no values to impute from", col_name))
                    })?;
                    FillValue::Numeric(median)
                }
                ImputeStrategy::MostFrequent => {
                    let mode = Self::compute_mode_text(series)?;
                    FillValue::Text(mode)
                }
            };
            self.fill_values.insert(col_name.to_string(), fill_value);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill missing values using the fitted fill values.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ScorecastError::ModelNotFitted);
        }

        let mut result = df.clone();

        for (col_name, fill_value) in &self.fill_values {
            let column = df
                .column(col_name)
                .map_err(|_| ScorecastError::Schema(format!("missing column '{}'", col_name)))?;
            let series = column.as_materialized_series();
            if series.null_count() == 0 {
                continue;
            }

            let filled = match fill_value {
                FillValue::Numeric(v) => {
                    let ca = series
                        .cast(&DataType::Float64)?
                        .f64()
                        .map_err(|e| ScorecastError::Data(e.to_string()))?
                        .clone();
                    let values: Float64Chunked =
                        ca.into_iter().map(|opt| Some(opt.unwrap_or(*v))).collect();
                    values.with_name(series.name().clone()).into_series()
                }
                FillValue::Text(v) => {
                    let ca = series
                        .str()
                        .map_err(|e| ScorecastError::Data(e.to_string()))?;
                    let values: StringChunked = ca
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or(v.as_str()).to_string()))
                        .collect();
                    values.with_name(series.name().clone()).into_series()
                }
            };

            result = result
                .with_column(filled)
                .map_err(|e| ScorecastError::Data(e.to_string()))?
                .clone();
        }

        Ok(result)
    }

    /// Most frequent string value; ties broken by lexicographic order so the
    /// fitted state is deterministic.
    fn compute_mode_text(series: &Series) -> Result<String> {
        let ca = series
            .str()
            .map_err(|e| ScorecastError::Data(e.to_string()))?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for val in ca.into_iter().flatten() {
            *counts.entry(val).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(val, _)| val.to_string())
            .ok_or_else(|| {
                ScorecastError::Fit(format!(
                    "column '{}' has no values to impute from",
                    series.name()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_frequent() {
        let df = df!(
            "lunch" => [Some("standard"), Some("standard"), None, Some("free/reduced")],
        )
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        imputer.fit(&df, &["lunch"]).unwrap();
        let result = imputer.transform(&df).unwrap();

        let col = result.column("lunch").unwrap().str().unwrap().clone();
        assert_eq!(col.get(2), Some("standard"));
        assert_eq!(col.null_count(), 0);
    }

    #[test]
    fn test_median() {
        let df = df!(
            "reading_score" => [Some(10.0), None, Some(20.0), Some(30.0)],
        )
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer.fit(&df, &["reading_score"]).unwrap();
        let result = imputer.transform(&df).unwrap();

        let col = result.column("reading_score").unwrap().f64().unwrap().clone();
        assert_eq!(col.get(1), Some(20.0));
    }

    #[test]
    fn test_fill_values_frozen_at_fit() {
        let train = df!("lunch" => [Some("standard"), Some("standard"), Some("free/reduced")]).unwrap();
        let test = df!("lunch" => [None::<&str>, Some("free/reduced"), Some("free/reduced")]).unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        imputer.fit(&train, &["lunch"]).unwrap();

        // Fill value comes from the training data, not the test data.
        let result = imputer.transform(&test).unwrap();
        let col = result.column("lunch").unwrap().str().unwrap().clone();
        assert_eq!(col.get(0), Some("standard"));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let df = df!("lunch" => ["standard"]).unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        let err = imputer.fit(&df, &["gender"]).unwrap_err();
        assert!(matches!(err, ScorecastError::Schema(_)));
    }

    #[test]
    fn test_transform_before_fit() {
        let df = df!("lunch" => ["standard"]).unwrap();
        let imputer = Imputer::new(ImputeStrategy::MostFrequent);
        assert!(matches!(
            imputer.transform(&df),
            Err(ScorecastError::ModelNotFitted)
        ));
    }
}
