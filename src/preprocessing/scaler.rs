//! Feature scaling

use crate::error::{Result, ScorecastError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-column statistics learned at fit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScaleParams {
    mean: f64,
    std: f64,
}

/// Standard scaler over a fixed set of float columns.
///
/// With `center` set the output is `(x - mean) / std`; without it the column
/// is only divided by its standard deviation, which keeps binary indicator
/// columns as zeros and positive spikes. Columns with zero variance pass
/// through unscaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    center: bool,
    params: HashMap<String, ScaleParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new(center: bool) -> Self {
        Self {
            center,
            params: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Learn mean and standard deviation for each column.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        if df.height() == 0 {
            return Err(ScorecastError::Fit(
                "cannot fit scaler on zero rows".to_string(),
            ));
        }

        for col_name in columns {
            let ca = Self::float_column(df, col_name)?;
            let mean = ca.mean().ok_or_else(|| {
                ScorecastError::Fit(format!("column '{}' has no values", col_name))
            })?;
            let std = ca.std(1).unwrap_or(0.0);
            self.params
                .insert(col_name.to_string(), ScaleParams { mean, std });
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Scale the fitted columns, leaving all others untouched.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ScorecastError::ModelNotFitted);
        }

        let mut result = df.clone();

        for (col_name, params) in &self.params {
            let ca = Self::float_column(df, col_name)?;
            let std = if params.std > 0.0 { params.std } else { 1.0 };
            let offset = if self.center { params.mean } else { 0.0 };

            let scaled: Float64Chunked = ca
                .into_iter()
                .map(|opt| opt.map(|v| (v - offset) / std))
                .collect();
            result = result
                .with_column(scaled.with_name(col_name.as_str().into()).into_series())
                .map_err(|e| ScorecastError::Data(e.to_string()))?
                .clone();
        }

        Ok(result)
    }

    fn float_column(df: &DataFrame, col_name: &str) -> Result<Float64Chunked> {
        let column = df
            .column(col_name)
            .map_err(|_| ScorecastError::Schema(format!("missing column '{}'", col_name)))?;
        let ca = column
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()
            .map_err(|e| ScorecastError::Data(e.to_string()))?
            .clone();
        Ok(ca)
    }
}
