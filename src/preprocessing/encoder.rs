//! Categorical encoding

use crate::error::{Result, ScorecastError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One-hot encoder with a category set frozen at fit time.
///
/// Each encoded column is replaced by one indicator column per category seen
/// during fit, named `{column}_{category}` and emitted in sorted category
/// order. A value not seen during fit maps to all-zero indicators rather
/// than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    column_order: Vec<String>,
    categories: HashMap<String, Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self {
            column_order: Vec::new(),
            categories: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Collect the distinct values of each column, sorted for determinism.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        if df.height() == 0 {
            return Err(ScorecastError::Fit(
                "cannot fit encoder on zero rows".to_string(),
            ));
        }

        self.column_order = columns.iter().map(|c| c.to_string()).collect();

        for col_name in columns {
            let ca = Self::text_column(df, col_name)?;
            let mut values: Vec<String> = ca
                .into_iter()
                .flatten()
                .map(|v| v.to_string())
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();
            values.sort();
            if values.is_empty() {
                return Err(ScorecastError::Fit(format!(
                    "column '{}' has no values to encode",
                    col_name
                )));
            }
            self.categories.insert(col_name.to_string(), values);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace each fitted column with its indicator columns.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ScorecastError::ModelNotFitted);
        }

        let mut result = df.clone();

        for col_name in &self.column_order {
            let ca = Self::text_column(df, col_name)?;
            let categories = &self.categories[col_name];

            for category in categories {
                let indicator: Float64Chunked = ca
                    .into_iter()
                    .map(|opt| match opt {
                        Some(v) if v == category => Some(1.0),
                        _ => Some(0.0),
                    })
                    .collect();
                let name = Self::indicator_name(col_name, category);
                result = result
                    .with_column(indicator.with_name(name.as_str().into()).into_series())
                    .map_err(|e| ScorecastError::Data(e.to_string()))?
                    .clone();
            }
            result = result.drop(col_name)?;
        }

        Ok(result)
    }

    /// Indicator column names in output order.
    pub fn output_columns(&self) -> Vec<String> {
        self.column_order
            .iter()
            .flat_map(|col| {
                self.categories[col]
                    .iter()
                    .map(move |cat| Self::indicator_name(col, cat))
            })
            .collect()
    }

    fn indicator_name(column: &str, category: &str) -> String {
        format!("{}_{}", column, category)
    }

    fn text_column<'a>(df: &'a DataFrame, col_name: &str) -> Result<&'a StringChunked> {
        let column = df
            .column(col_name)
            .map_err(|_| ScorecastError::Schema(format!("missing column '{}'", col_name)))?;
        column
            .as_materialized_series()
            .str()
            .map_err(|e| ScorecastError::Data(e.to_string()))
    }
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}
