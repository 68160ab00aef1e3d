//! Regression metrics

use crate::error::{Result, ScorecastError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Goodness-of-fit metrics for a regression model on one evaluation set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
}

impl RegressionMetrics {
    /// Compute all metrics from true and predicted values.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(ScorecastError::Shape {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{}", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(ScorecastError::Fit(
                "cannot score an empty evaluation set".to_string(),
            ));
        }

        let n = y_true.len() as f64;
        let mse = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum::<f64>()
            / n;
        let mae = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).abs())
            .sum::<f64>()
            / n;

        Ok(Self {
            r2: r2_score(y_true, y_pred),
            mse,
            rmse: mse.sqrt(),
            mae,
        })
    }
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// A constant target gives R² = 0 for a perfect fit and negative infinity is
/// avoided by treating zero total variance as 1.0 only when residuals are
/// also zero.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}
