//! AdaBoost.R2 regressor
//!
//! Adaptive boosting for regression: each round resamples the training set
//! according to the current sample weights, fits a depth-limited tree, and
//! reweights samples by their relative absolute error. Predictions combine
//! the learners by weighted median.

use super::decision_tree::RegressionTree;
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, Axis};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostRegressor {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    seed: u64,
    learners: Vec<RegressionTree>,
    /// `ln(1/beta)` per learner; also the weighted-median vote weight.
    learner_weights: Vec<f64>,
    is_fitted: bool,
}

impl AdaBoostRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth: 3,
            seed: 42,
            learners: Vec::new(),
            learner_weights: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(ScorecastError::Shape {
                expected: format!("{} targets", n_samples),
                actual: format!("{}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ScorecastError::Fit("cannot fit on zero rows".to_string()));
        }
        if !(0.0 < self.learning_rate && self.learning_rate <= 1.0) {
            return Err(ScorecastError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }

        let mut weights = Array1::from_elem(n_samples, 1.0 / n_samples as f64);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        self.learners.clear();
        self.learner_weights.clear();

        for round in 0..self.n_estimators {
            // Weighted bootstrap stands in for weighted tree fitting.
            let dist = WeightedIndex::new(weights.iter()).map_err(|e| {
                ScorecastError::Fit(format!("degenerate sample weights: {}", e))
            })?;
            let sample_indices: Vec<usize> =
                (0..n_samples).map(|_| dist.sample(&mut rng)).collect();
            let x_boot = x.select(Axis(0), &sample_indices);
            let y_boot: Array1<f64> =
                Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

            let mut tree = RegressionTree::new()
                .with_max_depth(self.max_depth)
                .with_seed(self.seed.wrapping_add(round as u64));
            tree.fit(&x_boot, &y_boot)?;

            let predictions = tree.predict(x)?;
            let abs_errors: Array1<f64> = y
                .iter()
                .zip(predictions.iter())
                .map(|(t, p)| (t - p).abs())
                .collect();
            let max_error = abs_errors.iter().cloned().fold(0.0, f64::max);

            // Perfect fit on the training set; keep the learner and stop.
            if max_error <= 1e-12 {
                self.learners.push(tree);
                self.learner_weights.push(1.0);
                break;
            }

            let losses = abs_errors.mapv(|e| e / max_error);
            let avg_loss: f64 = weights
                .iter()
                .zip(losses.iter())
                .map(|(w, l)| w * l)
                .sum();

            // A learner no better than chance ends boosting.
            if avg_loss >= 0.5 {
                break;
            }

            let beta = avg_loss / (1.0 - avg_loss);
            let learner_weight = self.learning_rate * (1.0 / beta).ln();

            for (w, l) in weights.iter_mut().zip(losses.iter()) {
                *w *= beta.powf(self.learning_rate * (1.0 - l));
            }
            let total: f64 = weights.sum();
            if total <= 0.0 {
                break;
            }
            weights /= total;

            self.learners.push(tree);
            self.learner_weights.push(learner_weight);
        }

        if self.learners.is_empty() {
            return Err(ScorecastError::Fit(
                "no learner beat the 0.5 average-loss bound".to_string(),
            ));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Weighted median across the learners' predictions.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(ScorecastError::ModelNotFitted);
        }

        let per_learner: Vec<Array1<f64>> = self
            .learners
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let half_weight: f64 = self.learner_weights.iter().sum::<f64>() / 2.0;
        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let mut votes: Vec<(f64, f64)> = per_learner
                    .iter()
                    .zip(self.learner_weights.iter())
                    .map(|(pred, &w)| (pred[i], w))
                    .collect();
                votes.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

                let mut acc = 0.0;
                for (value, weight) in &votes {
                    acc += weight;
                    if acc >= half_weight {
                        return *value;
                    }
                }
                votes.last().map(|(v, _)| *v).unwrap_or(0.0)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    pub fn n_learners(&self) -> usize {
        self.learners.len()
    }
}
