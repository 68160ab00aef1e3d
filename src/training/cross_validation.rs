//! K-fold cross-validation splitter

use crate::error::{Result, ScorecastError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A single train/validation split.
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Shuffled k-fold splitter with a fixed seed; the same seed always yields
/// the same folds so every hyperparameter combination is scored on identical
/// partitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    n_splits: usize,
    seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Generate train/validation index pairs covering every row exactly once
    /// on the validation side.
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(ScorecastError::InvalidParameter {
                name: "n_splits".to_string(),
                value: self.n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if n_samples < self.n_splits {
            return Err(ScorecastError::Fit(format!(
                "need at least {} rows for {}-fold CV, got {}",
                self.n_splits, self.n_splits, n_samples
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        // Earlier folds absorb the remainder, one extra row each.
        let fold_sizes: Vec<usize> = (0..self.n_splits)
            .map(|i| {
                let base = n_samples / self.n_splits;
                let remainder = n_samples % self.n_splits;
                if i < remainder {
                    base + 1
                } else {
                    base
                }
            })
            .collect();

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;

        for fold_idx in 0..self.n_splits {
            let fold_size = fold_sizes[fold_idx];
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }
}

/// Aggregated per-fold scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    pub scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    pub n_folds: usize,
}

impl CVResults {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance =
            scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}
