//! Random forest regressor

use super::decision_tree::RegressionTree;
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, Axis};
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How many features each split may consider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    Sqrt,
    Fraction(f64),
    Fixed(usize),
    All,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features)
    }
}

/// Bagged ensemble of regression trees. Each tree trains on a bootstrap
/// sample drawn from its own seed, so a forest is reproducible from the
/// base seed alone; trees build in parallel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: MaxFeatures,
    seed: u64,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            seed: 42,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
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
        if self.n_estimators == 0 {
            return Err(ScorecastError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "forest needs at least one tree".to_string(),
            });
        }

        let max_features = self.max_features.resolve(x.ncols());

        self.trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let tree_seed = self.seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);

                let sample_indices: Vec<usize> = (0..n_samples)
                    .map(|_| (rng.next_u64() % n_samples as u64) as usize)
                    .collect();
                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = RegressionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_seed(tree_seed);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }
                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self)
    }

    /// Average of per-tree predictions.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ScorecastError::ModelNotFitted);
        }

        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut sum = Array1::zeros(x.nrows());
        for pred in &per_tree {
            sum += pred;
        }
        Ok(sum / self.trees.len() as f64)
    }
}
