//! Second-order gradient boosting
//!
//! Differs from plain gradient boosting by using both the gradient and the
//! hessian of the squared loss, regularized leaf weights
//! `w* = -G / (H + lambda)`, and the gain-based split score
//! `0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)] - γ`.

use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondOrderBoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Minimum summed hessian per child.
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights.
    pub reg_lambda: f64,
    /// Minimum gain required to keep a split.
    pub gamma: f64,
    pub subsample: f64,
    pub colsample: f64,
    pub seed: u64,
}

impl Default for SecondOrderBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample: 1.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum BoostNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<BoostNode>,
        right: Box<BoostNode>,
    },
}

impl BoostNode {
    fn predict_row(&self, x: &Array2<f64>, row: usize, columns: &[usize]) -> f64 {
        match self {
            BoostNode::Leaf { weight } => *weight,
            BoostNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if x[[row, columns[*feature_idx]]] <= *threshold {
                    left.predict_row(x, row, columns)
                } else {
                    right.predict_row(x, row, columns)
                }
            }
        }
    }
}

/// Best split for one feature: (feature, threshold, gain).
type FeatureSplit = (usize, f64, f64);

fn leaf_weight(g_sum: f64, h_sum: f64, lambda: f64) -> f64 {
    -g_sum / (h_sum + lambda)
}

fn build_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    columns: &[usize],
    depth: usize,
    config: &SecondOrderBoostingConfig,
) -> BoostNode {
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let weight = leaf_weight(g_sum, h_sum, config.reg_lambda);

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return BoostNode::Leaf { weight };
    }

    let best = (0..columns.len())
        .into_par_iter()
        .filter_map(|f| split_for_feature(x, grad, hess, indices, f, columns[f], config))
        .max_by(|a, b| {
            // Gain ties break toward the lower feature index so parallel
            // reduction order cannot change the chosen split.
            a.2.partial_cmp(&b.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        });

    match best {
        Some((feature_idx, threshold, gain)) if gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, columns[feature_idx]]] <= threshold);
            if left_idx.is_empty() || right_idx.is_empty() {
                return BoostNode::Leaf { weight };
            }

            let left = build_tree(x, grad, hess, &left_idx, columns, depth + 1, config);
            let right = build_tree(x, grad, hess, &right_idx, columns, depth + 1, config);
            BoostNode::Split {
                feature_idx,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => BoostNode::Leaf { weight },
    }
}

fn split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_idx: usize,
    column: usize,
    config: &SecondOrderBoostingConfig,
) -> Option<FeatureSplit> {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        x[[a, column]]
            .partial_cmp(&x[[b, column]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let g_total: f64 = sorted.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| hess[i]).sum();
    let lambda = config.reg_lambda;

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<(f64, f64)> = None;

    for (pos, &idx) in sorted.iter().enumerate().take(sorted.len() - 1) {
        g_left += grad[idx];
        h_left += hess[idx];

        let here = x[[idx, column]];
        let next = x[[sorted[pos + 1], column]];
        if next - here < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                - g_total * g_total / (h_total + lambda));

        if best.map_or(true, |(_, g)| gain > g) {
            best = Some(((here + next) / 2.0, gain));
        }
    }

    best.map(|(threshold, gain)| (feature_idx, threshold, gain))
}

/// Boosted regressor with second-order loss approximation, squared error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondOrderBoostingRegressor {
    config: SecondOrderBoostingConfig,
    trees: Vec<BoostNode>,
    tree_columns: Vec<Vec<usize>>,
    base_score: f64,
    is_fitted: bool,
}

impl SecondOrderBoostingRegressor {
    pub fn new(config: SecondOrderBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            tree_columns: Vec::new(),
            base_score: 0.0,
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(ScorecastError::Shape {
                expected: format!("{} targets", n_samples),
                actual: format!("{}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ScorecastError::Fit("cannot fit on zero rows".to_string()));
        }

        self.base_score = y.mean().unwrap_or(0.0);
        let mut preds = Array1::from_elem(n_samples, self.base_score);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);

        for _ in 0..self.config.n_estimators {
            // Squared error: grad = pred - y, hess = 1.
            let grad: Array1<f64> = &preds - y;
            let hess = Array1::from_elem(n_samples, 1.0);

            let row_indices = draw_indices(n_samples, self.config.subsample, &mut rng);
            let columns = draw_indices(n_features, self.config.colsample, &mut rng);

            let tree = build_tree(x, &grad, &hess, &row_indices, &columns, 0, &self.config);

            for i in 0..n_samples {
                preds[i] += self.config.learning_rate * tree.predict_row(x, i, &columns);
            }

            self.trees.push(tree);
            self.tree_columns.push(columns);
        }

        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(ScorecastError::ModelNotFitted);
        }

        let mut preds = Array1::from_elem(x.nrows(), self.base_score);
        for i in 0..x.nrows() {
            for (tree, columns) in self.trees.iter().zip(self.tree_columns.iter()) {
                preds[i] += self.config.learning_rate * tree.predict_row(x, i, columns);
            }
        }
        Ok(preds)
    }
}

fn draw_indices(n: usize, fraction: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let size = (((n as f64) * fraction).ceil() as usize).clamp(1, n);
    if size == n {
        return (0..n).collect();
    }
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(size);
    indices.sort_unstable();
    indices
}
