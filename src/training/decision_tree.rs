//! Regression tree with variance-reduction splits

use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Best split found for one feature.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// CART-style regression tree. Splits minimize the summed squared error of
/// the two children; leaves predict the subset mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Option<TreeNode>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: Option<usize>,
    seed: u64,
    n_features: usize,
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 0,
            n_features: 0,
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

    /// Number of features considered per split; features are drawn without
    /// replacement from the seeded RNG.
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(ScorecastError::Shape {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(ScorecastError::Fit("cannot fit on zero rows".to_string()));
        }

        self.n_features = x.ncols();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.root = Some(self.build_node(x, y, &indices, 0, &mut rng));
        Ok(self)
    }

    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n_samples as f64;

        let at_depth_limit = self.max_depth.map_or(false, |d| depth >= d);
        let pure = indices.iter().all(|&i| (y[i] - mean).abs() < 1e-12);
        if n_samples < self.min_samples_split || at_depth_limit || pure {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        }

        let candidate = match self.find_best_split(x, y, indices, rng) {
            Some(c) => c,
            None => {
                return TreeNode::Leaf {
                    value: mean,
                    n_samples,
                }
            }
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, candidate.feature_idx]] <= candidate.threshold);

        if left_indices.len() < self.min_samples_leaf
            || right_indices.len() < self.min_samples_leaf
        {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        }

        let left = Box::new(self.build_node(x, y, &left_indices, depth + 1, rng));
        let right = Box::new(self.build_node(x, y, &right_indices, depth + 1, rng));

        TreeNode::Split {
            feature_idx: candidate.feature_idx,
            threshold: candidate.threshold,
            left,
            right,
            n_samples,
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let candidate_features = self.sample_features(rng);

        candidate_features
            .into_par_iter()
            .filter_map(|feature_idx| {
                // Sort rows by feature value, then scan split points with
                // running sums so each threshold costs O(1).
                let mut order: Vec<usize> = indices.to_vec();
                order.sort_by(|&a, &b| {
                    x[[a, feature_idx]]
                        .partial_cmp(&x[[b, feature_idx]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut left_sum = 0.0;
                let mut left_sq = 0.0;
                let mut best: Option<(f64, f64)> = None;

                for (pos, &idx) in order.iter().enumerate().take(n - 1) {
                    let yi = y[idx];
                    left_sum += yi;
                    left_sq += yi * yi;

                    let left_n = pos + 1;
                    let right_n = n - left_n;
                    if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                        continue;
                    }

                    let here = x[[idx, feature_idx]];
                    let next = x[[order[pos + 1], feature_idx]];
                    if next <= here {
                        continue;
                    }

                    let right_sum = total_sum - left_sum;
                    let right_sq = total_sq - left_sq;
                    let children_sse = (left_sq - left_sum * left_sum / left_n as f64)
                        + (right_sq - right_sum * right_sum / right_n as f64);
                    let gain = parent_sse - children_sse;

                    if gain > best.map_or(0.0, |(_, g)| g) {
                        best = Some(((here + next) / 2.0, gain));
                    }
                }

                best.map(|(threshold, gain)| SplitCandidate {
                    feature_idx,
                    threshold,
                    gain,
                })
            })
            .max_by(|a, b| {
                a.gain
                    .partial_cmp(&b.gain)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.feature_idx.cmp(&a.feature_idx))
            })
    }

    fn sample_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let k = self
            .max_features
            .unwrap_or(self.n_features)
            .clamp(1, self.n_features);
        if k == self.n_features {
            return (0..self.n_features).collect();
        }
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);
        features.truncate(k);
        features
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(ScorecastError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(ScorecastError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{}", x.ncols()),
            });
        }

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { value, .. } => return *value,
                        TreeNode::Split {
                            feature_idx,
                            threshold,
                            left,
                            right,
                            ..
                        } => {
                            node = if x[[i, *feature_idx]] <= *threshold {
                                left
                            } else {
                                right
                            };
                        }
                    }
                }
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}
