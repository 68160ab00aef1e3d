//! Leaf-wise (best-first) gradient boosting
//!
//! Trees grow by repeatedly splitting whichever leaf offers the largest
//! gain, under a total leaf budget, instead of expanding level by level.

use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafwiseBoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Leaf budget per tree.
    pub max_leaves: usize,
    pub min_child_samples: usize,
    pub reg_lambda: f64,
    pub subsample: f64,
    pub seed: u64,
}

impl Default for LeafwiseBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_leaves: 31,
            min_child_samples: 20,
            reg_lambda: 0.0,
            subsample: 1.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum LeafwiseNode {
    Leaf {
        value: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<LeafwiseNode>,
        right: Box<LeafwiseNode>,
    },
}

impl LeafwiseNode {
    fn predict_row(&self, x: &Array2<f64>, row: usize) -> f64 {
        match self {
            LeafwiseNode::Leaf { value } => *value,
            LeafwiseNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if x[[row, *feature_idx]] <= *threshold {
                    left.predict_row(x, row)
                } else {
                    right.predict_row(x, row)
                }
            }
        }
    }
}

fn leaf_value(grad: &[f64], hess: &[f64], indices: &[usize], lambda: f64) -> f64 {
    let g: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h: f64 = indices.iter().map(|&i| hess[i]).sum();
    -g / (h + lambda)
}

fn split_score(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda)
}

/// Best split for one leaf's rows on one feature.
fn feature_split(
    x: &Array2<f64>,
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    feature_idx: usize,
    lambda: f64,
    min_child_samples: usize,
) -> Option<(f64, f64, Vec<usize>, Vec<usize>)> {
    if indices.len() < 2 {
        return None;
    }
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, x[[i, feature_idx]])).collect();
    sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let total_g: f64 = indices.iter().map(|&i| grad[i]).sum();
    let total_h: f64 = indices.iter().map(|&i| hess[i]).sum();
    let parent_score = split_score(total_g, total_h, lambda);

    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best: Option<(f64, f64, usize)> = None;

    for pos in 0..sorted.len() - 1 {
        left_g += grad[sorted[pos].0];
        left_h += hess[sorted[pos].0];

        if pos + 1 < min_child_samples || sorted.len() - pos - 1 < min_child_samples {
            continue;
        }
        if sorted[pos].1 == sorted[pos + 1].1 {
            continue;
        }

        let gain = split_score(left_g, left_h, lambda)
            + split_score(total_g - left_g, total_h - left_h, lambda)
            - parent_score;
        if gain > best.map_or(0.0, |(_, g, _)| g) {
            best = Some(((sorted[pos].1 + sorted[pos + 1].1) / 2.0, gain, pos + 1));
        }
    }

    best.map(|(threshold, gain, pos)| {
        let left: Vec<usize> = sorted[..pos].iter().map(|&(i, _)| i).collect();
        let right: Vec<usize> = sorted[pos..].iter().map(|&(i, _)| i).collect();
        (threshold, gain, left, right)
    })
}

/// Queued split with ordering by gain.
struct PendingSplit {
    gain: f64,
    node_id: usize,
    feature_idx: usize,
    threshold: f64,
    left_indices: Vec<usize>,
    right_indices: Vec<usize>,
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.gain == other.gain
    }
}
impl Eq for PendingSplit {}
impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PendingSplit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .partial_cmp(&other.gain)
            .unwrap_or(Ordering::Equal)
    }
}

enum NodeSlot {
    Leaf(Vec<usize>),
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

fn best_split_for(
    x: &Array2<f64>,
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    config: &LeafwiseBoostingConfig,
) -> Option<(usize, f64, f64, Vec<usize>, Vec<usize>)> {
    (0..x.ncols())
        .into_par_iter()
        .filter_map(|f| {
            feature_split(
                x,
                grad,
                hess,
                indices,
                f,
                config.reg_lambda,
                config.min_child_samples,
            )
            .map(|(thr, gain, li, ri)| (f, thr, gain, li, ri))
        })
        .max_by(|a, b| {
            // Gain ties break toward the lower feature index so parallel
            // reduction order cannot change the chosen split.
            a.2.partial_cmp(&b.2)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        })
}

fn build_leafwise_tree(
    x: &Array2<f64>,
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    config: &LeafwiseBoostingConfig,
) -> LeafwiseNode {
    let mut nodes: Vec<NodeSlot> = vec![NodeSlot::Leaf(indices.to_vec())];
    let mut heap: BinaryHeap<PendingSplit> = BinaryHeap::new();

    if let Some((feature_idx, threshold, gain, left, right)) =
        best_split_for(x, grad, hess, indices, config)
    {
        heap.push(PendingSplit {
            gain,
            node_id: 0,
            feature_idx,
            threshold,
            left_indices: left,
            right_indices: right,
        });
    }

    let mut n_leaves = 1usize;
    while n_leaves < config.max_leaves {
        let split = match heap.pop() {
            Some(s) if s.gain > 0.0 => s,
            _ => break,
        };

        let left_id = nodes.len();
        let right_id = nodes.len() + 1;
        nodes.push(NodeSlot::Leaf(split.left_indices.clone()));
        nodes.push(NodeSlot::Leaf(split.right_indices.clone()));
        nodes[split.node_id] = NodeSlot::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        n_leaves += 1;

        for (child_id, child_indices) in
            [(left_id, &split.left_indices), (right_id, &split.right_indices)]
        {
            if child_indices.len() < config.min_child_samples * 2 {
                continue;
            }
            if let Some((feature_idx, threshold, gain, left, right)) =
                best_split_for(x, grad, hess, child_indices, config)
            {
                heap.push(PendingSplit {
                    gain,
                    node_id: child_id,
                    feature_idx,
                    threshold,
                    left_indices: left,
                    right_indices: right,
                });
            }
        }
    }

    fn freeze(
        nodes: &[NodeSlot],
        idx: usize,
        grad: &[f64],
        hess: &[f64],
        lambda: f64,
    ) -> LeafwiseNode {
        match &nodes[idx] {
            NodeSlot::Leaf(indices) => LeafwiseNode::Leaf {
                value: leaf_value(grad, hess, indices, lambda),
            },
            NodeSlot::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => LeafwiseNode::Split {
                feature_idx: *feature_idx,
                threshold: *threshold,
                left: Box::new(freeze(nodes, *left, grad, hess, lambda)),
                right: Box::new(freeze(nodes, *right, grad, hess, lambda)),
            },
        }
    }
    freeze(&nodes, 0, grad, hess, config.reg_lambda)
}

/// Boosted regressor whose trees grow leaf-wise under a leaf budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafwiseBoostingRegressor {
    config: LeafwiseBoostingConfig,
    trees: Vec<LeafwiseNode>,
    base_prediction: f64,
    is_fitted: bool,
}

impl LeafwiseBoostingRegressor {
    pub fn new(config: LeafwiseBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_prediction: 0.0,
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n = x.nrows();
        if n != y.len() {
            return Err(ScorecastError::Shape {
                expected: format!("{} targets", n),
                actual: format!("{}", y.len()),
            });
        }
        if n == 0 {
            return Err(ScorecastError::Fit("cannot fit on zero rows".to_string()));
        }
        if self.config.max_leaves < 2 {
            return Err(ScorecastError::InvalidParameter {
                name: "max_leaves".to_string(),
                value: self.config.max_leaves.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);
        self.base_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n, self.base_prediction);

        for _ in 0..self.config.n_estimators {
            // Squared error: grad = pred - y, hess = 1.
            let grad: Vec<f64> = predictions
                .iter()
                .zip(y.iter())
                .map(|(&p, &yi)| p - yi)
                .collect();
            let hess: Vec<f64> = vec![1.0; n];

            let indices: Vec<usize> = if self.config.subsample < 1.0 {
                let k = ((n as f64 * self.config.subsample).ceil() as usize).clamp(1, n);
                let mut idx: Vec<usize> = (0..n).collect();
                idx.shuffle(&mut rng);
                idx.truncate(k);
                idx
            } else {
                (0..n).collect()
            };

            let tree = build_leafwise_tree(x, &grad, &hess, &indices, &self.config);
            for i in 0..n {
                predictions[i] += self.config.learning_rate * tree.predict_row(x, i);
            }
            self.trees.push(tree);
        }

        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(ScorecastError::ModelNotFitted);
        }

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                self.base_prediction
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.predict_row(x, i))
                        .sum::<f64>()
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }
}
