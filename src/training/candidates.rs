//! Candidate model families and their hyperparameter grids
//!
//! Candidates form a fixed, enumerated list rather than a runtime registry:
//! adding one is a typed code change. Enumeration order is part of the
//! selection contract because ties resolve to the first-seen candidate.

use super::adaboost::AdaBoostRegressor;
use super::decision_tree::RegressionTree;
use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::leafwise::{LeafwiseBoostingConfig, LeafwiseBoostingRegressor};
use super::linear::LinearRegression;
use super::random_forest::RandomForestRegressor;
use super::second_order::{SecondOrderBoostingConfig, SecondOrderBoostingRegressor};
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One hyperparameter combination for some model family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamSet {
    Linear,
    DecisionTree {
        max_depth: usize,
        min_samples_leaf: usize,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: usize,
    },
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f64,
        subsample: f64,
    },
    SecondOrderBoosting {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
    },
    LeafwiseBoosting {
        n_estimators: usize,
        learning_rate: f64,
        max_leaves: usize,
    },
    AdaBoost {
        n_estimators: usize,
        learning_rate: f64,
    },
}

impl ParamSet {
    /// Fit this combination on the given data. Every stochastic family takes
    /// the caller's seed so selection is reproducible end to end.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<FittedModel> {
        match *self {
            ParamSet::Linear => {
                let mut model = LinearRegression::new();
                model.fit(x, y)?;
                Ok(FittedModel::Linear(model))
            }
            ParamSet::DecisionTree {
                max_depth,
                min_samples_leaf,
            } => {
                let mut model = RegressionTree::new()
                    .with_max_depth(max_depth)
                    .with_min_samples_leaf(min_samples_leaf)
                    .with_seed(seed);
                model.fit(x, y)?;
                Ok(FittedModel::DecisionTree(model))
            }
            ParamSet::RandomForest {
                n_estimators,
                max_depth,
            } => {
                let mut model = RandomForestRegressor::new(n_estimators)
                    .with_max_depth(max_depth)
                    .with_seed(seed);
                model.fit(x, y)?;
                Ok(FittedModel::RandomForest(model))
            }
            ParamSet::GradientBoosting {
                n_estimators,
                learning_rate,
                subsample,
            } => {
                let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
                    n_estimators,
                    learning_rate,
                    subsample,
                    seed,
                    ..Default::default()
                });
                model.fit(x, y)?;
                Ok(FittedModel::GradientBoosting(model))
            }
            ParamSet::SecondOrderBoosting {
                n_estimators,
                learning_rate,
                max_depth,
            } => {
                let mut model = SecondOrderBoostingRegressor::new(SecondOrderBoostingConfig {
                    n_estimators,
                    learning_rate,
                    max_depth,
                    seed,
                    ..Default::default()
                });
                model.fit(x, y)?;
                Ok(FittedModel::SecondOrderBoosting(model))
            }
            ParamSet::LeafwiseBoosting {
                n_estimators,
                learning_rate,
                max_leaves,
            } => {
                let mut model = LeafwiseBoostingRegressor::new(LeafwiseBoostingConfig {
                    n_estimators,
                    learning_rate,
                    max_leaves,
                    min_child_samples: 5,
                    seed,
                    ..Default::default()
                });
                model.fit(x, y)?;
                Ok(FittedModel::LeafwiseBoosting(model))
            }
            ParamSet::AdaBoost {
                n_estimators,
                learning_rate,
            } => {
                let mut model =
                    AdaBoostRegressor::new(n_estimators, learning_rate).with_seed(seed);
                model.fit(x, y)?;
                Ok(FittedModel::AdaBoost(model))
            }
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSet::Linear => write!(f, "default"),
            ParamSet::DecisionTree {
                max_depth,
                min_samples_leaf,
            } => write!(
                f,
                "max_depth={} min_samples_leaf={}",
                max_depth, min_samples_leaf
            ),
            ParamSet::RandomForest {
                n_estimators,
                max_depth,
            } => write!(f, "n_estimators={} max_depth={}", n_estimators, max_depth),
            ParamSet::GradientBoosting {
                n_estimators,
                learning_rate,
                subsample,
            } => write!(
                f,
                "n_estimators={} learning_rate={} subsample={}",
                n_estimators, learning_rate, subsample
            ),
            ParamSet::SecondOrderBoosting {
                n_estimators,
                learning_rate,
                max_depth,
            } => write!(
                f,
                "n_estimators={} learning_rate={} max_depth={}",
                n_estimators, learning_rate, max_depth
            ),
            ParamSet::LeafwiseBoosting {
                n_estimators,
                learning_rate,
                max_leaves,
            } => write!(
                f,
                "n_estimators={} learning_rate={} max_leaves={}",
                n_estimators, learning_rate, max_leaves
            ),
            ParamSet::AdaBoost {
                n_estimators,
                learning_rate,
            } => write!(
                f,
                "n_estimators={} learning_rate={}",
                n_estimators, learning_rate
            ),
        }
    }
}

/// A model family paired with its grid. A single-entry grid means the family
/// trains with fixed parameters and skips tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub grid: Vec<ParamSet>,
}

impl Candidate {
    pub fn new(name: &str, grid: Vec<ParamSet>) -> Self {
        Self {
            name: name.to_string(),
            grid,
        }
    }
}

/// The full candidate list in selection order.
pub fn default_candidates() -> Vec<Candidate> {
    vec![
        Candidate::new("linear_regression", vec![ParamSet::Linear]),
        Candidate::new(
            "decision_tree",
            [4, 8, 16]
                .iter()
                .flat_map(|&max_depth| {
                    [1, 5].iter().map(move |&min_samples_leaf| ParamSet::DecisionTree {
                        max_depth,
                        min_samples_leaf,
                    })
                })
                .collect(),
        ),
        Candidate::new(
            "random_forest",
            [50, 100]
                .iter()
                .flat_map(|&n_estimators| {
                    [8, 16].iter().map(move |&max_depth| ParamSet::RandomForest {
                        n_estimators,
                        max_depth,
                    })
                })
                .collect(),
        ),
        Candidate::new(
            "gradient_boosting",
            [50, 100]
                .iter()
                .flat_map(|&n_estimators| {
                    [0.05, 0.1]
                        .iter()
                        .map(move |&learning_rate| ParamSet::GradientBoosting {
                            n_estimators,
                            learning_rate,
                            subsample: 0.8,
                        })
                })
                .collect(),
        ),
        Candidate::new(
            "second_order_boosting",
            [0.1, 0.3]
                .iter()
                .flat_map(|&learning_rate| {
                    [3, 6]
                        .iter()
                        .map(move |&max_depth| ParamSet::SecondOrderBoosting {
                            n_estimators: 100,
                            learning_rate,
                            max_depth,
                        })
                })
                .collect(),
        ),
        Candidate::new(
            "leafwise_boosting",
            [0.05, 0.1]
                .iter()
                .flat_map(|&learning_rate| {
                    [15, 31]
                        .iter()
                        .map(move |&max_leaves| ParamSet::LeafwiseBoosting {
                            n_estimators: 100,
                            learning_rate,
                            max_leaves,
                        })
                })
                .collect(),
        ),
        Candidate::new(
            "adaboost",
            [50, 100]
                .iter()
                .flat_map(|&n_estimators| {
                    [0.5, 1.0].iter().map(move |&learning_rate| ParamSet::AdaBoost {
                        n_estimators,
                        learning_rate,
                    })
                })
                .collect(),
        ),
    ]
}

/// A fitted model of any candidate family, dispatching predict by variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    Linear(LinearRegression),
    DecisionTree(RegressionTree),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
    SecondOrderBoosting(SecondOrderBoostingRegressor),
    LeafwiseBoosting(LeafwiseBoostingRegressor),
    AdaBoost(AdaBoostRegressor),
}

impl FittedModel {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedModel::Linear(m) => m.predict(x),
            FittedModel::DecisionTree(m) => m.predict(x),
            FittedModel::RandomForest(m) => m.predict(x),
            FittedModel::GradientBoosting(m) => m.predict(x),
            FittedModel::SecondOrderBoosting(m) => m.predict(x),
            FittedModel::LeafwiseBoosting(m) => m.predict(x),
            FittedModel::AdaBoost(m) => m.predict(x),
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            FittedModel::Linear(_) => "linear_regression",
            FittedModel::DecisionTree(_) => "decision_tree",
            FittedModel::RandomForest(_) => "random_forest",
            FittedModel::GradientBoosting(_) => "gradient_boosting",
            FittedModel::SecondOrderBoosting(_) => "second_order_boosting",
            FittedModel::LeafwiseBoosting(_) => "leafwise_boosting",
            FittedModel::AdaBoost(_) => "adaboost",
        }
    }
}
