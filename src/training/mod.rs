//! Model training module
//!
//! Native regressor implementations for the candidate families plus the
//! grid-search / cross-validation selection logic that picks a winner:
//! - Linear regression (normal equations)
//! - Regression tree and random forest
//! - Residual, second-order, and leaf-wise gradient boosting
//! - AdaBoost.R2

pub mod adaboost;
pub mod candidates;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod leafwise;
pub mod linear;
pub mod metrics;
pub mod random_forest;
pub mod second_order;
pub mod selection;

pub use adaboost::AdaBoostRegressor;
pub use candidates::{default_candidates, Candidate, FittedModel, ParamSet};
pub use cross_validation::{CVResults, CVSplit, KFold};
pub use decision_tree::{RegressionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use leafwise::{LeafwiseBoostingConfig, LeafwiseBoostingRegressor};
pub use linear::LinearRegression;
pub use metrics::{r2_score, RegressionMetrics};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
pub use second_order::{SecondOrderBoostingConfig, SecondOrderBoostingRegressor};
pub use selection::{select_best, CandidateScore, SelectionConfig, SelectionReport};
