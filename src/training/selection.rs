//! Model selection: grid search, cross-validation and the acceptance gate

use super::candidates::{Candidate, FittedModel, ParamSet};
use super::cross_validation::{CVResults, KFold};
use super::metrics::r2_score;
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Folds for the per-candidate grid search.
    pub n_folds: usize,
    /// Minimum acceptable test R² for the winning candidate.
    pub acceptance_threshold: f64,
    /// Seed pinned across folds and stochastic estimators.
    pub seed: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            n_folds: 3,
            acceptance_threshold: 0.6,
            seed: 42,
        }
    }
}

/// Outcome for one candidate family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub best_params: ParamSet,
    /// Mean R² of the best grid entry across CV folds.
    pub cv_score: f64,
    /// R² of the refit model on the held-out test split.
    pub test_r2: f64,
}

/// Per-candidate scores plus the winner, returned for logging and
/// inspection; callers persist only the winning model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionReport {
    pub scores: Vec<CandidateScore>,
    pub winner: String,
    pub winner_test_r2: f64,
}

/// Grid-search every candidate with k-fold CV on the training split, refit
/// each family's best parameters on the full training split, score on the
/// test split, and return the candidate with the strictly highest test R².
///
/// Ties resolve to the first candidate in enumeration order. If even the
/// best test R² falls below the acceptance threshold, no model is returned.
pub fn select_best(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    candidates: &[Candidate],
    config: &SelectionConfig,
) -> Result<(FittedModel, SelectionReport)> {
    if candidates.is_empty() {
        return Err(ScorecastError::Fit("no candidates supplied".to_string()));
    }

    let mut scores: Vec<CandidateScore> = Vec::with_capacity(candidates.len());
    let mut winner: Option<(usize, FittedModel)> = None;

    for (idx, candidate) in candidates.iter().enumerate() {
        let (best_params, cv_score) = best_grid_entry(x_train, y_train, candidate, config)?;

        let model = best_params.fit(x_train, y_train, config.seed)?;
        let test_pred = model.predict(x_test)?;
        let test_r2 = r2_score(y_test, &test_pred);

        info!(
            candidate = %candidate.name,
            params = %best_params,
            cv_r2 = cv_score,
            test_r2,
            "scored candidate"
        );

        scores.push(CandidateScore {
            name: candidate.name.clone(),
            best_params,
            cv_score,
            test_r2,
        });

        // Strict comparison keeps the first-seen candidate on ties.
        let is_better = match &winner {
            Some((best_idx, _)) => test_r2 > scores[*best_idx].test_r2,
            None => true,
        };
        if is_better {
            winner = Some((idx, model));
        }
    }

    let (best_idx, best_model) = winner.ok_or_else(|| {
        ScorecastError::Fit("selection produced no fitted candidate".to_string())
    })?;
    let best = &scores[best_idx];

    if best.test_r2 < config.acceptance_threshold {
        warn!(
            best = %best.name,
            test_r2 = best.test_r2,
            threshold = config.acceptance_threshold,
            "no candidate met the acceptance threshold"
        );
        return Err(ScorecastError::NoAcceptableModel {
            best_name: best.name.clone(),
            best_score: best.test_r2,
            threshold: config.acceptance_threshold,
        });
    }

    info!(winner = %best.name, test_r2 = best.test_r2, "selected model");
    let report = SelectionReport {
        winner: best.name.clone(),
        winner_test_r2: best.test_r2,
        scores,
    };
    Ok((best_model, report))
}

/// Pick the grid entry with the highest mean CV R²; ties keep the earlier
/// entry in grid order.
fn best_grid_entry(
    x: &Array2<f64>,
    y: &Array1<f64>,
    candidate: &Candidate,
    config: &SelectionConfig,
) -> Result<(ParamSet, f64)> {
    if candidate.grid.is_empty() {
        return Err(ScorecastError::InvalidParameter {
            name: "grid".to_string(),
            value: "[]".to_string(),
            reason: format!("candidate '{}' has no parameter sets", candidate.name),
        });
    }

    let mut best: Option<(f64, &ParamSet)> = None;
    for params in &candidate.grid {
        let mean_r2 = cv_mean_r2(x, y, params, config)?;
        debug!(candidate = %candidate.name, params = %params, cv_r2 = mean_r2, "grid entry");
        if best.map_or(true, |(score, _)| mean_r2 > score) {
            best = Some((mean_r2, params));
        }
    }

    // Grid is nonempty, so best is always set.
    let (score, params) = best.ok_or_else(|| {
        ScorecastError::Fit(format!("grid search failed for '{}'", candidate.name))
    })?;
    Ok((params.clone(), score))
}

/// Mean validation R² of one parameter set across the seeded folds.
fn cv_mean_r2(
    x: &Array2<f64>,
    y: &Array1<f64>,
    params: &ParamSet,
    config: &SelectionConfig,
) -> Result<f64> {
    let kfold = KFold::new(config.n_folds, config.seed);
    let splits = kfold.split(x.nrows())?;

    let mut fold_scores = Vec::with_capacity(splits.len());
    for split in &splits {
        let x_fit = x.select(Axis(0), &split.train_indices);
        let y_fit: Array1<f64> =
            Array1::from_vec(split.train_indices.iter().map(|&i| y[i]).collect());
        let x_val = x.select(Axis(0), &split.test_indices);
        let y_val: Array1<f64> =
            Array1::from_vec(split.test_indices.iter().map(|&i| y[i]).collect());

        let model = params.fit(&x_fit, &y_fit, config.seed)?;
        let pred = model.predict(&x_val)?;
        fold_scores.push(r2_score(&y_val, &pred));
    }

    Ok(CVResults::from_scores(fold_scores).mean_score)
}
