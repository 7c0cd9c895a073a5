//! Hyperparameter values, grid expansion, and cross-validated grid search.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::Model;

/// A single hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

/// Either a fixed hyperparameter value or a set of search candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSetting {
    Fixed(ParamValue),
    Grid(Vec<ParamValue>),
}

impl ParamSetting {
    fn candidates(&self) -> Vec<ParamValue> {
        match self {
            ParamSetting::Fixed(value) => vec![value.clone()],
            ParamSetting::Grid(values) => values.clone(),
        }
    }
}

/// Hyperparameter mapping, ordered for deterministic grid expansion.
pub type ModelOptions = BTreeMap<String, ParamSetting>;

/// A fitted grid-search wrapper: the refit best model plus the search report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchModel {
    pub best_model: Model,
    pub best_params: BTreeMap<String, ParamValue>,
    pub best_score: f64,
    /// Mean validation score per evaluated parameter combination.
    pub cv_results: Vec<(BTreeMap<String, ParamValue>, f64)>,
    pub n_folds: usize,
}

/// Number of cross-validation folds used by [`fit_optimized`].
const DEFAULT_FOLDS: usize = 3;

/// Fit `model` directly on the full table. Delegates to the estimator's own
/// training procedure; no file I/O.
pub fn fit_model(
    model: &mut Model,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> Result<(), ModelError> {
    model.fit(x, y)
}

/// Exhaustive cross-validated grid search.
///
/// Parameters named in `params_to_optimize` are searched over the candidate
/// values declared in `model_options`; every other entry of `model_options`
/// is applied as a fixed value before the search starts. The best-scoring
/// combination (accuracy for classifiers, R² for regressors) is refit on the
/// full data.
///
/// A name in `params_to_optimize` with no entry in `model_options` is an
/// `InvalidSearchSpec` error raised before any fitting work begins.
pub fn fit_optimized(
    mut model: Model,
    x: &Array2<f64>,
    y: &Array1<f64>,
    model_options: &ModelOptions,
    params_to_optimize: &[String],
) -> Result<GridSearchModel, ModelError> {
    // Validate the search spec up front, before touching the data.
    for name in params_to_optimize {
        match model_options.get(name) {
            None => {
                return Err(ModelError::InvalidSearchSpec(format!(
                    "parameter '{}' listed for optimization but absent from model options",
                    name
                )));
            }
            Some(setting) => {
                if setting.candidates().len() < 2 {
                    log::warn!(
                        "Parameter '{}' has fewer than two candidate values; search over it is degenerate",
                        name
                    );
                }
            }
        }
    }

    // Fixed parameters are held constant at their single given value.
    for (name, setting) in model_options {
        if params_to_optimize.contains(name) {
            continue;
        }
        match setting {
            ParamSetting::Fixed(value) => model.set_param(name, value)?,
            ParamSetting::Grid(values) => {
                return Err(ModelError::InvalidSearchSpec(format!(
                    "parameter '{}' has {} candidate values but is not listed for optimization",
                    name,
                    values.len()
                )));
            }
        }
    }

    let grid = expand_grid(model_options, params_to_optimize);
    let folds = k_fold_indices(x.nrows(), DEFAULT_FOLDS.min(x.nrows().max(1)), 42)?;

    let mut cv_results = Vec::with_capacity(grid.len());
    let mut best: Option<(BTreeMap<String, ParamValue>, f64)> = None;

    for combination in &grid {
        let mut fold_scores = Vec::with_capacity(folds.len());
        for (train_idx, test_idx) in &folds {
            let mut candidate = model.clone();
            for (name, value) in combination {
                candidate.set_param(name, value)?;
            }

            let x_train = x.select(ndarray::Axis(0), train_idx);
            let y_train = Array1::from_vec(train_idx.iter().map(|&i| y[i]).collect());
            let x_test = x.select(ndarray::Axis(0), test_idx);
            let y_test = Array1::from_vec(test_idx.iter().map(|&i| y[i]).collect());

            candidate.fit(&x_train, &y_train)?;
            let predictions = candidate.predict(&x_test)?;
            fold_scores.push(score(&y_test, &predictions, model.is_classifier()));
        }

        let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len().max(1) as f64;
        log::debug!("Grid point {:?} scored {:.4}", combination, mean_score);
        cv_results.push((combination.clone(), mean_score));

        if best.as_ref().map_or(true, |(_, s)| mean_score > *s) {
            best = Some((combination.clone(), mean_score));
        }
    }

    let (best_params, best_score) = best.ok_or_else(|| {
        ModelError::InvalidSearchSpec("search grid expanded to zero combinations".to_string())
    })?;

    // Refit on the full data with the winning combination.
    for (name, value) in &best_params {
        model.set_param(name, value)?;
    }
    model.fit(x, y)?;

    Ok(GridSearchModel {
        best_model: model,
        best_params,
        best_score,
        cv_results,
        n_folds: folds.len(),
    })
}

/// Cartesian product of the candidate values for `params_to_optimize`, in
/// deterministic (sorted-name) order.
pub fn expand_grid(
    model_options: &ModelOptions,
    params_to_optimize: &[String],
) -> Vec<BTreeMap<String, ParamValue>> {
    let mut names: Vec<&String> = params_to_optimize.iter().collect();
    names.sort();
    names.dedup();

    let mut combinations: Vec<BTreeMap<String, ParamValue>> = vec![BTreeMap::new()];
    for name in names {
        let candidates = match model_options.get(name.as_str()) {
            Some(setting) => setting.candidates(),
            None => continue,
        };
        let mut expanded = Vec::with_capacity(combinations.len() * candidates.len());
        for combination in &combinations {
            for candidate in &candidates {
                let mut next = combination.clone();
                next.insert(name.to_string(), candidate.clone());
                expanded.push(next);
            }
        }
        combinations = expanded;
    }
    combinations
}

/// Shuffled k-fold split of `0..n_samples`.
pub fn k_fold_indices(
    n_samples: usize,
    n_splits: usize,
    seed: u64,
) -> Result<Vec<(Vec<usize>, Vec<usize>)>, ModelError> {
    if n_splits < 2 {
        return Err(ModelError::Training(
            "cross-validation requires at least 2 folds".to_string(),
        ));
    }
    if n_samples < n_splits {
        return Err(ModelError::Training(format!(
            "n_samples ({}) must be >= n_splits ({})",
            n_samples, n_splits
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let fold_size = n_samples / n_splits;
    let remainder = n_samples % n_splits;

    let mut folds = Vec::with_capacity(n_splits);
    let mut start = 0;
    for fold_idx in 0..n_splits {
        let size = fold_size + usize::from(fold_idx < remainder);
        let test: Vec<usize> = indices[start..start + size].to_vec();
        let train: Vec<usize> = indices[..start]
            .iter()
            .chain(&indices[start + size..])
            .copied()
            .collect();
        folds.push((train, test));
        start += size;
    }
    Ok(folds)
}

/// Validation score: accuracy for classifiers, R² for regressors.
fn score(y_true: &Array1<f64>, y_pred: &Array1<f64>, classification: bool) -> f64 {
    if classification {
        accuracy(y_true, y_pred)
    } else {
        r2_score(y_true, y_pred)
    }
}

pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (**t - **p).abs() < 0.5)
        .count();
    correct as f64 / y_true.len() as f64
}

pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|&v| (v - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_grid_cartesian_product() {
        let mut options = ModelOptions::new();
        options.insert(
            "a".to_string(),
            ParamSetting::Grid(vec![ParamValue::Int(1), ParamValue::Int(2)]),
        );
        options.insert(
            "b".to_string(),
            ParamSetting::Grid(vec![
                ParamValue::Str("x".to_string()),
                ParamValue::Str("y".to_string()),
                ParamValue::Str("z".to_string()),
            ]),
        );
        let grid = expand_grid(&options, &["a".to_string(), "b".to_string()]);
        assert_eq!(grid.len(), 6);
        for combination in &grid {
            assert!(combination.contains_key("a"));
            assert!(combination.contains_key("b"));
        }
    }

    #[test]
    fn test_k_fold_partitions_all_samples() {
        let folds = k_fold_indices(10, 3, 7).unwrap();
        assert_eq!(folds.len(), 3);
        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, test)| test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), 10);
            assert!(test.iter().all(|i| !train.contains(i)));
        }
    }

    #[test]
    fn test_k_fold_too_few_samples() {
        assert!(k_fold_indices(1, 2, 0).is_err());
    }

    #[test]
    fn test_r2_perfect_fit() {
        let y = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        assert!((r2_score(&y, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_half() {
        let t = Array1::from_vec(vec![0.0, 1.0, 0.0, 1.0]);
        let p = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0]);
        assert!((accuracy(&t, &p) - 0.5).abs() < 1e-12);
    }
}
