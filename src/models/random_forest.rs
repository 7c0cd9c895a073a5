//! Random forest classifier and regressor.

use std::collections::HashMap;

use ndarray::{Array1, Array2, Axis};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::decision_tree::{Criterion, DecisionTree};
use crate::search::ParamValue;

/// Strategy for the number of features examined per split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MaxFeatures {
    /// Square root of the feature count (sklearn's "auto"/"sqrt").
    Sqrt,
    /// Log2 of the feature count.
    Log2,
    /// Fixed number of features.
    Fixed(usize),
    /// All features.
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fixed(n) => *n,
            MaxFeatures::All => n_features,
        };
        n.clamp(1, n_features)
    }
}

/// Bootstrap ensemble of CART trees; majority vote for classification, mean
/// prediction for regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub criterion: Criterion,
    pub random_state: u64,
    is_classification: bool,
    classes: Vec<f64>,
    n_features: usize,
}

impl RandomForest {
    pub fn new_classifier() -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: 10,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: 0,
            is_classification: true,
            classes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn new_regressor() -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: 10,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            criterion: Criterion::Mse,
            random_state: 0,
            is_classification: false,
            classes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn is_classifier(&self) -> bool {
        self.is_classification
    }

    /// Class labels seen during fit (classification only).
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "n_estimators" => {
                self.n_estimators = int_param(name, value)? as usize;
            }
            "max_depth" => {
                self.max_depth = Some(int_param(name, value)? as usize);
            }
            "min_samples_split" => {
                self.min_samples_split = int_param(name, value)? as usize;
            }
            "min_samples_leaf" => {
                self.min_samples_leaf = int_param(name, value)? as usize;
            }
            "criterion" => {
                let text = value.as_str().ok_or_else(|| {
                    ModelError::InvalidSearchSpec("criterion must be a string".to_string())
                })?;
                self.criterion = Criterion::parse(text)?;
            }
            "max_features" => {
                self.max_features = match value {
                    ParamValue::Int(n) if *n > 0 => MaxFeatures::Fixed(*n as usize),
                    ParamValue::Str(s) => match s.to_lowercase().as_str() {
                        "auto" | "sqrt" => MaxFeatures::Sqrt,
                        "log2" => MaxFeatures::Log2,
                        "all" | "none" => MaxFeatures::All,
                        other => {
                            return Err(ModelError::InvalidSearchSpec(format!(
                                "unknown max_features value '{}'",
                                other
                            )));
                        }
                    },
                    _ => {
                        return Err(ModelError::InvalidSearchSpec(
                            "max_features must be a positive int or a strategy name".to_string(),
                        ));
                    }
                };
            }
            "bootstrap" => {
                self.bootstrap = value.as_bool().ok_or_else(|| {
                    ModelError::InvalidSearchSpec("bootstrap must be a bool".to_string())
                })?;
            }
            "random_state" => {
                self.random_state = int_param(name, value)? as u64;
            }
            other => {
                return Err(ModelError::InvalidSearchSpec(format!(
                    "random forest has no hyperparameter '{}'",
                    other
                )));
            }
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(ModelError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ModelError::Training("empty dataset".to_string()));
        }

        self.n_features = x.ncols();
        if self.is_classification {
            let mut classes: Vec<f64> = y.to_vec();
            classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            classes.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
            self.classes = classes;
        }

        let max_features = self.max_features.resolve(self.n_features);
        let base_seed = self.random_state;

        let trees: Result<Vec<DecisionTree>, ModelError> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples)
                        .map(|_| (rng.next_u64() as usize) % n_samples)
                        .collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = if self.is_classification {
                    DecisionTree::new_classifier(self.criterion)
                } else {
                    DecisionTree::new_regressor()
                };
                tree.max_depth = self.max_depth;
                tree.min_samples_split = self.min_samples_split;
                tree.min_samples_leaf = self.min_samples_leaf;
                tree.max_features = Some(max_features);
                tree.seed = seed;

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        log::debug!(
            "Fitted random forest with {} trees on {} samples x {} features",
            self.trees.len(),
            n_samples,
            self.n_features
        );
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }

        let all_predictions: Result<Vec<Array1<f64>>, ModelError> =
            self.trees.par_iter().map(|tree| tree.predict(x)).collect();
        let all_predictions = all_predictions?;
        let n_samples = x.nrows();

        let predictions: Vec<f64> = if self.is_classification {
            (0..n_samples)
                .map(|i| {
                    let mut votes: HashMap<i64, usize> = HashMap::new();
                    for preds in &all_predictions {
                        *votes.entry(preds[i].round() as i64).or_insert(0) += 1;
                    }
                    votes
                        .into_iter()
                        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                        .map(|(class, _)| class as f64)
                        .unwrap_or(0.0)
                })
                .collect()
        } else {
            (0..n_samples)
                .map(|i| {
                    all_predictions.iter().map(|p| p[i]).sum::<f64>()
                        / all_predictions.len() as f64
                })
                .collect()
        };

        Ok(Array1::from_vec(predictions))
    }

    /// Per-class vote fractions (classification only). Column order follows
    /// [`RandomForest::classes`].
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if !self.is_classification {
            return Err(ModelError::Training(
                "predict_proba is only available for classification".to_string(),
            ));
        }

        let all_predictions: Result<Vec<Array1<f64>>, ModelError> =
            self.trees.par_iter().map(|tree| tree.predict(x)).collect();
        let all_predictions = all_predictions?;

        let n_samples = x.nrows();
        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((n_samples, n_classes));

        for i in 0..n_samples {
            for preds in &all_predictions {
                let class = preds[i].round() as i64;
                if let Some(class_idx) = self
                    .classes
                    .iter()
                    .position(|&c| c.round() as i64 == class)
                {
                    proba[[i, class_idx]] += 1.0;
                }
            }
            let row_sum: f64 = proba.row(i).sum();
            if row_sum > 0.0 {
                for j in 0..n_classes {
                    proba[[i, j]] /= row_sum;
                }
            }
        }

        Ok(proba)
    }
}

fn int_param(name: &str, value: &ParamValue) -> Result<i64, ModelError> {
    value.as_int().filter(|v| *v >= 0).ok_or_else(|| {
        ModelError::InvalidSearchSpec(format!("{} must be a non-negative integer", name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_classification() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_classifier_fit_predict() {
        let (x, y) = toy_classification();
        let mut forest = RandomForest::new_classifier();
        forest.random_state = 42;
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.n_trees(), forest.n_estimators);
        assert!(forest.is_classifier());
        let preds = forest.predict(&x).unwrap();
        assert_eq!(preds.len(), y.len());
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (**p - **t).abs() < 0.5)
            .count();
        assert!(correct >= 5);
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let (x, y) = toy_classification();
        let mut forest = RandomForest::new_classifier();
        forest.random_state = 1;
        forest.fit(&x, &y).unwrap();
        let proba = forest.predict_proba(&x).unwrap();
        assert_eq!(proba.shape(), &[6, 2]);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_regressor_rejects_proba() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0, 3.0];
        let mut forest = RandomForest::new_regressor();
        forest.fit(&x, &y).unwrap();
        assert!(forest.predict_proba(&x).is_err());
    }

    #[test]
    fn test_set_param_unknown_name() {
        let mut forest = RandomForest::new_classifier();
        let err = forest
            .set_param("n_neighbors", &ParamValue::Int(3))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidSearchSpec(_)));
    }

    #[test]
    fn test_set_param_max_features_variants() {
        let mut forest = RandomForest::new_classifier();
        forest
            .set_param("max_features", &ParamValue::Str("auto".to_string()))
            .unwrap();
        assert_eq!(forest.max_features, MaxFeatures::Sqrt);
        forest
            .set_param("max_features", &ParamValue::Int(3))
            .unwrap();
        assert_eq!(forest.max_features, MaxFeatures::Fixed(3));
    }
}
