//! Linear classifier trained by stochastic gradient descent with log loss,
//! one-vs-rest for multiclass.

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::search::ParamValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdClassifier {
    /// L2 regularization strength.
    pub alpha: f64,
    /// Initial learning rate for the inverse-scaling schedule.
    pub eta0: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub random_state: u64,
    classes: Vec<f64>,
    /// One weight vector and bias per class (one-vs-rest).
    weights: Vec<Array1<f64>>,
    biases: Vec<f64>,
}

impl SgdClassifier {
    pub fn new() -> Self {
        Self {
            alpha: 1e-4,
            eta0: 0.1,
            max_iter: 1000,
            tol: 1e-4,
            random_state: 0,
            classes: Vec::new(),
            weights: Vec::new(),
            biases: Vec::new(),
        }
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "alpha" => {
                self.alpha = positive_float(name, value)?;
            }
            "eta0" => {
                self.eta0 = positive_float(name, value)?;
            }
            "max_iter" => {
                let iterations = value.as_int().filter(|v| *v > 0).ok_or_else(|| {
                    ModelError::InvalidSearchSpec("max_iter must be a positive integer".to_string())
                })?;
                self.max_iter = iterations as usize;
            }
            "tol" => {
                self.tol = positive_float(name, value)?;
            }
            "random_state" => {
                let seed = value.as_int().filter(|v| *v >= 0).ok_or_else(|| {
                    ModelError::InvalidSearchSpec(
                        "random_state must be a non-negative integer".to_string(),
                    )
                })?;
                self.random_state = seed as u64;
            }
            "loss" => {
                // Only log loss is supported; reject anything else loudly.
                let loss = value.as_str().unwrap_or_default();
                if loss != "log" && loss != "log_loss" {
                    return Err(ModelError::InvalidSearchSpec(format!(
                        "unsupported SGD loss '{}'",
                        loss
                    )));
                }
            }
            other => {
                return Err(ModelError::InvalidSearchSpec(format!(
                    "SGD classifier has no hyperparameter '{}'",
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

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
        if classes.len() < 2 {
            return Err(ModelError::Training(
                "classification requires at least two classes".to_string(),
            ));
        }
        self.classes = classes;

        let mut weights = Vec::with_capacity(self.classes.len());
        let mut biases = Vec::with_capacity(self.classes.len());
        for (class_idx, &class) in self.classes.iter().enumerate() {
            let targets: Vec<f64> = y
                .iter()
                .map(|&v| if (v - class).abs() < 1e-12 { 1.0 } else { 0.0 })
                .collect();
            let seed = self.random_state.wrapping_add(class_idx as u64);
            let (w, b) = self.fit_binary(x, &targets, seed);
            weights.push(w);
            biases.push(b);
        }
        self.weights = weights;
        self.biases = biases;
        Ok(())
    }

    /// Plain SGD on the logistic loss with L2 penalty and inverse-scaling
    /// learning rate.
    fn fit_binary(&self, x: &Array2<f64>, targets: &[f64], seed: u64) -> (Array1<f64>, f64) {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut w = Array1::<f64>::zeros(n_features);
        let mut b = 0.0;
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut prev_loss = f64::MAX;
        let mut t = 1usize;

        for epoch in 0..self.max_iter {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for &i in &indices {
                let xi = x.row(i);
                let margin = xi.dot(&w) + b;
                let p = sigmoid(margin);
                let diff = p - targets[i];
                epoch_loss -= targets[i] * p.max(1e-15).ln()
                    + (1.0 - targets[i]) * (1.0 - p).max(1e-15).ln();

                let lr = self.eta0 / (t as f64).powf(0.25);
                for j in 0..n_features {
                    let grad = diff * xi[j] + self.alpha * w[j];
                    w[j] -= lr * grad;
                }
                b -= lr * diff;
                t += 1;
            }

            epoch_loss /= n_samples as f64;
            if epoch > 0 && (prev_loss - epoch_loss).abs() < self.tol {
                break;
            }
            prev_loss = epoch_loss;
        }

        (w, b)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let proba = self.predict_proba(x)?;
        Ok(Array1::from_vec(
            (0..x.nrows())
                .map(|row| {
                    let mut best = (0usize, f64::NEG_INFINITY);
                    for class_idx in 0..self.classes.len() {
                        let value = proba[[row, class_idx]];
                        if value > best.1 {
                            best = (class_idx, value);
                        }
                    }
                    self.classes[best.0]
                })
                .collect(),
        ))
    }

    /// Per-class sigmoid scores normalized to sum to one. Column order
    /// follows [`SgdClassifier::classes`].
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        if self.weights.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let n_samples = x.nrows();
        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((n_samples, n_classes));
        for (class_idx, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let margins = x.dot(w) + *b;
            for (row, margin) in margins.iter().enumerate() {
                proba[[row, class_idx]] = sigmoid(*margin);
            }
        }
        for mut row in proba.rows_mut() {
            let sum: f64 = row.iter().sum();
            if sum > 0.0 {
                for value in row.iter_mut() {
                    *value /= sum;
                }
            }
        }
        Ok(proba)
    }
}

impl Default for SgdClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn positive_float(name: &str, value: &ParamValue) -> Result<f64, ModelError> {
    value.as_float().filter(|v| *v > 0.0).ok_or_else(|| {
        ModelError::InvalidSearchSpec(format!("{} must be a positive number", name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binary_separable() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [3.0, 3.0],
            [3.1, 2.9],
            [2.9, 3.1],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut model = SgdClassifier::new();
        model.random_state = 42;
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds, y);
    }

    #[test]
    fn test_proba_rows_normalized() {
        let x = array![[0.0, 0.0], [0.1, 0.2], [3.0, 3.0], [3.1, 2.9]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut model = SgdClassifier::new();
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rejects_unknown_loss() {
        let mut model = SgdClassifier::new();
        let err = model
            .set_param("loss", &ParamValue::Str("hinge".to_string()))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidSearchSpec(_)));
    }
}
