//! Ordinary least squares regression and the cross-validated ridge
//! classifier.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::linalg::solve_symmetric;
use crate::search::ParamValue;

/// Solve a (possibly ridge-regularized) least-squares problem on centered
/// data. Returns coefficients and intercept.
pub(crate) fn least_squares(
    x: &Array2<f64>,
    y: &Array1<f64>,
    alpha: f64,
    fit_intercept: bool,
) -> Result<(Array1<f64>, f64), ModelError> {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    if n_samples != y.len() {
        return Err(ModelError::Shape {
            expected: format!("y length = {}", n_samples),
            actual: format!("y length = {}", y.len()),
        });
    }
    if n_samples == 0 {
        return Err(ModelError::Training("empty dataset".to_string()));
    }

    let (x_centered, y_centered, x_mean, y_mean) = if fit_intercept {
        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ModelError::Training("empty dataset".to_string()))?;
        let y_mean = y.iter().sum::<f64>() / n_samples as f64;
        let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
        let y_centered = y.mapv(|v| v - y_mean);
        (x_centered, y_centered, Some(x_mean), y_mean)
    } else {
        (x.clone(), y.clone(), None, 0.0)
    };

    // Normal equations: (X^T X + alpha*I) w = X^T y
    let mut xtx = x_centered.t().dot(&x_centered);
    if alpha > 0.0 {
        for i in 0..n_features {
            xtx[[i, i]] += alpha;
        }
    }
    let xty = x_centered.t().dot(&y_centered);

    let coefficients = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ModelError::Training("normal equations are singular".to_string())
    })?;

    let intercept = match x_mean {
        Some(mean) => y_mean - mean.dot(&coefficients),
        None => 0.0,
    };
    Ok((coefficients, intercept))
}

/// Ordinary least squares linear regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub fit_intercept: bool,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "fit_intercept" => {
                self.fit_intercept = value.as_bool().ok_or_else(|| {
                    ModelError::InvalidSearchSpec("fit_intercept must be a bool".to_string())
                })?;
            }
            other => {
                return Err(ModelError::InvalidSearchSpec(format!(
                    "linear regressor has no hyperparameter '{}'",
                    other
                )));
            }
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        let (coefficients, intercept) = least_squares(x, y, 0.0, self.fit_intercept)?;
        self.coefficients = Some(coefficients);
        self.intercept = intercept;
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let coefficients = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(x.dot(coefficients) + self.intercept)
    }
}

impl Default for LinearRegressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Ridge classifier with built-in cross-validation over the regularization
/// strength, one-vs-rest for multiclass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeClassifierCv {
    pub alphas: Vec<f64>,
    pub fit_intercept: bool,
    pub cv_folds: usize,
    best_alpha: Option<f64>,
    classes: Vec<f64>,
    /// One (coefficients, intercept) pair per class.
    weights: Vec<(Array1<f64>, f64)>,
}

impl RidgeClassifierCv {
    pub fn new() -> Self {
        Self {
            alphas: vec![0.1, 1.0, 10.0],
            fit_intercept: true,
            cv_folds: 5,
            best_alpha: None,
            classes: Vec::new(),
            weights: Vec::new(),
        }
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn best_alpha(&self) -> Option<f64> {
        self.best_alpha
    }

    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "fit_intercept" => {
                self.fit_intercept = value.as_bool().ok_or_else(|| {
                    ModelError::InvalidSearchSpec("fit_intercept must be a bool".to_string())
                })?;
            }
            "cv" => {
                let folds = value.as_int().filter(|v| *v >= 2).ok_or_else(|| {
                    ModelError::InvalidSearchSpec("cv must be an integer >= 2".to_string())
                })?;
                self.cv_folds = folds as usize;
            }
            other => {
                return Err(ModelError::InvalidSearchSpec(format!(
                    "ridge classifier has no hyperparameter '{}'",
                    other
                )));
            }
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        let n_samples = x.nrows();
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

        let best_alpha = self.select_alpha(x, y)?;
        self.best_alpha = Some(best_alpha);
        self.weights = self.fit_one_vs_rest(x, y, best_alpha)?;
        log::debug!("Ridge classifier selected alpha = {}", best_alpha);
        Ok(())
    }

    /// Pick the alpha with the best cross-validated accuracy. With too few
    /// samples for a split, training accuracy decides.
    fn select_alpha(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64, ModelError> {
        if self.alphas.is_empty() {
            return Err(ModelError::InvalidSearchSpec(
                "alphas list is empty".to_string(),
            ));
        }
        if self.alphas.len() == 1 {
            return Ok(self.alphas[0]);
        }

        let n_samples = x.nrows();
        let folds = crate::search::k_fold_indices(
            n_samples,
            self.cv_folds.min(n_samples),
            self.cv_folds as u64,
        );

        let mut best = (self.alphas[0], f64::NEG_INFINITY);
        for &alpha in &self.alphas {
            let score = match &folds {
                Ok(folds) => {
                    let mut total = 0.0;
                    for (train_idx, test_idx) in folds {
                        let x_train = x.select(Axis(0), train_idx);
                        let y_train =
                            Array1::from_vec(train_idx.iter().map(|&i| y[i]).collect());
                        let x_test = x.select(Axis(0), test_idx);
                        let y_test =
                            Array1::from_vec(test_idx.iter().map(|&i| y[i]).collect());

                        let weights = self.fit_one_vs_rest(&x_train, &y_train, alpha)?;
                        let preds = self.decide(&x_test, &weights);
                        total += crate::search::accuracy(&y_test, &preds);
                    }
                    total / folds.len() as f64
                }
                Err(_) => {
                    let weights = self.fit_one_vs_rest(x, y, alpha)?;
                    let preds = self.decide(x, &weights);
                    crate::search::accuracy(y, &preds)
                }
            };
            if score > best.1 {
                best = (alpha, score);
            }
        }
        Ok(best.0)
    }

    fn fit_one_vs_rest(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        alpha: f64,
    ) -> Result<Vec<(Array1<f64>, f64)>, ModelError> {
        self.classes
            .iter()
            .map(|&class| {
                let targets = y.mapv(|v| if (v - class).abs() < 1e-12 { 1.0 } else { -1.0 });
                least_squares(x, &targets, alpha, self.fit_intercept)
            })
            .collect()
    }

    fn decision_values(&self, x: &Array2<f64>, weights: &[(Array1<f64>, f64)]) -> Array2<f64> {
        let mut scores = Array2::zeros((x.nrows(), weights.len()));
        for (class_idx, (coefficients, intercept)) in weights.iter().enumerate() {
            let column = x.dot(coefficients) + *intercept;
            for (row, value) in column.iter().enumerate() {
                scores[[row, class_idx]] = *value;
            }
        }
        scores
    }

    fn decide(&self, x: &Array2<f64>, weights: &[(Array1<f64>, f64)]) -> Array1<f64> {
        let scores = self.decision_values(x, weights);
        Array1::from_vec(
            (0..x.nrows())
                .map(|row| {
                    let mut best = (0usize, f64::NEG_INFINITY);
                    for class_idx in 0..weights.len() {
                        let value = scores[[row, class_idx]];
                        if value > best.1 {
                            best = (class_idx, value);
                        }
                    }
                    self.classes[best.0]
                })
                .collect(),
        )
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if self.weights.is_empty() {
            return Err(ModelError::NotFitted);
        }
        Ok(self.decide(x, &self.weights))
    }

    /// Softmax over the one-vs-rest decision values. Column order follows
    /// [`RidgeClassifierCv::classes`].
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        if self.weights.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let mut scores = self.decision_values(x, &self.weights);
        for mut row in scores.rows_mut() {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut sum = 0.0;
            for value in row.iter_mut() {
                *value = (*value - max).exp();
                sum += *value;
            }
            for value in row.iter_mut() {
                *value /= sum;
            }
        }
        Ok(scores)
    }
}

impl Default for RidgeClassifierCv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ols_recovers_line() {
        // y = 2x + 1
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 3.0, 5.0, 7.0];
        let mut model = LinearRegressor::new();
        model.fit(&x, &y).unwrap();
        let coefficients = model.coefficients().unwrap();
        assert!((coefficients[0] - 2.0).abs() < 1e-6);
        let preds = model.predict(&array![[4.0]]).unwrap();
        assert!((preds[0] - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_ols_without_intercept() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![2.0, 4.0, 6.0];
        let mut model = LinearRegressor::new();
        model
            .set_param("fit_intercept", &ParamValue::Bool(false))
            .unwrap();
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert!((preds[2] - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_ridge_classifier_binary() {
        let x = array![
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, 0.3],
            [2.0, 2.0],
            [2.1, 1.9],
            [1.8, 2.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut model = RidgeClassifierCv::new();
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds, y);
        assert!(model.best_alpha().is_some());

        let proba = model.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ridge_classifier_multiclass() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [5.0, 0.0],
            [5.1, 0.1],
            [0.0, 5.0],
            [0.1, 5.1],
        ];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
        let mut model = RidgeClassifierCv::new();
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds, y);
        assert_eq!(model.classes(), &[0.0, 1.0, 2.0]);
    }
}
