//! Bayesian linear regression by evidence maximization: a shared-precision
//! ridge variant and the per-feature ARD variant.
//!
//! Both place Gamma hyperpriors on the noise precision `alpha` and the weight
//! precision(s) `lambda`, and iterate the closed-form posterior
//! `Sigma = (Lambda + alpha * X^T X)^-1`, `mu = alpha * Sigma * X^T y`
//! with re-estimation of the precisions until the coefficients stabilize.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::linalg::matrix_inverse;
use crate::search::ParamValue;

const EPS: f64 = 1e-12;

/// Centered copies of the training data plus the means needed to restore the
/// intercept.
fn center(
    x: &Array2<f64>,
    y: &Array1<f64>,
    fit_intercept: bool,
) -> Result<(Array2<f64>, Array1<f64>, Option<Array1<f64>>, f64), ModelError> {
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
    if fit_intercept {
        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ModelError::Training("empty dataset".to_string()))?;
        let y_mean = y.iter().sum::<f64>() / n_samples as f64;
        let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
        let y_centered = y.mapv(|v| v - y_mean);
        Ok((x_centered, y_centered, Some(x_mean), y_mean))
    } else {
        Ok((x.clone(), y.clone(), None, 0.0))
    }
}

fn initial_alpha(y: &Array1<f64>) -> f64 {
    let n = y.len() as f64;
    let mean = y.iter().sum::<f64>() / n;
    let variance = y.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    1.0 / (variance + EPS)
}

/// Bayesian ridge regression: single precision shared by all coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesianRidgeRegressor {
    pub max_iter: usize,
    pub tol: f64,
    /// Gamma hyperprior parameters over alpha (noise) and lambda (weights).
    pub alpha_1: f64,
    pub alpha_2: f64,
    pub lambda_1: f64,
    pub lambda_2: f64,
    pub fit_intercept: bool,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    /// Estimated noise precision after fit.
    pub alpha_: Option<f64>,
    /// Estimated weight precision after fit.
    pub lambda_: Option<f64>,
}

impl BayesianRidgeRegressor {
    pub fn new() -> Self {
        Self {
            max_iter: 300,
            tol: 1e-3,
            alpha_1: 1e-6,
            alpha_2: 1e-6,
            lambda_1: 1e-6,
            lambda_2: 1e-6,
            fit_intercept: true,
            coefficients: None,
            intercept: 0.0,
            alpha_: None,
            lambda_: None,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "max_iter" | "n_iter" => {
                let iterations = value.as_int().filter(|v| *v > 0).ok_or_else(|| {
                    ModelError::InvalidSearchSpec("max_iter must be a positive integer".to_string())
                })?;
                self.max_iter = iterations as usize;
            }
            "tol" => {
                self.tol = positive_float(name, value)?;
            }
            "alpha_1" => self.alpha_1 = positive_float(name, value)?,
            "alpha_2" => self.alpha_2 = positive_float(name, value)?,
            "lambda_1" => self.lambda_1 = positive_float(name, value)?,
            "lambda_2" => self.lambda_2 = positive_float(name, value)?,
            "fit_intercept" => {
                self.fit_intercept = value.as_bool().ok_or_else(|| {
                    ModelError::InvalidSearchSpec("fit_intercept must be a bool".to_string())
                })?;
            }
            other => {
                return Err(ModelError::InvalidSearchSpec(format!(
                    "Bayesian ridge regressor has no hyperparameter '{}'",
                    other
                )));
            }
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        let (x_centered, y_centered, x_mean, y_mean) = center(x, y, self.fit_intercept)?;
        let n_samples = x_centered.nrows() as f64;
        let n_features = x_centered.ncols();

        let xtx = x_centered.t().dot(&x_centered);
        let xty = x_centered.t().dot(&y_centered);

        let mut alpha = initial_alpha(&y_centered);
        let mut lambda = 1.0;
        let mut coefficients = Array1::<f64>::zeros(n_features);

        for iteration in 0..self.max_iter {
            // Posterior: Sigma = (lambda*I + alpha*X^T X)^-1, mu = alpha*Sigma*X^T y
            let mut a = xtx.mapv(|v| v * alpha);
            for j in 0..n_features {
                a[[j, j]] += lambda;
            }
            let sigma = matrix_inverse(&a).ok_or_else(|| {
                ModelError::Training("posterior precision matrix is singular".to_string())
            })?;
            let mu = sigma.dot(&xty).mapv(|v| v * alpha);

            // Effective number of well-determined parameters.
            let trace: f64 = (0..n_features).map(|j| sigma[[j, j]]).sum();
            let gamma = (n_features as f64 - lambda * trace).clamp(0.0, n_features as f64);

            let residuals = &y_centered - &x_centered.dot(&mu);
            let rss: f64 = residuals.iter().map(|&r| r * r).sum();

            lambda = (gamma + 2.0 * self.lambda_1) / (mu.dot(&mu) + 2.0 * self.lambda_2 + EPS);
            alpha = (n_samples - gamma + 2.0 * self.alpha_1) / (rss + 2.0 * self.alpha_2 + EPS);

            let delta: f64 = mu
                .iter()
                .zip(coefficients.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();
            coefficients = mu;
            if delta < self.tol {
                log::debug!("Bayesian ridge converged after {} iterations", iteration + 1);
                break;
            }
        }

        self.intercept = match &x_mean {
            Some(mean) => y_mean - mean.dot(&coefficients),
            None => 0.0,
        };
        self.coefficients = Some(coefficients);
        self.alpha_ = Some(alpha);
        self.lambda_ = Some(lambda);
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let coefficients = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(x.dot(coefficients) + self.intercept)
    }
}

impl Default for BayesianRidgeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Automatic relevance determination regression: one precision per feature,
/// so irrelevant features are shrunk towards zero individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArdRegressor {
    pub max_iter: usize,
    pub tol: f64,
    pub alpha_1: f64,
    pub alpha_2: f64,
    pub lambda_1: f64,
    pub lambda_2: f64,
    /// Upper bound on per-feature precision; beyond it a feature is treated
    /// as pruned.
    pub threshold_lambda: f64,
    pub fit_intercept: bool,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    pub alpha_: Option<f64>,
    /// Per-feature precisions after fit.
    pub lambda_: Option<Array1<f64>>,
}

impl ArdRegressor {
    pub fn new() -> Self {
        Self {
            max_iter: 300,
            tol: 1e-3,
            alpha_1: 1e-6,
            alpha_2: 1e-6,
            lambda_1: 1e-6,
            lambda_2: 1e-6,
            threshold_lambda: 1e4,
            fit_intercept: true,
            coefficients: None,
            intercept: 0.0,
            alpha_: None,
            lambda_: None,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "max_iter" | "n_iter" => {
                let iterations = value.as_int().filter(|v| *v > 0).ok_or_else(|| {
                    ModelError::InvalidSearchSpec("max_iter must be a positive integer".to_string())
                })?;
                self.max_iter = iterations as usize;
            }
            "tol" => self.tol = positive_float(name, value)?,
            "alpha_1" => self.alpha_1 = positive_float(name, value)?,
            "alpha_2" => self.alpha_2 = positive_float(name, value)?,
            "lambda_1" => self.lambda_1 = positive_float(name, value)?,
            "lambda_2" => self.lambda_2 = positive_float(name, value)?,
            "threshold_lambda" => self.threshold_lambda = positive_float(name, value)?,
            "fit_intercept" => {
                self.fit_intercept = value.as_bool().ok_or_else(|| {
                    ModelError::InvalidSearchSpec("fit_intercept must be a bool".to_string())
                })?;
            }
            other => {
                return Err(ModelError::InvalidSearchSpec(format!(
                    "ARD regressor has no hyperparameter '{}'",
                    other
                )));
            }
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        let (x_centered, y_centered, x_mean, y_mean) = center(x, y, self.fit_intercept)?;
        let n_samples = x_centered.nrows() as f64;
        let n_features = x_centered.ncols();

        let xtx = x_centered.t().dot(&x_centered);
        let xty = x_centered.t().dot(&y_centered);

        let mut alpha = initial_alpha(&y_centered);
        let mut lambdas = Array1::<f64>::ones(n_features);
        let mut coefficients = Array1::<f64>::zeros(n_features);

        for iteration in 0..self.max_iter {
            let mut a = xtx.mapv(|v| v * alpha);
            for j in 0..n_features {
                a[[j, j]] += lambdas[j];
            }
            let sigma = matrix_inverse(&a).ok_or_else(|| {
                ModelError::Training("posterior precision matrix is singular".to_string())
            })?;
            let mu = sigma.dot(&xty).mapv(|v| v * alpha);

            let mut gamma_total = 0.0;
            for j in 0..n_features {
                let gamma_j = (1.0 - lambdas[j] * sigma[[j, j]]).clamp(0.0, 1.0);
                gamma_total += gamma_j;
                lambdas[j] = ((gamma_j + 2.0 * self.lambda_1)
                    / (mu[j] * mu[j] + 2.0 * self.lambda_2 + EPS))
                    .min(self.threshold_lambda);
            }

            let residuals = &y_centered - &x_centered.dot(&mu);
            let rss: f64 = residuals.iter().map(|&r| r * r).sum();
            alpha = (n_samples - gamma_total + 2.0 * self.alpha_1) / (rss + 2.0 * self.alpha_2 + EPS);

            let delta: f64 = mu
                .iter()
                .zip(coefficients.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();
            coefficients = mu;
            if delta < self.tol {
                log::debug!("ARD regression converged after {} iterations", iteration + 1);
                break;
            }
        }

        // Pruned features predict exactly zero contribution.
        for j in 0..n_features {
            if lambdas[j] >= self.threshold_lambda {
                coefficients[j] = 0.0;
            }
        }

        self.intercept = match &x_mean {
            Some(mean) => y_mean - mean.dot(&coefficients),
            None => 0.0,
        };
        self.coefficients = Some(coefficients);
        self.alpha_ = Some(alpha);
        self.lambda_ = Some(lambdas);
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let coefficients = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(x.dot(coefficients) + self.intercept)
    }
}

impl Default for ArdRegressor {
    fn default() -> Self {
        Self::new()
    }
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

    fn line_data() -> (Array2<f64>, Array1<f64>) {
        // y = 3x - 1 with a little jitter
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![-1.0, 2.05, 4.95, 8.0, 11.02, 13.98];
        (x, y)
    }

    #[test]
    fn test_bayesian_ridge_recovers_slope() {
        let (x, y) = line_data();
        let mut model = BayesianRidgeRegressor::new();
        model.fit(&x, &y).unwrap();
        let coefficients = model.coefficients().unwrap();
        assert!((coefficients[0] - 3.0).abs() < 0.1);
        assert!(model.alpha_.unwrap() > 0.0);
        assert!(model.lambda_.unwrap() > 0.0);
    }

    #[test]
    fn test_ard_shrinks_irrelevant_feature() {
        // Second feature is pure noise.
        let x = array![
            [0.0, 0.3],
            [1.0, -0.2],
            [2.0, 0.1],
            [3.0, -0.4],
            [4.0, 0.2],
            [5.0, -0.1],
            [6.0, 0.4],
            [7.0, -0.3],
        ];
        let y = array![0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0];
        let mut model = ArdRegressor::new();
        model.fit(&x, &y).unwrap();
        let coefficients = model.coefficients().unwrap();
        assert!((coefficients[0] - 2.0).abs() < 0.1);
        assert!(coefficients[1].abs() < 0.2);
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let model = BayesianRidgeRegressor::new();
        let x = array![[1.0]];
        assert!(matches!(model.predict(&x), Err(ModelError::NotFitted)));
    }
}
