//! The closed set of estimators behind the model registry.
//!
//! `Model` is a tagged variant per registered model type: it gives every
//! estimator a uniform fit/predict/predict_proba surface and a serde
//! round-trip without trait objects.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::error::ModelError;
use crate::models::bayesian::{ArdRegressor, BayesianRidgeRegressor};
use crate::models::linear::{LinearRegressor, RidgeClassifierCv};
use crate::models::random_forest::RandomForest;
use crate::models::sgd::SgdClassifier;
use crate::search::ParamValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    RandomForestClassifier(RandomForest),
    RandomForestRegressor(RandomForest),
    LinearSgdClassifier(SgdClassifier),
    LinearRegressor(LinearRegressor),
    RidgeClassifierCv(RidgeClassifierCv),
    BayesianArdRegressor(ArdRegressor),
    BayesianRidgeRegressor(BayesianRidgeRegressor),
}

impl Model {
    pub fn model_type(&self) -> ModelType {
        match self {
            Model::RandomForestClassifier(_) => ModelType::RandomForestClassifier,
            Model::RandomForestRegressor(_) => ModelType::RandomForestRegressor,
            Model::LinearSgdClassifier(_) => ModelType::LinearSgdClassifier,
            Model::LinearRegressor(_) => ModelType::LinearRegressor,
            Model::RidgeClassifierCv(_) => ModelType::RidgeClassifierCv,
            Model::BayesianArdRegressor(_) => ModelType::BayesianArdRegressor,
            Model::BayesianRidgeRegressor(_) => ModelType::BayesianRidgeRegressor,
        }
    }

    pub fn name(&self) -> &'static str {
        self.model_type().display_name()
    }

    pub fn is_classifier(&self) -> bool {
        self.model_type().is_classifier()
    }

    /// Fit the model in place. Delegates to the estimator's own training
    /// procedure.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        match self {
            Model::RandomForestClassifier(m) | Model::RandomForestRegressor(m) => m.fit(x, y),
            Model::LinearSgdClassifier(m) => m.fit(x, y),
            Model::LinearRegressor(m) => m.fit(x, y),
            Model::RidgeClassifierCv(m) => m.fit(x, y),
            Model::BayesianArdRegressor(m) => m.fit(x, y),
            Model::BayesianRidgeRegressor(m) => m.fit(x, y),
        }
    }

    /// Point prediction: class labels for classifiers, values for
    /// regressors.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        match self {
            Model::RandomForestClassifier(m) | Model::RandomForestRegressor(m) => m.predict(x),
            Model::LinearSgdClassifier(m) => m.predict(x),
            Model::LinearRegressor(m) => m.predict(x),
            Model::RidgeClassifierCv(m) => m.predict(x),
            Model::BayesianArdRegressor(m) => m.predict(x),
            Model::BayesianRidgeRegressor(m) => m.predict(x),
        }
    }

    /// Per-class probabilities. Errors for regressors.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        match self {
            Model::RandomForestClassifier(m) => m.predict_proba(x),
            Model::LinearSgdClassifier(m) => m.predict_proba(x),
            Model::RidgeClassifierCv(m) => m.predict_proba(x),
            Model::RandomForestRegressor(_)
            | Model::LinearRegressor(_)
            | Model::BayesianArdRegressor(_)
            | Model::BayesianRidgeRegressor(_) => Err(ModelError::Training(format!(
                "{} is a regressor and has no predict_proba",
                self.name()
            ))),
        }
    }

    /// Class labels seen during fit, for classifiers.
    pub fn classes(&self) -> Option<&[f64]> {
        match self {
            Model::RandomForestClassifier(m) => Some(m.classes()),
            Model::LinearSgdClassifier(m) => Some(m.classes()),
            Model::RidgeClassifierCv(m) => Some(m.classes()),
            _ => None,
        }
    }

    /// Set one hyperparameter by its sklearn-style name. Unknown names are
    /// an `InvalidSearchSpec` error.
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match self {
            Model::RandomForestClassifier(m) | Model::RandomForestRegressor(m) => {
                m.set_param(name, value)
            }
            Model::LinearSgdClassifier(m) => m.set_param(name, value),
            Model::LinearRegressor(m) => m.set_param(name, value),
            Model::RidgeClassifierCv(m) => m.set_param(name, value),
            Model::BayesianArdRegressor(m) => m.set_param(name, value),
            Model::BayesianRidgeRegressor(m) => m.set_param(name, value),
        }
    }
}
