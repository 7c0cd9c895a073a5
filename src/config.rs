use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Supported model types, keyed by their human-readable display name.
///
/// The registry is fixed: resolving an unknown display name is an error, not
/// a silent default.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    RandomForestClassifier,
    RandomForestRegressor,
    LinearSgdClassifier,
    LinearRegressor,
    RidgeClassifierCv,
    BayesianArdRegressor,
    BayesianRidgeRegressor,
}

/// All registered model types, in registry order.
pub const ALL_MODEL_TYPES: [ModelType; 7] = [
    ModelType::RandomForestClassifier,
    ModelType::RandomForestRegressor,
    ModelType::LinearSgdClassifier,
    ModelType::LinearRegressor,
    ModelType::RidgeClassifierCv,
    ModelType::BayesianArdRegressor,
    ModelType::BayesianRidgeRegressor,
];

impl ModelType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::RandomForestClassifier => "Random Forest Classifier",
            ModelType::RandomForestRegressor => "Random Forest Regressor",
            ModelType::LinearSgdClassifier => "Linear SGD Classifier",
            ModelType::LinearRegressor => "Linear Regressor",
            ModelType::RidgeClassifierCv => "Ridge Classifier CV",
            ModelType::BayesianArdRegressor => "Bayesian ARD Regressor",
            ModelType::BayesianRidgeRegressor => "Bayesian Ridge Regressor",
        }
    }

    pub fn is_classifier(&self) -> bool {
        matches!(
            self,
            ModelType::RandomForestClassifier
                | ModelType::LinearSgdClassifier
                | ModelType::RidgeClassifierCv
        )
    }
}

impl FromStr for ModelType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ALL_MODEL_TYPES
            .iter()
            .find(|model_type| model_type.display_name().eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| ModelError::UnknownModelType(name.to_string()))
    }
}

/// Directory layout for featureset inputs and model artifacts.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BuildConfig {
    /// Directory holding featureset CSV files, one per featureset id.
    pub features_dir: PathBuf,
    /// Directory receiving serialized model artifacts, one per model id.
    pub models_dir: PathBuf,
}

impl BuildConfig {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(features_dir: P, models_dir: Q) -> Self {
        Self {
            features_dir: features_dir.as_ref().to_path_buf(),
            models_dir: models_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the featureset file for a featureset id.
    pub fn featureset_path(&self, featureset_id: &str) -> PathBuf {
        self.features_dir.join(format!("{}.csv", featureset_id))
    }

    /// Path of the artifact file for a model id.
    pub fn model_path(&self, model_id: &str) -> PathBuf {
        self.models_dir.join(format!("{}.json", model_id))
    }
}
