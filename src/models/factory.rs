use crate::config::ModelType;
use crate::models::bayesian::{ArdRegressor, BayesianRidgeRegressor};
use crate::models::estimator::Model;
use crate::models::linear::{LinearRegressor, RidgeClassifierCv};
use crate::models::random_forest::RandomForest;
use crate::models::sgd::SgdClassifier;

/// Build an untrained estimator with default hyperparameters from a registry
/// tag. No side effects.
pub fn build_model(model_type: &ModelType) -> Model {
    match model_type {
        ModelType::RandomForestClassifier => {
            Model::RandomForestClassifier(RandomForest::new_classifier())
        }
        ModelType::RandomForestRegressor => {
            Model::RandomForestRegressor(RandomForest::new_regressor())
        }
        ModelType::LinearSgdClassifier => Model::LinearSgdClassifier(SgdClassifier::new()),
        ModelType::LinearRegressor => Model::LinearRegressor(LinearRegressor::new()),
        ModelType::RidgeClassifierCv => Model::RidgeClassifierCv(RidgeClassifierCv::new()),
        ModelType::BayesianArdRegressor => Model::BayesianArdRegressor(ArdRegressor::new()),
        ModelType::BayesianRidgeRegressor => {
            Model::BayesianRidgeRegressor(BayesianRidgeRegressor::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ALL_MODEL_TYPES;

    #[test]
    fn test_factory_covers_registry() {
        for model_type in ALL_MODEL_TYPES {
            let model = build_model(&model_type);
            assert_eq!(model.model_type(), model_type);
            assert_eq!(model.is_classifier(), model_type.is_classifier());
        }
    }
}
