//! The model-building pipeline: load a featureset, fit a model (directly or
//! through a hyperparameter search), and persist the result as an artifact
//! file keyed by model id.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::{BuildConfig, ModelType};
use crate::data_handling::{rectangularize, Featureset};
use crate::error::ModelError;
use crate::io::{artifact, featureset::read_featureset_csv};
use crate::models::build_model;
use crate::search::{fit_model, fit_optimized, GridSearchModel, ModelOptions, ParamSetting};

/// A fitted model, either trained directly or selected by grid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    Single(crate::models::Model),
    Search(GridSearchModel),
}

impl FittedModel {
    pub fn model(&self) -> &crate::models::Model {
        match self {
            FittedModel::Single(model) => model,
            FittedModel::Search(search) => &search.best_model,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        self.model().predict(x)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        self.model().predict_proba(x)
    }

    /// The winning parameter combination, if a search was run.
    pub fn best_params(
        &self,
    ) -> Option<&std::collections::BTreeMap<String, crate::search::ParamValue>> {
        match self {
            FittedModel::Single(_) => None,
            FittedModel::Search(search) => Some(&search.best_params),
        }
    }
}

/// A persisted trained model plus the context needed to apply it later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_id: String,
    pub model_type: ModelType,
    /// Feature column order the model was trained on; prediction input must
    /// follow it.
    pub feature_names: Vec<String>,
    pub n_samples: usize,
    pub fitted: FittedModel,
}

impl ModelArtifact {
    pub fn load(config: &BuildConfig, model_id: &str) -> anyhow::Result<Self> {
        artifact::load_json(config.model_path(model_id))
    }
}

/// Fit a model of the given type on an in-memory featureset.
///
/// With a non-empty `params_to_optimize` list the fit runs as a
/// cross-validated grid search over the declared candidates; otherwise
/// `model_options` values are applied as fixed hyperparameters and the model
/// is fit once on the full table.
pub fn build_model_from_featureset(
    model_type: &ModelType,
    featureset: &Featureset,
    model_options: &ModelOptions,
    params_to_optimize: &[String],
) -> Result<FittedModel, ModelError> {
    let (table, target) = rectangularize(featureset)?;
    let mut model = build_model(model_type);
    log::info!(
        "Fitting {} on {} samples x {} features",
        model.name(),
        table.nrows(),
        table.ncols()
    );

    if params_to_optimize.is_empty() {
        for (name, setting) in model_options {
            match setting {
                ParamSetting::Fixed(value) => model.set_param(name, value)?,
                ParamSetting::Grid(values) => {
                    return Err(ModelError::InvalidSearchSpec(format!(
                        "parameter '{}' has {} candidate values but no parameters are listed for optimization",
                        name,
                        values.len()
                    )));
                }
            }
        }
        fit_model(&mut model, &table, &target)?;
        Ok(FittedModel::Single(model))
    } else {
        let search = fit_optimized(model, &table, &target, model_options, params_to_optimize)?;
        log::info!(
            "Grid search selected {:?} (score {:.4})",
            search.best_params,
            search.best_score
        );
        Ok(FittedModel::Search(search))
    }
}

/// Build a model from a stored featureset and persist the trained artifact.
///
/// The model-type name is resolved against the registry before any file is
/// touched, so an unknown name fails without reading the featureset. The
/// artifact lands at the path derived from `model_id`, overwriting any
/// previous artifact with that id.
pub fn create_and_pickle_model(
    model_id: &str,
    model_type_name: &str,
    featureset_id: &str,
    model_options: &ModelOptions,
    params_to_optimize: &[String],
    config: &BuildConfig,
) -> anyhow::Result<ModelArtifact> {
    let model_type: ModelType = model_type_name.parse::<ModelType>()?;

    let featureset = read_featureset_csv(config.featureset_path(featureset_id))?;
    let fitted =
        build_model_from_featureset(&model_type, &featureset, model_options, params_to_optimize)?;

    let artifact = ModelArtifact {
        model_id: model_id.to_string(),
        model_type,
        feature_names: featureset.feature_names.clone(),
        n_samples: featureset.n_samples(),
        fitted,
    };
    artifact::save_json(&artifact, config.model_path(model_id))?;
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ParamValue;
    use ndarray::array;

    fn toy_classification_featureset() -> Featureset {
        let n = 20;
        let mut f1 = Vec::new();
        let mut f2 = Vec::new();
        let mut target = Vec::new();
        for i in 0..n {
            let label = (i % 2) as f64;
            f1.push(label * 4.0 + (i as f64) * 0.01);
            f2.push(2.0 - label * 4.0 + (i as f64) * 0.01);
            target.push(label);
        }
        Featureset::new(
            (0..n).map(|i| format!("s{}", i)).collect(),
            vec!["f1".to_string(), "f2".to_string()],
            vec![f1, f2],
            target,
        )
        .unwrap()
    }

    #[test]
    fn test_build_single_model_predicts() {
        let featureset = toy_classification_featureset();
        let fitted = build_model_from_featureset(
            &ModelType::RandomForestClassifier,
            &featureset,
            &ModelOptions::new(),
            &[],
        )
        .unwrap();
        let x = array![[4.05, -1.95], [0.05, 2.05]];
        let predictions = fitted.predict(&x).unwrap();
        assert_eq!(predictions.len(), 2);
        assert!(fitted.best_params().is_none());
    }

    #[test]
    fn test_grid_values_require_optimization_list() {
        let featureset = toy_classification_featureset();
        let mut options = ModelOptions::new();
        options.insert(
            "n_estimators".to_string(),
            ParamSetting::Grid(vec![ParamValue::Int(5), ParamValue::Int(10)]),
        );
        let err = build_model_from_featureset(
            &ModelType::RandomForestClassifier,
            &featureset,
            &options,
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidSearchSpec(_)));
    }

    #[test]
    fn test_optimized_build_reports_best_params() {
        let featureset = toy_classification_featureset();
        let mut options = ModelOptions::new();
        options.insert(
            "n_estimators".to_string(),
            ParamSetting::Grid(vec![ParamValue::Int(5), ParamValue::Int(10)]),
        );
        let fitted = build_model_from_featureset(
            &ModelType::RandomForestClassifier,
            &featureset,
            &options,
            &["n_estimators".to_string()],
        )
        .unwrap();
        let best = fitted.best_params().unwrap();
        let n = best.get("n_estimators").and_then(|v| v.as_int()).unwrap();
        assert!(n == 5 || n == 10);
    }
}
