use std::fs;
use std::io::Write;

use featureset_models::build_model::FittedModel;
use featureset_models::config::{BuildConfig, ALL_MODEL_TYPES};
use featureset_models::error::ModelError;
use featureset_models::search::{ModelOptions, ParamSetting, ParamValue};
use featureset_models::{create_and_pickle_model, ModelArtifact};
use ndarray::array;
use tempfile::tempdir;

fn write_classification_featureset(config: &BuildConfig, featureset_id: &str) {
    fs::create_dir_all(&config.features_dir).expect("failed to create features dir");
    let mut file = fs::File::create(config.featureset_path(featureset_id))
        .expect("failed to create featureset file");
    writeln!(file, "name,target,f1,f2,source").unwrap();
    for i in 0..24 {
        let label = i % 2;
        writeln!(
            file,
            "s{},{},{},{},survey_{}",
            i,
            label,
            label as f64 * 4.0 + i as f64 * 0.01,
            2.0 - label as f64 * 4.0 + i as f64 * 0.01,
            i % 3
        )
        .unwrap();
    }
}

fn write_regression_featureset(config: &BuildConfig, featureset_id: &str) {
    fs::create_dir_all(&config.features_dir).expect("failed to create features dir");
    let mut file = fs::File::create(config.featureset_path(featureset_id))
        .expect("failed to create featureset file");
    writeln!(file, "name,target,f1,f2").unwrap();
    for i in 0..24 {
        let f1 = i as f64 * 0.5;
        let f2 = (i % 5) as f64;
        // target = 2*f1 - f2 + 1
        writeln!(file, "s{},{},{},{}", i, 2.0 * f1 - f2 + 1.0, f1, f2).unwrap();
    }
}

fn test_config(dir: &tempfile::TempDir) -> BuildConfig {
    BuildConfig::new(dir.path().join("features"), dir.path().join("models"))
}

#[test]
fn test_build_and_load_every_registered_model_type() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = test_config(&dir);
    write_classification_featureset(&config, "fs_cls");
    write_regression_featureset(&config, "fs_reg");

    for (idx, model_type) in ALL_MODEL_TYPES.iter().enumerate() {
        let model_id = format!("model_{}", idx);
        let featureset_id = if model_type.is_classifier() {
            "fs_cls"
        } else {
            "fs_reg"
        };

        let artifact = create_and_pickle_model(
            &model_id,
            model_type.display_name(),
            featureset_id,
            &ModelOptions::new(),
            &[],
            &config,
        )
        .expect("model build failed");

        assert!(config.model_path(&model_id).exists());
        assert_eq!(artifact.model_type, *model_type);
        assert_eq!(artifact.feature_names, ["f1", "f2"]);
        assert_eq!(artifact.n_samples, 24);

        let loaded = ModelArtifact::load(&config, &model_id).expect("artifact load failed");
        let x = array![[4.1, -1.9], [0.1, 2.1]];
        let original = artifact.fitted.predict(&x).expect("predict failed");
        let reloaded = loaded.fitted.predict(&x).expect("predict after load failed");
        assert_eq!(original.len(), 2);
        for (a, b) in original.iter().zip(reloaded.iter()) {
            assert_eq!(a, b, "reloaded model disagrees for {}", model_type.display_name());
        }

        if model_type.is_classifier() {
            let proba = loaded.fitted.predict_proba(&x).expect("predict_proba failed");
            assert_eq!(proba.nrows(), 2);
            for row in proba.rows() {
                let total: f64 = row.sum();
                assert!((total - 1.0).abs() < 1e-9);
            }
            assert_eq!(loaded.fitted.model().classes(), Some(&[0.0, 1.0][..]));
        } else {
            assert!(loaded.fitted.predict_proba(&x).is_err());
            assert!(loaded.fitted.model().classes().is_none());
        }
    }
}

#[test]
fn test_classifier_learns_separable_data() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = test_config(&dir);
    write_classification_featureset(&config, "fs_cls");

    let artifact = create_and_pickle_model(
        "rfc",
        "Random Forest Classifier",
        "fs_cls",
        &ModelOptions::new(),
        &[],
        &config,
    )
    .expect("model build failed");

    let x = array![[4.05, -1.95], [0.05, 2.05]];
    let predictions = artifact.fitted.predict(&x).expect("predict failed");
    assert_eq!(predictions[0], 1.0);
    assert_eq!(predictions[1], 0.0);
}

#[test]
fn test_optimized_build_selects_from_declared_grid() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = test_config(&dir);
    write_classification_featureset(&config, "fs_cls");

    let mut options = ModelOptions::new();
    options.insert(
        "n_estimators".to_string(),
        ParamSetting::Grid(vec![ParamValue::Int(5), ParamValue::Int(15)]),
    );
    options.insert(
        "criterion".to_string(),
        ParamSetting::Fixed(ParamValue::Str("entropy".to_string())),
    );

    let artifact = create_and_pickle_model(
        "rfc_opt",
        "Random Forest Classifier",
        "fs_cls",
        &options,
        &["n_estimators".to_string()],
        &config,
    )
    .expect("optimized build failed");

    match &artifact.fitted {
        FittedModel::Search(search) => {
            assert_eq!(search.best_params.len(), 1);
            let n = search
                .best_params
                .get("n_estimators")
                .and_then(|v| v.as_int())
                .expect("best n_estimators missing");
            assert!(n == 5 || n == 15);
            assert_eq!(search.cv_results.len(), 2);
            assert!(search.best_score >= 0.9, "score was {}", search.best_score);
        }
        FittedModel::Single(_) => panic!("expected a search result"),
    }
}

#[test]
fn test_optimized_regressor_build() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = test_config(&dir);
    write_regression_featureset(&config, "fs_reg");

    let mut options = ModelOptions::new();
    options.insert(
        "alpha_1".to_string(),
        ParamSetting::Grid(vec![ParamValue::Float(1e-6), ParamValue::Float(1e-3)]),
    );

    let artifact = create_and_pickle_model(
        "ridge_opt",
        "Bayesian Ridge Regressor",
        "fs_reg",
        &options,
        &["alpha_1".to_string()],
        &config,
    )
    .expect("optimized build failed");

    let best = artifact.fitted.best_params().expect("no best params");
    assert!(best.contains_key("alpha_1"));

    let x = array![[3.0, 2.0]];
    let prediction = artifact.fitted.predict(&x).expect("predict failed");
    assert!((prediction[0] - 5.0).abs() < 0.5, "prediction was {}", prediction[0]);
}

#[test]
fn test_unknown_model_type_fails_before_any_file_io() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = test_config(&dir);
    // No featureset file on disk at all.

    let err = create_and_pickle_model(
        "bad",
        "Quantum Forest",
        "does_not_exist",
        &ModelOptions::new(),
        &[],
        &config,
    )
    .expect_err("unknown model type must fail");

    match err.downcast_ref::<ModelError>() {
        Some(ModelError::UnknownModelType(name)) => assert_eq!(name, "Quantum Forest"),
        other => panic!("expected UnknownModelType, got {:?}", other),
    }
    assert!(!config.model_path("bad").exists());
}

#[test]
fn test_missing_featureset_file_is_reported() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = test_config(&dir);

    let err = create_and_pickle_model(
        "m1",
        "Linear Regressor",
        "does_not_exist",
        &ModelOptions::new(),
        &[],
        &config,
    )
    .expect_err("missing featureset must fail");

    match err.downcast_ref::<ModelError>() {
        Some(ModelError::MissingFeaturesetFile { path, .. }) => {
            assert!(path.ends_with("does_not_exist.csv"));
        }
        other => panic!("expected MissingFeaturesetFile, got {:?}", other),
    }
}

#[test]
fn test_unlisted_optimization_parameter_fails_fast() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = test_config(&dir);
    write_classification_featureset(&config, "fs_cls");

    let err = create_and_pickle_model(
        "rfc",
        "Random Forest Classifier",
        "fs_cls",
        &ModelOptions::new(),
        &["n_estimators".to_string()],
        &config,
    )
    .expect_err("absent search parameter must fail");

    match err.downcast_ref::<ModelError>() {
        Some(ModelError::InvalidSearchSpec(_)) => {}
        other => panic!("expected InvalidSearchSpec, got {:?}", other),
    }
    assert!(!config.model_path("rfc").exists());
}

#[test]
fn test_single_candidate_search_degenerates_to_plain_fit() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = test_config(&dir);
    write_classification_featureset(&config, "fs_cls");

    let mut options = ModelOptions::new();
    options.insert(
        "n_estimators".to_string(),
        ParamSetting::Grid(vec![ParamValue::Int(8)]),
    );

    let artifact = create_and_pickle_model(
        "rfc_one",
        "Random Forest Classifier",
        "fs_cls",
        &options,
        &["n_estimators".to_string()],
        &config,
    )
    .expect("single-candidate search failed");

    let best = artifact.fitted.best_params().expect("no best params");
    assert_eq!(best.get("n_estimators").and_then(|v| v.as_int()), Some(8));
}

#[test]
fn test_rebuild_overwrites_existing_artifact() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = test_config(&dir);
    write_regression_featureset(&config, "fs_reg");

    create_and_pickle_model(
        "shared_id",
        "Linear Regressor",
        "fs_reg",
        &ModelOptions::new(),
        &[],
        &config,
    )
    .expect("first build failed");

    create_and_pickle_model(
        "shared_id",
        "Bayesian Ridge Regressor",
        "fs_reg",
        &ModelOptions::new(),
        &[],
        &config,
    )
    .expect("second build failed");

    let loaded = ModelArtifact::load(&config, "shared_id").expect("artifact load failed");
    assert_eq!(
        loaded.model_type.display_name(),
        "Bayesian Ridge Regressor"
    );
}
