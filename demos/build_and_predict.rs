//! End-to-end demo: write a small featureset, build an optimized model, and
//! predict with the reloaded artifact.
//!
//! Run with `RUST_LOG=debug` to see the search progress.
use std::fs;
use std::io::Write;

use featureset_models::config::BuildConfig;
use featureset_models::search::{ModelOptions, ParamSetting, ParamValue};
use featureset_models::{create_and_pickle_model, ModelArtifact};
use ndarray::array;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let workdir = tempfile::tempdir()?;
    let config = BuildConfig::new(workdir.path().join("features"), workdir.path().join("models"));

    fs::create_dir_all(&config.features_dir)?;
    let mut file = fs::File::create(config.featureset_path("demo_set"))?;
    writeln!(file, "name,target,amplitude,period")?;
    for i in 0..30 {
        let label = i % 2;
        writeln!(
            file,
            "obj{},{},{},{}",
            i,
            label,
            label as f64 * 3.0 + i as f64 * 0.02,
            1.0 - label as f64 * 3.0 + i as f64 * 0.02,
        )?;
    }

    let mut options = ModelOptions::new();
    options.insert(
        "n_estimators".to_string(),
        ParamSetting::Grid(vec![ParamValue::Int(5), ParamValue::Int(20)]),
    );

    create_and_pickle_model(
        "demo_model",
        "Random Forest Classifier",
        "demo_set",
        &options,
        &["n_estimators".to_string()],
        &config,
    )?;

    let artifact = ModelArtifact::load(&config, "demo_model")?;
    let x = array![[3.1, -1.9], [0.1, 1.1]];
    let predictions = artifact.fitted.predict(&x)?;
    let proba = artifact.fitted.predict_proba(&x)?;

    println!("model type: {}", artifact.model_type.display_name());
    if let Some(best) = artifact.fitted.best_params() {
        println!("best params: {:?}", best);
    }
    for (row, prediction) in predictions.iter().enumerate() {
        println!(
            "sample {} -> class {} (p = {:?})",
            row,
            prediction,
            proba.row(row)
        );
    }
    Ok(())
}
