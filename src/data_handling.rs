//! Data structures and helpers for labeled featuresets.
//!
//! This module defines `Featureset` and the rectangularization step that
//! converts one into the flat numeric table estimators consume.
use std::collections::HashMap;

use ndarray::{Array1, Array2};

use crate::error::ModelError;

/// A labeled dataset of precomputed numeric features plus one target value
/// per sample.
///
/// All columns are row-aligned along the sample axis. Metadata columns carry
/// non-numeric per-sample annotations and are excluded from model input.
/// Missing feature values are represented as NaN.
#[derive(Debug, Clone)]
pub struct Featureset {
    /// Sample identifier per row.
    pub sample_ids: Vec<String>,
    /// Feature names, in column order.
    pub feature_names: Vec<String>,
    /// Feature columns, aligned with `feature_names`; each of sample length.
    pub columns: Vec<Vec<f64>>,
    /// Target value per sample.
    pub target: Vec<f64>,
    /// Non-numeric per-sample columns, excluded from rectangularization.
    pub metadata: HashMap<String, Vec<String>>,
}

impl Featureset {
    pub fn new(
        sample_ids: Vec<String>,
        feature_names: Vec<String>,
        columns: Vec<Vec<f64>>,
        target: Vec<f64>,
    ) -> Result<Self, ModelError> {
        let n_samples = sample_ids.len();
        if target.len() != n_samples {
            return Err(ModelError::Shape {
                expected: format!("target length = {}", n_samples),
                actual: format!("target length = {}", target.len()),
            });
        }
        if columns.len() != feature_names.len() {
            return Err(ModelError::Shape {
                expected: format!("{} feature columns", feature_names.len()),
                actual: format!("{} feature columns", columns.len()),
            });
        }
        for (name, column) in feature_names.iter().zip(&columns) {
            if column.len() != n_samples {
                return Err(ModelError::Shape {
                    expected: format!("column '{}' length = {}", name, n_samples),
                    actual: format!("column '{}' length = {}", name, column.len()),
                });
            }
        }
        Ok(Self {
            sample_ids,
            feature_names,
            columns,
            target,
            metadata: HashMap::new(),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn log_summary(&self) {
        log::debug!(
            "Featureset: {} samples, {} features, {} metadata columns",
            self.n_samples(),
            self.n_features(),
            self.metadata.len()
        );
    }
}

/// Convert a featureset into a flat sample-by-feature matrix plus a target
/// vector.
///
/// Row order matches the featureset's sample order, so `table` row `i` pairs
/// with `target[i]`. Metadata columns are excluded. A featureset with zero
/// samples yields an empty matrix/vector pair.
pub fn rectangularize(featureset: &Featureset) -> Result<(Array2<f64>, Array1<f64>), ModelError> {
    let n_samples = featureset.n_samples();
    let n_features = featureset.n_features();

    let mut data = Vec::with_capacity(n_samples * n_features);
    for row in 0..n_samples {
        for column in &featureset.columns {
            data.push(column[row]);
        }
    }

    let table = Array2::from_shape_vec((n_samples, n_features), data).map_err(|_| {
        ModelError::Shape {
            expected: format!("({}, {})", n_samples, n_features),
            actual: "ragged featureset columns".to_string(),
        }
    })?;
    let target = Array1::from_vec(featureset.target.clone());

    Ok((table, target))
}
