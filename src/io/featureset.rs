//! Featureset CSV reader.
//!
//! One file per featureset id: a header row with a `name` column (sample
//! ids), a `target` column, and any number of additional columns. Columns
//! whose values all parse as numbers become features; the rest are kept as
//! metadata and excluded from model input. Empty cells in feature columns
//! become NaN (the explicit missing marker).
use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;

use crate::data_handling::Featureset;
use crate::error::ModelError;

const NAME_COLUMN: &str = "name";
const TARGET_COLUMN: &str = "target";

/// Read a featureset CSV file.
///
/// A missing or unreadable file surfaces as [`ModelError::MissingFeaturesetFile`].
pub fn read_featureset_csv<P: AsRef<Path>>(path: P) -> Result<Featureset> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| match err.into_kind() {
            csv::ErrorKind::Io(source) => anyhow::Error::new(ModelError::MissingFeaturesetFile {
                path: path.to_path_buf(),
                source,
            }),
            other => anyhow!("Failed to open featureset file {}: {:?}", path.display(), other),
        })?;

    let headers = reader
        .headers()
        .context("Failed to read featureset header row")?
        .clone();

    let target_idx = find_column(&headers, TARGET_COLUMN).ok_or_else(|| {
        anyhow!(
            "Featureset file {} has no '{}' column",
            path.display(),
            TARGET_COLUMN
        )
    })?;
    let name_idx = find_column(&headers, NAME_COLUMN);

    let mut records: Vec<StringRecord> = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        records.push(record);
    }

    let mut sample_ids = Vec::with_capacity(records.len());
    let mut target = Vec::with_capacity(records.len());
    for (row_idx, record) in records.iter().enumerate() {
        let id = match name_idx {
            Some(idx) => record.get(idx).unwrap_or_default().trim().to_string(),
            None => format!("row_{}", row_idx + 1),
        };
        sample_ids.push(id);

        let raw = record
            .get(target_idx)
            .ok_or_else(|| anyhow!("Missing target value at row {}", row_idx + 1))?;
        let value = raw
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Invalid target '{}' at row {}", raw, row_idx + 1))?;
        target.push(value);
    }

    // Classify the remaining columns: numeric throughout -> feature,
    // anything else -> metadata.
    let mut feature_names = Vec::new();
    let mut columns = Vec::new();
    let mut metadata: HashMap<String, Vec<String>> = HashMap::new();

    for (idx, header) in headers.iter().enumerate() {
        if idx == target_idx || Some(idx) == name_idx {
            continue;
        }
        let raw_values: Vec<&str> = records
            .iter()
            .map(|record| record.get(idx).unwrap_or_default().trim())
            .collect();

        match parse_numeric_column(&raw_values) {
            Some(values) => {
                feature_names.push(header.to_string());
                columns.push(values);
            }
            None => {
                metadata.insert(
                    header.to_string(),
                    raw_values.iter().map(|v| v.to_string()).collect(),
                );
            }
        }
    }

    let mut featureset = Featureset::new(sample_ids, feature_names, columns, target)
        .map_err(anyhow::Error::new)?;
    featureset.metadata = metadata;
    featureset.log_summary();
    Ok(featureset)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
}

fn parse_numeric_column(raw_values: &[&str]) -> Option<Vec<f64>> {
    let mut values = Vec::with_capacity(raw_values.len());
    for raw in raw_values {
        if raw.is_empty() {
            values.push(f64::NAN);
        } else {
            values.push(raw.parse::<f64>().ok()?);
        }
    }
    Some(values)
}
