//! Trained model persistence.
//!
//! Artifacts are JSON documents written in one shot: the value is serialized
//! fully in memory first, so a serialization failure leaves no partial file
//! behind.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let payload =
        serde_json::to_vec(value).context("Failed to serialize model artifact to JSON")?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, payload)
        .with_context(|| format!("Failed to write model artifact to {}", path.display()))?;
    log::info!("Saved model artifact to {}", path.display());
    Ok(())
}

pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let payload = fs::read(path)
        .with_context(|| format!("Failed to read model artifact from {}", path.display()))?;
    serde_json::from_slice(&payload)
        .with_context(|| format!("Failed to parse model artifact {}", path.display()))
}
