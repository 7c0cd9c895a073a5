use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Custom error type for model building failures.
#[derive(Debug)]
pub enum ModelError {
    /// Model-type name not present in the registry.
    UnknownModelType(String),
    /// Featureset input file could not be read.
    MissingFeaturesetFile { path: PathBuf, source: io::Error },
    /// Hyperparameter search configuration is inconsistent.
    InvalidSearchSpec(String),
    /// Mismatched array dimensions.
    Shape { expected: String, actual: String },
    /// Prediction requested before the model was fit.
    NotFitted,
    /// Failure inside a fitting procedure (singular system, empty data, ...).
    Training(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::UnknownModelType(name) => {
                write!(f, "Unknown model type: '{}'", name)
            }
            ModelError::MissingFeaturesetFile { path, source } => {
                write!(f, "Missing featureset file {}: {}", path.display(), source)
            }
            ModelError::InvalidSearchSpec(msg) => {
                write!(f, "Invalid hyperparameter search spec: {}", msg)
            }
            ModelError::Shape { expected, actual } => {
                write!(f, "Invalid shape: expected {}, got {}", expected, actual)
            }
            ModelError::NotFitted => write!(f, "Model has not been fitted"),
            ModelError::Training(msg) => write!(f, "Training error: {}", msg),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelError::MissingFeaturesetFile { source, .. } => Some(source),
            _ => None,
        }
    }
}
