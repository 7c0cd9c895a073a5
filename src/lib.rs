//! Model building over precomputed featuresets.
//!
//! This crate turns a stored featureset into a trained, persisted model: it
//! reads the featureset CSV, rectangularizes it into a numeric table, fits
//! one of the registered estimator types (optionally selecting
//! hyperparameters by cross-validated grid search), and writes the trained
//! model as a JSON artifact keyed by model id.
//!
//! The typical entry point is [`build_model::create_and_pickle_model`]; the
//! intermediate pieces (featureset loading, rectangularization, the estimator
//! registry, and the search machinery) are public for callers that need finer
//! control.

pub mod build_model;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod models;
pub mod search;

pub use build_model::{build_model_from_featureset, create_and_pickle_model, ModelArtifact};
pub use config::{BuildConfig, ModelType};
pub use error::ModelError;
pub use models::Model;
