pub mod artifact;
pub mod featureset;
