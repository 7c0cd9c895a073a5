pub mod bayesian;
pub mod decision_tree;
pub mod estimator;
pub mod factory;
mod linalg;
pub mod linear;
pub mod random_forest;
pub mod sgd;

pub use estimator::Model;
pub use factory::build_model;
