mod reachability;
mod weight_functions;

pub use reachability::Reachability;
pub use weight_functions::{OneWeightFunctions, WeightFunctions};
