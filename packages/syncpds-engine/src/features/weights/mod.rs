//! Weight Algebra
//!
//! Semiring weights threaded through every rule and transition, plus the
//! per-edge weight functions the query layer consults while expanding nodes.

pub mod domain;
pub mod infrastructure;

pub use domain::Weight;
pub use infrastructure::{OneWeightFunctions, Reachability, WeightFunctions};
