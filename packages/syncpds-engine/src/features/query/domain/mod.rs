//! Query layer domain: what callers ask and what they get back

mod query;
mod results;

pub use query::{BackwardQuery, Direction, ForwardQuery, Query, SolverHandle};
pub use results::{AccessPath, BackwardResults, ForwardResults};
