mod solver;

pub use solver::{CallState, FieldState, SolverOptions, SyncPdsSolver};
