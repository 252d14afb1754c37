//! # Query Layer
//!
//! Forward and backward queries on top of the synchronized solver:
//! - flow functions turn statements into solver successors
//! - alias sub-queries resolve field and call-site points of indirection
//! - the on-the-fly call graph grows as receivers get resolved
//!
//! ```text
//! BackwardQuery ─► QueryEngine ─► root SyncPdsSolver
//!                       │              │ POIs
//!                       └─► sub-queries (backward, Reachability)
//!                                      │ allocation sites
//!                       OnTheFlyCallGraph ◄┘
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    AnalysisContext, AnalysisScope, QueryEngine, SeedGenerator, WholeProgramAnalysis,
};
pub use domain::{
    AccessPath, BackwardQuery, BackwardResults, Direction, ForwardQuery, ForwardResults, Query,
    SolverHandle,
};
pub use infrastructure::{
    DefaultBackwardFlowFunctions, DefaultForwardFlowFunctions, FactFlow, FlowFunctions,
    InMemoryProgram, MethodBuilder, OnTheFlyCallGraph,
};
