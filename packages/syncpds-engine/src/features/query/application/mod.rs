//! Query layer application: engines, POI agenda, batch runs

mod agenda;
mod analysis_scope;
mod context;
mod engine;
mod expander;
mod sub_queries;
mod whole_program;

pub use analysis_scope::{AnalysisScope, SeedGenerator};
pub use context::AnalysisContext;
pub use engine::QueryEngine;
pub use whole_program::WholeProgramAnalysis;
