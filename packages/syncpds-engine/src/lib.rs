/*
 * SyncPDS Engine - Demand-Driven Alias & Typestate Analysis
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Program model (Method, Statement, Val, Field, Node) + ProgramModel port
 * - features/    : Vertical slices (weights → wpds → sync_pds → query → typestate)
 * - config/      : Analysis configuration (presets, validation, YAML)
 *
 * Core:
 * - Weighted pushdown systems saturated with an explicit worklist
 * - Call-stack and field-stack automata kept synchronized
 * - Points-of-indirection resolved by alias sub-queries
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Flow functions need program + node + call site
#![allow(clippy::type_complexity)] // Nested maps for return coupling
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::collapsible_if)] // Readability over brevity
#![allow(clippy::collapsible_else_if)] // else if clarity
#![allow(clippy::match_like_matches_macro)] // Match for readability
#![allow(clippy::single_match)] // Single match for readability

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use errors::{Result, SyncPdsError};

// Re-export the query surface
pub use features::query::{
    AnalysisContext, AnalysisScope, BackwardQuery, BackwardResults, ForwardQuery, ForwardResults,
    InMemoryProgram, Query, QueryEngine, SolverHandle, WholeProgramAnalysis,
};
pub use features::sync_pds::{SolverStatus, SyncPdsSolver};
pub use features::weights::{OneWeightFunctions, Reachability, Weight, WeightFunctions};
pub use shared::models::{Field, Method, Node, Statement, StatementKind, Val};
pub use shared::ports::ProgramModel;
