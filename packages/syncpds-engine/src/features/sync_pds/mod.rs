//! # Synchronized Pushdown Systems
//!
//! Two coupled single-stack systems solved together:
//! - call automaton: stack of call sites, states are data facts
//! - field automaton: stack of field labels, states are nodes
//!
//! A node is expanded only once both automata reach it, and field rules
//! toward a node wait until the call automaton reaches that node. Points
//! of indirection defer field and call-site effects until the query layer
//! resolves them.

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{
    Expansion, PendingIndirection, PoiKey, PoiKind, PointOfIndirection, Resolution, SolverPhase,
    SolverStats, SolverStatus, Successor,
};
pub use infrastructure::{CallState, FieldState, SolverOptions, SyncPdsSolver};
pub use ports::{NodeExpander, ReachableNodeListener};
