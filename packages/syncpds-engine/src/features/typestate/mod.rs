//! # Typestate
//!
//! Finite-state protocols consumed as a weight domain:
//! - `TransitionFunction`: relational weight (state → states)
//! - `TypestateWeightFunctions`: protocol actions on call-to-return edges
//! - `TypestateAnalysis`: forward queries per allocation, violations at
//!   method end points

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{AllocationReport, TypestateAnalysis, TypestateReport, WitnessListener};
pub use domain::{Action, Protocol, ProtocolViolation, State, TransitionFunction, ViolationKind};
pub use infrastructure::{
    ConnectionProtocol, FileProtocol, LockProtocol, ParseError, ProtocolBuilder, ProtocolParser,
    TypestateWeightFunctions,
};
