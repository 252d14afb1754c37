use serde::{Deserialize, Serialize};

/// Solver lifecycle
///
/// `Idle → Seeded → Saturating → {Quiescent | TimedOut}`. A timed-out or
/// quiescent solver may be resumed; it re-enters `Saturating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverPhase {
    Idle,
    Seeded,
    Saturating,
    Quiescent,
    TimedOut,
}

/// Terminal status of one `solve` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverStatus {
    /// Fixpoint: nothing left to derive
    Quiescent,
    /// Budget exhausted; results are partial
    TimedOut,
}

impl SolverStatus {
    pub fn is_complete(self) -> bool {
        self == SolverStatus::Quiescent
    }
}

/// Solver counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    /// Worklist iterations across both automata
    pub iterations: usize,
    pub nodes_processed: usize,
    pub call_transitions: usize,
    pub field_transitions: usize,
    pub call_rules: usize,
    pub field_rules: usize,
    pub indirections: usize,
    pub indirections_fired: usize,
}
