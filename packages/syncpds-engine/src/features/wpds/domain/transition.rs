use super::state::StateId;

/// Automaton edge `source --label--> target`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Transition<L> {
    pub source: StateId,
    pub label: L,
    pub target: StateId,
}

impl<L> Transition<L> {
    pub fn new(source: StateId, label: L, target: StateId) -> Self {
        Self {
            source,
            label,
            target,
        }
    }
}

/// Outcome of inserting a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionUpdate {
    New,
    /// Existing transition, weight grew under ⊕
    Grown,
    /// Existing transition, weight absorbed
    Unchanged,
}

impl TransitionUpdate {
    pub fn changed(self) -> bool {
        !matches!(self, TransitionUpdate::Unchanged)
    }
}
