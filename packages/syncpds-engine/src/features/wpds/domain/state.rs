use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an interned automaton state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub(crate) u32);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Labeled automaton state
///
/// `Generated { fact, label }` stands for "`fact` entered with `label` on
/// top". One generated state exists per pair, which is what folds
/// recursive calls and self-referential fields into finite cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum INode<T, L> {
    Single(T),
    Generated { fact: T, label: L },
}

impl<T, L> INode<T, L> {
    pub fn fact(&self) -> &T {
        match self {
            INode::Single(fact) => fact,
            INode::Generated { fact, .. } => fact,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, INode::Generated { .. })
    }

    pub fn as_single(&self) -> Option<&T> {
        match self {
            INode::Single(fact) => Some(fact),
            INode::Generated { .. } => None,
        }
    }
}

impl<T: fmt::Display, L: fmt::Display> fmt::Display for INode<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            INode::Single(fact) => write!(f, "{}", fact),
            INode::Generated { fact, label } => write!(f, "<{}.{}>", fact, label),
        }
    }
}
