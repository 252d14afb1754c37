//! # Weighted Pushdown Systems
//!
//! Rule store, weighted automaton and the worklist saturation that
//! connects them.
//!
//! - [`PushdownSystem`]: normal / push / pop rules, duplicates combined with ⊕
//! - [`WeightedAutomaton`]: interned states + weighted transitions
//! - [`Saturation`]: post* (forward) or pre* (backward) fixpoint, one
//!   worklist step at a time

pub mod domain;
pub mod infrastructure;

pub use domain::{INode, Rule, RuleInsert, RuleKey, RuleKind, StackSymbol, StateId, Transition, TransitionUpdate};
pub use infrastructure::{
    Polarity, PushdownSystem, RuleListener, Saturation, SaturationStep, StateArena,
    TransitionListener, WeightedAutomaton,
};
