//! Update listeners
//!
//! Closures implement both traits through blanket impls.

use super::arena::StateArena;
use crate::features::wpds::domain::{INode, Rule};

/// Notified for every new or grown transition
pub trait TransitionListener<T, L, W> {
    fn on_transition_added(
        &mut self,
        source: &INode<T, L>,
        label: &L,
        target: &INode<T, L>,
        weight: &W,
    );
}

impl<T, L, W, F> TransitionListener<T, L, W> for F
where
    F: FnMut(&INode<T, L>, &L, &INode<T, L>, &W),
{
    fn on_transition_added(
        &mut self,
        source: &INode<T, L>,
        label: &L,
        target: &INode<T, L>,
        weight: &W,
    ) {
        self(source, label, target, weight)
    }
}

/// Notified for every new rule and every rule whose weight changed
pub trait RuleListener<T, L, W> {
    fn on_rule_added(&mut self, rule: &Rule<L, W>, states: &StateArena<T, L>);
}

impl<T, L, W, F> RuleListener<T, L, W> for F
where
    F: FnMut(&Rule<L, W>, &StateArena<T, L>),
{
    fn on_rule_added(&mut self, rule: &Rule<L, W>, states: &StateArena<T, L>) {
        self(rule, states)
    }
}
