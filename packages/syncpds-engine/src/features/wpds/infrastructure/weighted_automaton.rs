/*
 * Weighted Automaton
 *
 * P-automaton over interned states. Transitions are only ever added; a
 * re-derived transition combines its weight with ⊕ into the stored one.
 * Listeners see every new or grown transition synchronously, and on
 * registration they first receive everything already present.
 *
 * Zero-weight transitions are never stored.
 */

use super::arena::StateArena;
use super::listener::TransitionListener;
use crate::features::weights::Weight;
use crate::features::wpds::domain::{INode, StackSymbol, StateId, Transition, TransitionUpdate};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

pub struct WeightedAutomaton<T, L, W> {
    states: StateArena<T, L>,
    initial: BTreeSet<StateId>,
    accepting: BTreeSet<StateId>,
    weights: FxHashMap<Transition<L>, W>,
    order: Vec<Transition<L>>,
    outgoing: FxHashMap<StateId, Vec<Transition<L>>>,
    epsilon_into: FxHashMap<StateId, Vec<Transition<L>>>,
    listeners: Vec<Box<dyn TransitionListener<T, L, W>>>,
}

impl<T, L, W> Default for WeightedAutomaton<T, L, W> {
    fn default() -> Self {
        Self {
            states: StateArena::default(),
            initial: BTreeSet::new(),
            accepting: BTreeSet::new(),
            weights: FxHashMap::default(),
            order: Vec::new(),
            outgoing: FxHashMap::default(),
            epsilon_into: FxHashMap::default(),
            listeners: Vec::new(),
        }
    }
}

impl<T, L, W> WeightedAutomaton<T, L, W>
where
    T: Clone + Eq + Hash + Debug,
    L: StackSymbol,
    W: Weight,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> &StateArena<T, L> {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut StateArena<T, L> {
        &mut self.states
    }

    pub fn add_initial_state(&mut self, state: StateId) {
        self.initial.insert(state);
    }

    pub fn add_accepting_state(&mut self, state: StateId) {
        self.accepting.insert(state);
    }

    pub fn initial_states(&self) -> &BTreeSet<StateId> {
        &self.initial
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting.contains(&state)
    }

    /// Insert or strengthen a transition
    pub fn add_transition(&mut self, transition: Transition<L>, weight: W) -> TransitionUpdate {
        if weight.is_zero() {
            return TransitionUpdate::Unchanged;
        }

        let update = match self.weights.get_mut(&transition) {
            Some(stored) => {
                let combined = stored.combine(&weight);
                if combined == *stored {
                    return TransitionUpdate::Unchanged;
                }
                *stored = combined;
                TransitionUpdate::Grown
            }
            None => {
                self.outgoing
                    .entry(transition.source)
                    .or_default()
                    .push(transition.clone());
                if transition.label.is_epsilon() {
                    self.epsilon_into
                        .entry(transition.target)
                        .or_default()
                        .push(transition.clone());
                }
                self.order.push(transition.clone());
                self.weights.insert(transition.clone(), weight);
                TransitionUpdate::New
            }
        };

        self.notify(&transition);
        update
    }

    fn notify(&mut self, transition: &Transition<L>) {
        let Some(weight) = self.weights.get(transition) else {
            return;
        };
        let source = self.states.get(transition.source);
        let target = self.states.get(transition.target);
        for listener in &mut self.listeners {
            listener.on_transition_added(source, &transition.label, target, weight);
        }
    }

    /// Replay existing transitions into `listener`, then keep it
    pub fn register_listener(&mut self, mut listener: Box<dyn TransitionListener<T, L, W>>) {
        for transition in &self.order {
            if let Some(weight) = self.weights.get(transition) {
                listener.on_transition_added(
                    self.states.get(transition.source),
                    &transition.label,
                    self.states.get(transition.target),
                    weight,
                );
            }
        }
        self.listeners.push(listener);
    }

    pub fn unregister_all_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn weight(&self, transition: &Transition<L>) -> Option<&W> {
        self.weights.get(transition)
    }

    pub fn contains(&self, transition: &Transition<L>) -> bool {
        self.weights.contains_key(transition)
    }

    /// Transitions leaving `state`, epsilon included
    pub fn outgoing(&self, state: StateId) -> &[Transition<L>] {
        self.outgoing.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Epsilon transitions entering `state`
    pub fn epsilon_into(&self, state: StateId) -> &[Transition<L>] {
        self.epsilon_into.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All transitions in insertion order with current weights
    pub fn transitions(&self) -> impl Iterator<Item = (&Transition<L>, &W)> {
        self.order
            .iter()
            .filter_map(move |t| self.weights.get(t).map(|w| (t, w)))
    }

    /// Non-epsilon labels on transitions leaving `state`
    pub fn labels_from(&self, state: StateId) -> BTreeSet<L> {
        self.outgoing(state)
            .iter()
            .filter(|t| !t.label.is_epsilon())
            .map(|t| t.label.clone())
            .collect()
    }

    /// Id of `node` if it was ever interned
    pub fn lookup(&self, node: &INode<T, L>) -> Option<StateId> {
        self.states.lookup(node)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Combined weight of all accepting paths that start at `state` with
    /// `label`
    ///
    /// Path weights are read bottom-to-top: the transition nearest the
    /// accepting state comes first. Evaluated as a bounded fixpoint over
    /// per-state suffix weights.
    ///
    /// ε-transitions are not followed. The automaton must be ε-closed: for
    /// every (p, ε, q) and (q, γ, r) the direct (p, γ, r) is present, as
    /// post* guarantees. Following ε as well would count those paths twice.
    pub fn config_weight(&self, state: StateId, label: &L) -> W {
        let suffix = self.suffix_weights();
        self.outgoing(state)
            .iter()
            .filter(|t| &t.label == label)
            .filter_map(|t| {
                let below = suffix.get(&t.target)?;
                let weight = self.weights.get(t)?;
                Some(below.extend(weight))
            })
            .fold(W::zero(), |acc, w| acc.combine(&w))
    }

    fn suffix_weights(&self) -> FxHashMap<StateId, W> {
        let mut suffix: FxHashMap<StateId, W> = self
            .accepting
            .iter()
            .map(|&s| (s, W::one()))
            .collect();

        let rounds = self.states.len() + 1;
        for _ in 0..rounds {
            let mut changed = false;
            for (transition, weight) in self.transitions() {
                if transition.label.is_epsilon() {
                    continue;
                }
                let Some(below) = suffix.get(&transition.target) else {
                    continue;
                };
                let candidate = below.extend(weight);
                match suffix.get(&transition.source) {
                    Some(current) => {
                        let combined = current.combine(&candidate);
                        if combined != *current {
                            suffix.insert(transition.source, combined);
                            changed = true;
                        }
                    }
                    None => {
                        suffix.insert(transition.source, candidate);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        suffix
    }
}
