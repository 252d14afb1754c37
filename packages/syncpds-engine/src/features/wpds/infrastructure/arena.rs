/*
 * State Arena
 *
 * Structural interning of automaton states: equal `INode`s always map to
 * the same `StateId`, so id comparison is value comparison.
 *
 * Generated states additionally record the state they were generated
 * from. The record is provenance only; it never takes part in identity.
 */

use crate::features::wpds::domain::{INode, StackSymbol, StateId};
use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Canonicalizing state store, append-only
#[derive(Debug, Clone)]
pub struct StateArena<T, L> {
    states: Vec<INode<T, L>>,
    index: FxHashMap<INode<T, L>, StateId>,
    provenance: FxHashMap<StateId, StateId>,
}

impl<T, L> Default for StateArena<T, L> {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            index: FxHashMap::default(),
            provenance: FxHashMap::default(),
        }
    }
}

impl<T, L> StateArena<T, L>
where
    T: Clone + Eq + Hash + Debug,
    L: StackSymbol,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical id of `node`, allocating on first sight
    pub fn intern(&mut self, node: INode<T, L>) -> StateId {
        if let Some(&id) = self.index.get(&node) {
            return id;
        }
        let id = StateId(self.states.len() as u32);
        self.states.push(node.clone());
        self.index.insert(node, id);
        id
    }

    pub fn single(&mut self, fact: T) -> StateId {
        self.intern(INode::Single(fact))
    }

    /// Generated state for `origin`'s fact entered with `label`
    pub fn generated(&mut self, origin: StateId, label: L) -> StateId {
        let fact = self.get(origin).fact().clone();
        let id = self.intern(INode::Generated { fact, label });
        self.provenance.entry(id).or_insert(origin);
        id
    }

    pub fn lookup(&self, node: &INode<T, L>) -> Option<StateId> {
        self.index.get(node).copied()
    }

    pub fn lookup_single(&self, fact: &T) -> Option<StateId> {
        self.lookup(&INode::Single(fact.clone()))
    }

    /// State behind `id`; ids are only minted by this arena
    pub fn get(&self, id: StateId) -> &INode<T, L> {
        &self.states[id.index()]
    }

    /// State a generated state was derived from
    pub fn origin(&self, id: StateId) -> Option<StateId> {
        self.provenance.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, &INode<T, L>)> {
        self.states
            .iter()
            .enumerate()
            .map(|(i, node)| (StateId(i as u32), node))
    }
}
