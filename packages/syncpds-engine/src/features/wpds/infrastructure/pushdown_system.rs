/*
 * Pushdown Rule Store
 *
 * Rules are keyed by shape (from, label, to, kind). Inserting a duplicate
 * combines its weight into the stored one with ⊕; rules are never removed.
 */

use crate::features::weights::Weight;
use crate::features::wpds::domain::{Rule, RuleInsert, RuleKey, StackSymbol, StateId};
use rustc_hash::FxHashMap;

/// Weighted rule set with lookup by left- and right-hand state
#[derive(Debug, Clone)]
pub struct PushdownSystem<L, W> {
    weights: FxHashMap<RuleKey<L>, W>,
    order: Vec<RuleKey<L>>,
    by_from: FxHashMap<StateId, Vec<RuleKey<L>>>,
    by_to: FxHashMap<StateId, Vec<RuleKey<L>>>,
}

impl<L, W> Default for PushdownSystem<L, W> {
    fn default() -> Self {
        Self {
            weights: FxHashMap::default(),
            order: Vec::new(),
            by_from: FxHashMap::default(),
            by_to: FxHashMap::default(),
        }
    }
}

impl<L: StackSymbol, W: Weight> PushdownSystem<L, W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `rule`, combining with an existing rule of the same shape
    pub fn add_rule(&mut self, rule: Rule<L, W>) -> RuleInsert {
        rule.key.assert_well_formed();
        let Rule { key, weight } = rule;

        if let Some(stored) = self.weights.get_mut(&key) {
            let combined = stored.combine(&weight);
            if combined == *stored {
                return RuleInsert::Unchanged;
            }
            *stored = combined;
            return RuleInsert::WeightCombined;
        }

        self.by_from.entry(key.from).or_default().push(key.clone());
        self.by_to.entry(key.to).or_default().push(key.clone());
        self.order.push(key.clone());
        self.weights.insert(key, weight);
        RuleInsert::Added
    }

    /// Stored rule with its current weight
    pub fn rule(&self, key: &RuleKey<L>) -> Option<Rule<L, W>> {
        self.weights.get(key).map(|w| Rule {
            key: key.clone(),
            weight: w.clone(),
        })
    }

    /// Rules whose left-hand state is `state`
    pub fn rules_from(&self, state: StateId) -> impl Iterator<Item = Rule<L, W>> + '_ {
        self.by_from
            .get(&state)
            .into_iter()
            .flatten()
            .filter_map(move |key| self.rule(key))
    }

    /// Rules whose right-hand state is `state`
    pub fn rules_into(&self, state: StateId) -> impl Iterator<Item = Rule<L, W>> + '_ {
        self.by_to
            .get(&state)
            .into_iter()
            .flatten()
            .filter_map(move |key| self.rule(key))
    }

    /// All rules in insertion order
    pub fn rules(&self) -> impl Iterator<Item = Rule<L, W>> + '_ {
        self.order.iter().filter_map(move |key| self.rule(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
