/*
 * Transition Function Weight
 *
 * A relation over protocol states, optionally joined with the identity.
 *
 *   one  = identity
 *   zero = empty relation
 *   a ⊗ b = a ; b            (relational composition, a first)
 *   a ⊕ b = a ∪ b
 *
 * The identity is kept as a flag rather than as explicit (s, s) pairs, so
 * `one` does not need to know the protocol's states. Pairs already implied
 * by the flag are dropped, which keeps equality structural.
 */

use super::protocol::{Action, Protocol, State};
use crate::features::weights::Weight;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionFunction {
    identity: bool,
    pairs: BTreeSet<(State, State)>,
}

impl TransitionFunction {
    fn normalized(identity: bool, pairs: BTreeSet<(State, State)>) -> Self {
        let pairs = if identity {
            pairs.into_iter().filter(|(from, to)| from != to).collect()
        } else {
            pairs
        };
        Self { identity, pairs }
    }

    /// Effect of calling `action` on a resource following `protocol`
    pub fn from_action(protocol: &Protocol, action: &Action) -> Self {
        let pairs = protocol
            .states
            .iter()
            .map(|from| (from.clone(), protocol.step(from, action)))
            .collect();
        Self::normalized(false, pairs)
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (State, State)>) -> Self {
        Self::normalized(false, pairs.into_iter().collect())
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn pairs(&self) -> &BTreeSet<(State, State)> {
        &self.pairs
    }

    /// States reachable from `initial`
    pub fn apply(&self, initial: &State) -> BTreeSet<State> {
        let mut out: BTreeSet<State> = self
            .pairs
            .iter()
            .filter(|(from, _)| from == initial)
            .map(|(_, to)| to.clone())
            .collect();
        if self.identity {
            out.insert(initial.clone());
        }
        out
    }

    fn compose(first: &BTreeSet<(State, State)>, then: &BTreeSet<(State, State)>) -> BTreeSet<(State, State)> {
        let mut out = BTreeSet::new();
        for (x, y) in first {
            for (_, z) in then.iter().filter(|(from, _)| from == y) {
                out.insert((x.clone(), z.clone()));
            }
        }
        out
    }
}

impl Weight for TransitionFunction {
    fn one() -> Self {
        Self {
            identity: true,
            pairs: BTreeSet::new(),
        }
    }

    fn zero() -> Self {
        Self {
            identity: false,
            pairs: BTreeSet::new(),
        }
    }

    fn extend(&self, other: &Self) -> Self {
        // (I? ∪ P) ; (I? ∪ Q)
        let mut pairs = Self::compose(&self.pairs, &other.pairs);
        if self.identity {
            pairs.extend(other.pairs.iter().cloned());
        }
        if other.identity {
            pairs.extend(self.pairs.iter().cloned());
        }
        Self::normalized(self.identity && other.identity, pairs)
    }

    fn combine(&self, other: &Self) -> Self {
        let pairs = self.pairs.union(&other.pairs).cloned().collect();
        Self::normalized(self.identity || other.identity, pairs)
    }
}

impl fmt::Display for TransitionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.identity {
            parts.push("id".to_string());
        }
        parts.extend(self.pairs.iter().map(|(from, to)| format!("{from}->{to}")));
        write!(f, "{{{}}}", parts.join(", "))
    }
}
