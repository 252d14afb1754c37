/*
 * Pushdown Rules
 *
 * normal: <p, γ>  →  <p', γ'>
 * push:   <p, γ>  →  <p', γ' γ''>
 * pop:    <p, γ>  →  <p', ε>
 *
 * A wildcard `from_label` matches any top symbol; a wildcard `to_label`
 * (normal) or `below` (push) re-emits the matched symbol.
 *
 * Constructors panic on shapes that have no meaning: epsilon on the
 * left-hand side, epsilon or wildcard pushed on top.
 */

use super::state::StateId;
use super::symbol::StackSymbol;

/// Right-hand side shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind<L> {
    Normal { to_label: L },
    Push { to_label: L, below: L },
    Pop,
}

/// Rule identity, weight excluded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleKey<L> {
    pub from: StateId,
    pub from_label: L,
    pub to: StateId,
    pub kind: RuleKind<L>,
}

/// Weighted rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<L, W> {
    pub key: RuleKey<L>,
    pub weight: W,
}

impl<L: StackSymbol, W> Rule<L, W> {
    pub fn normal(from: StateId, from_label: L, to: StateId, to_label: L, weight: W) -> Self {
        Self::checked(from, from_label, to, RuleKind::Normal { to_label }, weight)
    }

    pub fn push(
        from: StateId,
        from_label: L,
        to: StateId,
        to_label: L,
        below: L,
        weight: W,
    ) -> Self {
        Self::checked(from, from_label, to, RuleKind::Push { to_label, below }, weight)
    }

    pub fn pop(from: StateId, from_label: L, to: StateId, weight: W) -> Self {
        Self::checked(from, from_label, to, RuleKind::Pop, weight)
    }

    fn checked(from: StateId, from_label: L, to: StateId, kind: RuleKind<L>, weight: W) -> Self {
        let key = RuleKey {
            from,
            from_label,
            to,
            kind,
        };
        key.assert_well_formed();
        Self { key, weight }
    }

    pub fn from(&self) -> StateId {
        self.key.from
    }

    pub fn to(&self) -> StateId {
        self.key.to
    }
}

impl<L: StackSymbol> RuleKey<L> {
    pub(crate) fn assert_well_formed(&self) {
        if self.from_label.is_epsilon() {
            panic!("malformed rule {:?}: epsilon on the left-hand side", self);
        }
        match &self.kind {
            RuleKind::Normal { to_label } => {
                if to_label.is_epsilon() {
                    panic!("malformed normal rule {:?}: use a pop rule to consume", self);
                }
            }
            RuleKind::Push { to_label, below } => {
                if to_label.is_epsilon() || to_label.is_wildcard() {
                    panic!("malformed push rule {:?}: pushed label must be concrete", self);
                }
                if below.is_epsilon() {
                    panic!("malformed push rule {:?}: epsilon below the pushed label", self);
                }
            }
            RuleKind::Pop => {}
        }
    }

    /// Some label of the rule is a wildcard
    pub fn has_wildcard(&self) -> bool {
        self.labels().any(|label| label.is_wildcard())
    }

    /// Labels named by the rule, wildcards included
    pub fn labels(&self) -> impl Iterator<Item = &L> {
        let (to_label, below) = match &self.kind {
            RuleKind::Normal { to_label } => (Some(to_label), None),
            RuleKind::Push { to_label, below } => (Some(to_label), Some(below)),
            RuleKind::Pop => (None, None),
        };
        std::iter::once(&self.from_label).chain(to_label).chain(below)
    }

    /// Concrete rule for top symbol `symbol`, `None` when the rule does
    /// not apply to it. Wildcards on the right re-emit `symbol`.
    pub fn instantiate(&self, symbol: &L) -> Option<Self> {
        if symbol.is_wildcard() || !self.from_label.matches(symbol) {
            return None;
        }
        let emit = |label: &L| {
            if label.is_wildcard() {
                symbol.clone()
            } else {
                label.clone()
            }
        };
        let kind = match &self.kind {
            RuleKind::Normal { to_label } => RuleKind::Normal {
                to_label: emit(to_label),
            },
            RuleKind::Push { to_label, below } => RuleKind::Push {
                to_label: to_label.clone(),
                below: emit(below),
            },
            RuleKind::Pop => RuleKind::Pop,
        };
        Some(Self {
            from: self.from,
            from_label: symbol.clone(),
            to: self.to,
            kind,
        })
    }
}

/// Outcome of [`crate::features::wpds::PushdownSystem::add_rule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleInsert {
    Added,
    /// Duplicate rule, weight combined with ⊕ and changed
    WeightCombined,
    /// Duplicate rule, weight absorbed
    Unchanged,
}

impl RuleInsert {
    pub fn changed(self) -> bool {
        !matches!(self, RuleInsert::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::Field;

    #[test]
    fn test_wildcard_normal_is_well_formed() {
        let rule = Rule::normal(StateId(0), Field::wildcard(), StateId(1), Field::wildcard(), ());
        assert_eq!(rule.from(), StateId(0));
        assert_eq!(rule.to(), StateId(1));
    }

    #[test]
    fn test_instantiate_wildcard_push() {
        let key = Rule::push(
            StateId(0),
            Field::wildcard(),
            StateId(1),
            Field::named("a"),
            Field::wildcard(),
            (),
        )
        .key;
        assert!(key.has_wildcard());

        let concrete = key.instantiate(&Field::named("b")).unwrap();
        assert_eq!(concrete.from_label, Field::named("b"));
        assert_eq!(
            concrete.kind,
            RuleKind::Push {
                to_label: Field::named("a"),
                below: Field::named("b"),
            }
        );
        assert!(!concrete.has_wildcard());
    }

    #[test]
    fn test_instantiate_concrete_from_label() {
        let key = Rule::normal(StateId(0), Field::named("a"), StateId(1), Field::wildcard(), ()).key;

        assert!(key.instantiate(&Field::named("b")).is_none());
        let concrete = key.instantiate(&Field::named("a")).unwrap();
        assert_eq!(concrete.kind, RuleKind::Normal { to_label: Field::named("a") });
        assert!(key.instantiate(&Field::epsilon()).is_none());
    }

    #[test]
    #[should_panic(expected = "pushed label must be concrete")]
    fn test_push_epsilon_panics() {
        let _ = Rule::push(
            StateId(0),
            Field::named("f"),
            StateId(1),
            Field::epsilon(),
            Field::named("g"),
            (),
        );
    }

    #[test]
    #[should_panic(expected = "epsilon on the left-hand side")]
    fn test_epsilon_from_label_panics() {
        let _ = Rule::pop(StateId(0), Field::epsilon(), StateId(1), ());
    }
}
