use crate::shared::models::{Field, Statement};
use std::fmt::Debug;
use std::hash::Hash;

/// Stack alphabet of a pushdown system
pub trait StackSymbol: Clone + Eq + Hash + Ord + Debug + 'static {
    /// Empty word, used by pop transitions
    fn epsilon() -> Self;

    fn is_epsilon(&self) -> bool;

    /// Rule label standing for "whatever is on top"
    fn is_wildcard(&self) -> bool {
        false
    }

    /// Does rule label `self` apply to transition label `label`
    fn matches(&self, label: &Self) -> bool {
        if label.is_epsilon() {
            return false;
        }
        self.is_wildcard() || self == label
    }
}

impl StackSymbol for Statement {
    fn epsilon() -> Self {
        Statement::epsilon()
    }

    fn is_epsilon(&self) -> bool {
        Statement::is_epsilon(self)
    }
}

impl StackSymbol for Field {
    fn epsilon() -> Self {
        Field::epsilon()
    }

    fn is_epsilon(&self) -> bool {
        Field::is_epsilon(self)
    }

    fn is_wildcard(&self) -> bool {
        Field::is_wildcard(self)
    }
}
