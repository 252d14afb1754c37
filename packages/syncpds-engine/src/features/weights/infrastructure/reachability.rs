use crate::features::weights::domain::Weight;
use serde::{Deserialize, Serialize};

/// Boolean semiring: plain reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reachability {
    Unreachable,
    Reachable,
}

impl Weight for Reachability {
    fn one() -> Self {
        Reachability::Reachable
    }

    fn zero() -> Self {
        Reachability::Unreachable
    }

    fn extend(&self, other: &Self) -> Self {
        match (self, other) {
            (Reachability::Reachable, Reachability::Reachable) => Reachability::Reachable,
            _ => Reachability::Unreachable,
        }
    }

    fn combine(&self, other: &Self) -> Self {
        match (self, other) {
            (Reachability::Unreachable, Reachability::Unreachable) => Reachability::Unreachable,
            _ => Reachability::Reachable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_reachability() -> impl Strategy<Value = Reachability> {
        prop_oneof![Just(Reachability::Unreachable), Just(Reachability::Reachable)]
    }

    #[test]
    fn test_one_and_zero() {
        assert!(Reachability::one().is_one());
        assert!(Reachability::zero().is_zero());
        assert_eq!(
            Reachability::one().extend(&Reachability::zero()),
            Reachability::Unreachable
        );
    }

    proptest! {
        #[test]
        fn test_semiring_laws(a in arb_reachability(), b in arb_reachability(), c in arb_reachability()) {
            prop_assert_eq!(a.combine(&b), b.combine(&a));
            prop_assert_eq!(a.combine(&b).combine(&c), a.combine(&b.combine(&c)));
            prop_assert_eq!(a.extend(&b).extend(&c), a.extend(&b.extend(&c)));
            prop_assert_eq!(a.extend(&b.combine(&c)), a.extend(&b).combine(&a.extend(&c)));
            prop_assert_eq!(a.extend(&Reachability::one()), a);
            prop_assert_eq!(a.combine(&Reachability::zero()), a);
            prop_assert!(a.extend(&Reachability::zero()).is_zero());
        }
    }
}
