/*
 * Weight Semiring
 *
 * combine (⊕): commutative, associative, `zero` is neutral and absorbing
 *              for extend
 * extend  (⊗): associative, distributes over ⊕, `one` is neutral
 *
 * `a.extend(b)` reads "a, then b".
 *
 * The laws are a precondition on implementors. The solver never checks
 * them; a type that breaks them yields unsound weights or a saturation
 * that does not terminate.
 */

use std::fmt::Debug;
use std::hash::Hash;

/// Semiring weight attached to rules and transitions
pub trait Weight: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Neutral element of extend
    fn one() -> Self;

    /// Neutral element of combine, absorbing for extend
    fn zero() -> Self;

    /// Sequential composition: `self` then `other`
    fn extend(&self, other: &Self) -> Self;

    /// Join of alternative derivations
    fn combine(&self, other: &Self) -> Self;

    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    fn is_one(&self) -> bool {
        *self == Self::one()
    }
}
