//! Ports - what the solver needs from the query layer

use super::domain::Expansion;
use crate::features::weights::Weight;
use crate::shared::models::{Field, Method, Node, Statement};

/// Flow knowledge behind the solver
///
/// The solver knows nothing about statements; it asks the expander what a
/// reached node leads to and reports which field labels it carries.
pub trait NodeExpander<W: Weight> {
    /// Successors of a node reached in both automata
    fn expand(&mut self, node: &Node) -> Expansion<W>;

    /// Effects that depend on the field label on top at `node`
    /// (allocation sites, field points of indirection)
    fn observe_field_label(&mut self, node: &Node, label: &Field) -> Expansion<W>;

    /// Call sites that may invoke `method`, for returns past the seed
    fn callers_of(&mut self, method: &Method) -> Vec<Statement>;
}

/// Notified once per node reached in both automata
pub trait ReachableNodeListener {
    fn on_reachable_node(&mut self, node: &Node);
}

impl<F> ReachableNodeListener for F
where
    F: FnMut(&Node),
{
    fn on_reachable_node(&mut self, node: &Node) {
        self(node)
    }
}
