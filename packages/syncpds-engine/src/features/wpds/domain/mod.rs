mod rule;
mod state;
mod symbol;
mod transition;

pub use rule::{Rule, RuleInsert, RuleKey, RuleKind};
pub use state::{INode, StateId};
pub use symbol::StackSymbol;
pub use transition::{Transition, TransitionUpdate};
