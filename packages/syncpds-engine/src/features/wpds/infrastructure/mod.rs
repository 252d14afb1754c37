mod arena;
mod listener;
mod pushdown_system;
mod saturation;
mod weighted_automaton;

pub use arena::StateArena;
pub use listener::{RuleListener, TransitionListener};
pub use pushdown_system::PushdownSystem;
pub use saturation::{Polarity, Saturation, SaturationStep};
pub use weighted_automaton::WeightedAutomaton;
