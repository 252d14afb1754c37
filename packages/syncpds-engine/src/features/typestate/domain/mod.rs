/*
 * Typestate Domain Models
 */

mod protocol;
mod transition_function;
mod violations;

pub use protocol::{Action, Protocol, State};
pub use transition_function::TransitionFunction;
pub use violations::{ProtocolViolation, ViolationKind};
