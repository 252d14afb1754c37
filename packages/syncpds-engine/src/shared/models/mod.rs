//! Shared models

mod field;
mod method;
mod node;
mod statement;
mod val;

pub use field::Field;
pub use method::Method;
pub use node::{ControlFlowEdge, Node};
pub use statement::{InvokeExpr, Rvalue, Statement, StatementKind};
pub use val::{Val, ValKind};
