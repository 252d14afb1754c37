use super::statement::Statement;
use super::val::Val;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vertex of the pushdown configuration space
///
/// `(stmt, fact)` reads "the value of `fact` right after `stmt`".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Node {
    pub stmt: Statement,
    pub fact: Val,
}

impl Node {
    pub fn new(stmt: Statement, fact: Val) -> Self {
        Self { stmt, fact }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} @ {})", self.fact, self.stmt)
    }
}

/// Directed intraprocedural control-flow edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlFlowEdge {
    pub from: Statement,
    pub to: Statement,
}

impl ControlFlowEdge {
    pub fn new(from: Statement, to: Statement) -> Self {
        Self { from, to }
    }
}
