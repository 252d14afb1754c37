use crate::shared::models::{Node, Statement, Val};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Propagation direction of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Along control flow, from an allocation site
    Forward,
    /// Against control flow, toward allocation sites
    Backward,
}

/// Where does the object held by `node.fact` right after `node.stmt` flow?
///
/// `node.stmt` must allocate `node.fact`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForwardQuery {
    pub node: Node,
}

impl ForwardQuery {
    pub fn new(stmt: Statement, fact: Val) -> Self {
        Self {
            node: Node::new(stmt, fact),
        }
    }
}

/// Which allocation sites may `node.fact` point to right after `node.stmt`?
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BackwardQuery {
    pub node: Node,
}

impl BackwardQuery {
    pub fn new(stmt: Statement, fact: Val) -> Self {
        Self {
            node: Node::new(stmt, fact),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Query {
    Forward(ForwardQuery),
    Backward(BackwardQuery),
}

impl Query {
    pub fn node(&self) -> &Node {
        match self {
            Query::Forward(q) => &q.node,
            Query::Backward(q) => &q.node,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Query::Forward(_) => Direction::Forward,
            Query::Backward(_) => Direction::Backward,
        }
    }
}

impl From<ForwardQuery> for Query {
    fn from(q: ForwardQuery) -> Self {
        Query::Forward(q)
    }
}

impl From<BackwardQuery> for Query {
    fn from(q: BackwardQuery) -> Self {
        Query::Backward(q)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Forward(q) => write!(f, "forward {}", q.node),
            Query::Backward(q) => write!(f, "backward {}", q.node),
        }
    }
}

/// Identifies a root solver owned by a `QueryEngine`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SolverHandle(pub(crate) u32);

impl SolverHandle {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SolverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "solver#{}", self.0)
    }
}
