use super::query::{BackwardQuery, ForwardQuery};
use crate::features::sync_pds::{SolverStats, SolverStatus};
use crate::shared::models::{Field, Node, Statement, Val};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// `base.f1.f2...`: a local or static followed by field loads
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessPath {
    pub base: Val,
    pub fields: Vec<Field>,
}

impl AccessPath {
    pub fn new(base: Val, fields: Vec<Field>) -> Self {
        Self { base, fields }
    }

    pub fn local(base: Val) -> Self {
        Self::new(base, Vec::new())
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base.name)?;
        for field in &self.fields {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackwardResults {
    pub query: BackwardQuery,
    /// Allocation nodes `(x = new T, x)` the query value may come from
    pub allocation_sites: BTreeSet<Node>,
    /// Access paths at the query statement pointing to the same objects
    pub aliases: BTreeSet<AccessPath>,
    /// `TimedOut` when any pass ran out of budget
    pub status: SolverStatus,
    pub stats: SolverStats,
}

impl BackwardResults {
    pub fn allocation_statements(&self) -> BTreeSet<Statement> {
        self.allocation_sites.iter().map(|n| n.stmt.clone()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    pub fn may_alias(&self, path: &AccessPath) -> bool {
        self.aliases.contains(path)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardResults<W> {
    pub query: ForwardQuery,
    pub reached: BTreeSet<Node>,
    /// Weight of every reached node, combined over calling contexts
    pub weights: BTreeMap<Node, W>,
    /// Reached nodes with an empty call stack
    pub top_level: BTreeSet<Node>,
    pub status: SolverStatus,
    pub stats: SolverStats,
}

impl<W> ForwardResults<W> {
    pub fn weight(&self, node: &Node) -> Option<&W> {
        self.weights.get(node)
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    /// Reached nodes at `stmt`
    pub fn reached_at<'a>(&'a self, stmt: &Statement) -> impl Iterator<Item = &'a Node> + 'a {
        let stmt = stmt.clone();
        self.reached.iter().filter(move |n| n.stmt == stmt)
    }
}
