use super::poi::PoiKey;
use crate::shared::models::{Field, Node, Statement, Val};

/// Effect of expanding a node, with the call-automaton weight of the edge
///
/// Each variant maps to one call rule and at most one field rule:
///
/// | variant   | call rule                    | field rule              |
/// |-----------|------------------------------|-------------------------|
/// | Normal    | `<x,s> → <x',s'>`            | `<N,*> → <N',*>`        |
/// | FieldPush | `<x,s> → <x',s'>`            | `<N,*> → <N',f·*>`      |
/// | FieldPop  | `<x,s> → <x',s'>`            | `<N,f> → <N',ε>`        |
/// | CallPush  | `<x,s> → <x',s'·cs>`         | `<N,*> → <N',*>`        |
/// | CallPop   | `<x,s> → <x_ret,ε>`          | (coupled at return site)|
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Successor<W> {
    Normal {
        node: Node,
        weight: W,
    },
    FieldPush {
        node: Node,
        field: Field,
        weight: W,
    },
    FieldPop {
        node: Node,
        field: Field,
        weight: W,
    },
    /// Enter a callee; `node` is the callee-side node
    CallPush {
        node: Node,
        call_site: Statement,
        weight: W,
    },
    /// Leave the current method; `returned` carries the return tag
    CallPop {
        returned: Val,
        weight: W,
    },
}

impl<W> Successor<W> {
    /// Target node, `None` for pops
    pub fn node(&self) -> Option<&Node> {
        match self {
            Successor::Normal { node, .. }
            | Successor::FieldPush { node, .. }
            | Successor::FieldPop { node, .. }
            | Successor::CallPush { node, .. } => Some(node),
            Successor::CallPop { .. } => None,
        }
    }
}

/// Deferred effect waiting on a point of indirection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingIndirection<W> {
    pub key: PoiKey,
    /// Applied from the origin node once resolved; empty for call sites,
    /// which re-expand the origin instead
    pub successors: Vec<Successor<W>>,
}

/// Everything a node expansion produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion<W> {
    pub successors: Vec<Successor<W>>,
    pub indirections: Vec<PendingIndirection<W>>,
    /// The node is an allocation site of the query
    pub allocation_site: bool,
}

impl<W> Default for Expansion<W> {
    fn default() -> Self {
        Self {
            successors: Vec::new(),
            indirections: Vec::new(),
            allocation_site: false,
        }
    }
}

impl<W> Expansion<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_successors(successors: Vec<Successor<W>>) -> Self {
        Self {
            successors,
            ..Self::default()
        }
    }

    pub fn push(&mut self, successor: Successor<W>) {
        self.successors.push(successor);
    }

    pub fn defer(&mut self, key: PoiKey, successors: Vec<Successor<W>>) {
        self.indirections.push(PendingIndirection { key, successors });
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty() && self.indirections.is_empty() && !self.allocation_site
    }
}
